use alloy::{
    primitives::{Bytes, B256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::debug;

use crate::config::BindingConfig;
use crate::error::{BindingError, Result};
use crate::ethereum::Receipt;

/// The RPC collaborator a binding talks to. Errors it returns are passed to
/// callers untouched.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// `net_version` of the connected node
    async fn network_id(&self) -> Result<String>;

    /// Read-only `eth_call`
    async fn call(&self, request: &TransactionRequest) -> Result<Bytes>;

    /// `eth_sendTransaction`, signed by the node
    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256>;

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64>;

    /// `None` while the transaction has not been mined
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>>;
}

/// Transport over an alloy HTTP provider
#[derive(Debug, Clone)]
pub struct RpcTransport {
    provider: RootProvider<Http<Client>>,
}

impl RpcTransport {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| BindingError::InvalidParams(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().on_http(url);
        Ok(Self { provider })
    }

    pub fn from_config(config: &BindingConfig) -> Result<Self> {
        Self::new(&config.rpc_url)
    }

    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }
}

#[async_trait]
impl Transport for RpcTransport {
    async fn network_id(&self) -> Result<String> {
        let version = self.provider.get_net_version().await?;
        Ok(version.to_string())
    }

    async fn call(&self, request: &TransactionRequest) -> Result<Bytes> {
        Ok(self.provider.call(request).await?)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256> {
        let pending = self.provider.send_transaction(request).await?;
        Ok(*pending.tx_hash())
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64> {
        Ok(self.provider.estimate_gas(request).await?)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        debug!("Receipt probe for {}: found={}", hash, receipt.is_some());
        Ok(receipt.map(Receipt::from))
    }
}

impl From<TransactionReceipt> for Receipt {
    fn from(receipt: TransactionReceipt) -> Self {
        let logs = receipt
            .inner
            .logs()
            .iter()
            .map(|log| log.inner.clone())
            .collect();

        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            contract_address: receipt.contract_address,
            status: receipt.status(),
            gas_used: receipt.gas_used as u64,
            logs,
        }
    }
}
