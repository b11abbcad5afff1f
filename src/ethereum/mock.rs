use alloy::{
    primitives::{Address, Bytes, Log, B256},
    rpc::types::TransactionRequest,
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::Result;
use crate::ethereum::{provider::Transport, Receipt};

/// Scripted transport recording every request it sees
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    pub network_id: Mutex<String>,
    pub call_result: Mutex<Bytes>,
    pub calls: Mutex<Vec<TransactionRequest>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub estimates: Mutex<Vec<TransactionRequest>>,
    pub probes: Mutex<u32>,
    /// Probes answered `None` before the receipt shows up; `None` never mines
    pub pending_probes: Mutex<Option<u32>>,
    pub receipt_logs: Mutex<Vec<Log>>,
    pub contract_address: Mutex<Option<Address>>,
    pub fail_send: Mutex<Option<String>>,
    pub fail_probe: Mutex<Option<String>>,
    pub queued_hashes: Mutex<VecDeque<B256>>,
}

impl MockTransport {
    pub fn mining_after(probes: u32) -> Self {
        let mock = Self::default();
        *mock.network_id.lock().unwrap() = "1".to_string();
        *mock.pending_probes.lock().unwrap() = Some(probes);
        mock
    }

    pub fn never_mining() -> Self {
        let mock = Self::mining_after(0);
        *mock.pending_probes.lock().unwrap() = None;
        mock
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn probe_count(&self) -> u32 {
        *self.probes.lock().unwrap()
    }

    pub fn last_sent(&self) -> TransactionRequest {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn network_id(&self) -> Result<String> {
        Ok(self.network_id.lock().unwrap().clone())
    }

    async fn call(&self, request: &TransactionRequest) -> Result<Bytes> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(self.call_result.lock().unwrap().clone())
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256> {
        if let Some(message) = self.fail_send.lock().unwrap().clone() {
            return Err(TransportErrorKind::custom_str(&message).into());
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(request);
        let hash = self
            .queued_hashes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| B256::with_last_byte(sent.len() as u8));
        Ok(hash)
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64> {
        self.estimates.lock().unwrap().push(request.clone());
        Ok(21_000)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>> {
        *self.probes.lock().unwrap() += 1;
        if let Some(message) = self.fail_probe.lock().unwrap().clone() {
            return Err(TransportErrorKind::custom_str(&message).into());
        }

        let mut pending = self.pending_probes.lock().unwrap();
        match pending.as_mut() {
            None => Ok(None),
            Some(0) => Ok(Some(Receipt {
                transaction_hash: hash,
                block_number: Some(7),
                contract_address: *self.contract_address.lock().unwrap(),
                status: true,
                gas_used: 21_000,
                logs: self.receipt_logs.lock().unwrap().clone(),
            })),
            Some(remaining) => {
                *remaining -= 1;
                Ok(None)
            }
        }
    }
}
