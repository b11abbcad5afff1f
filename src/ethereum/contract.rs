use alloy::{
    primitives::{Address, Bytes, Log, B256},
    rpc::types::TransactionRequest,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::BindingConfig;
use crate::error::{BindingError, Result};
use crate::ethereum::{
    abi::{resolve_function, Artifact, FunctionDescriptor, NetworkArtifact},
    codec,
    confirm::{self, SyncOptions},
    events::{self, DecodedEvent, EventTable},
    params::TxParams,
    provider::Transport,
    utils, Confirmation, Invocation,
};

/// Unlinked library slots in solc output: `__Name____...`
static LIBRARY_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__[^_]+_+").expect("placeholder pattern is valid"));

/// Same slots, capturing the library name for linking
static LIBRARY_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([^_]+)_*").expect("slot pattern is valid"));

/// Network ids tried, in order, when the node reports mainnet
const MAINNET_ALIASES: [&str; 3] = ["1", "live", "default"];

/// A contract abstraction bound to one artifact network. Deploys new
/// instances and hands out instances at known addresses.
#[derive(Debug, Clone)]
pub struct ContractClass {
    artifact: Arc<Artifact>,
    network_id: Option<String>,
    active: NetworkArtifact,
    defaults: TxParams,
    sync: SyncOptions,
    transport: Option<Arc<dyn Transport>>,
}

impl ContractClass {
    /// Binds `artifact` using `config`. The "default" network is loaded so the
    /// metadata is usable right away; unless `config.network` names one, the
    /// network id stays unset and is detected from the node on first use.
    pub fn new(artifact: Artifact, config: &BindingConfig) -> Result<Self> {
        let defaults = config
            .defaults
            .to_params()
            .map_err(|e| BindingError::InvalidParams(e.to_string()))?;

        let mut class = Self {
            active: artifact.network("default").cloned().unwrap_or_default(),
            artifact: Arc::new(artifact),
            network_id: None,
            defaults,
            sync: SyncOptions::from_config(config),
            transport: None,
        };

        if let Some(network) = &config.network {
            class.set_network(network)?;
        }

        Ok(class)
    }

    pub fn name(&self) -> &str {
        &self.artifact.contract_name
    }

    pub fn network_id(&self) -> Option<&str> {
        self.network_id.as_deref()
    }

    pub fn networks(&self) -> Vec<String> {
        self.artifact.network_ids()
    }

    pub fn network(&self) -> &NetworkArtifact {
        &self.active
    }

    pub fn address(&self) -> Option<Address> {
        self.active.address
    }

    pub fn events(&self) -> &EventTable {
        &self.active.events
    }

    pub fn links(&self) -> &BTreeMap<String, Address> {
        &self.active.links
    }

    pub fn sync_options(&self) -> &SyncOptions {
        &self.sync
    }

    pub fn set_sync_options(&mut self, sync: SyncOptions) {
        self.sync = sync;
    }

    pub fn set_provider(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
    }

    pub fn provider(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    /// Makes `network_id` the active network. ABI, bytecode, address, links
    /// and events are replaced together.
    pub fn set_network(&mut self, network_id: &str) -> Result<()> {
        let network = self
            .artifact
            .network(network_id)
            .ok_or_else(|| BindingError::UnknownNetwork {
                contract: self.name().to_string(),
                network: network_id.to_string(),
            })?;

        self.active = network.clone();
        self.network_id = Some(network_id.to_string());
        debug!("{} bound to network '{}'", self.name(), network_id);
        Ok(())
    }

    /// A copy of this class bound to `network_id`
    pub fn with_network(&self, network_id: &str) -> Result<Self> {
        let mut class = self.clone();
        class.set_network(network_id)?;
        Ok(class)
    }

    /// Picks the artifact network matching the node, unless one was chosen
    /// already.
    pub async fn detect_network(&mut self) -> Result<()> {
        if self.network_id.is_some() {
            return Ok(());
        }

        let transport = self.require_transport()?;
        let mut network_id = transport.network_id().await?;

        if network_id == "1" {
            if let Some(alias) = MAINNET_ALIASES
                .iter()
                .find(|id| self.artifact.network(id).is_some())
            {
                network_id = alias.to_string();
            }
        }

        self.set_network(&network_id)
    }

    /// Records the deployed address of library `name`
    pub fn link(&mut self, name: &str, address: Address) {
        debug!("Linking {} library {} at {}", self.name(), name, address);
        self.active.links.insert(name.to_string(), address);
    }

    pub fn link_all<I, S>(&mut self, libraries: I)
    where
        I: IntoIterator<Item = (S, Address)>,
        S: AsRef<str>,
    {
        for (name, address) in libraries {
            self.link(name.as_ref(), address);
        }
    }

    /// Links a deployed library class and learns its events
    pub fn link_contract(&mut self, library: &ContractClass) -> Result<()> {
        let address = library.address().ok_or_else(|| BindingError::LinkWithoutAddress {
            library: library.name().to_string(),
        })?;

        self.link(library.name(), address);
        self.active.events.extend(library.events());
        Ok(())
    }

    /// Creation bytecode with every linked library placeholder filled in
    pub fn binary(&self) -> Option<String> {
        let binary = self.active.unlinked_binary.as_deref()?;
        let links = &self.active.links;

        let linked = LIBRARY_SLOT.replace_all(binary, |caps: &Captures| match links.get(&caps[1]) {
            Some(address) => hex::encode(address),
            None => caps[0].to_string(),
        });

        Some(linked.into_owned())
    }

    /// Merges `params` into the class defaults and returns the result
    pub fn defaults(&mut self, params: &TxParams) -> &TxParams {
        self.defaults = self.defaults.merge(params);
        &self.defaults
    }

    pub fn class_defaults(&self) -> &TxParams {
        &self.defaults
    }

    /// Builds the contract creation request. Every configuration problem is
    /// reported here, before anything reaches the provider.
    pub fn deploy_request(&self, args: &[Value], options: &TxParams) -> Result<TransactionRequest> {
        self.require_transport()?;

        let binary = self.binary().ok_or_else(|| BindingError::MissingBinary {
            contract: self.name().to_string(),
        })?;

        let unresolved = unresolved_libraries(&binary);
        if !unresolved.is_empty() {
            return Err(BindingError::UnresolvedLibraries {
                contract: self.name().to_string(),
                libraries: unresolved.join(", "),
            });
        }

        // Explicit `data` stands in for the binary; constructor arguments
        // are appended either way.
        let params = self.defaults.merge(options);
        let mut code = match &params.data {
            Some(data) => data.to_vec(),
            None => hex::decode(binary.trim_start_matches("0x"))
                .map_err(|e| BindingError::Artifact(format!("bytecode is not hex: {}", e)))?,
        };
        code.extend_from_slice(&codec::encode_constructor_args(
            self.active.abi.constructor(),
            args,
        )?);

        Ok(params.into_request(None, Bytes::from(code)))
    }

    /// Deploys a new instance and waits for the creation receipt
    pub async fn deploy(&self, args: &[Value], options: &TxParams) -> Result<ContractInstance> {
        let request = self.deploy_request(args, options)?;
        let transport = self.require_transport()?;

        let tx = transport.send_transaction(request).await?;
        info!("Deploying {} in transaction {}", self.name(), tx);

        let receipt = confirm::wait_for_receipt(transport.as_ref(), tx, &self.sync).await?;
        let address = receipt
            .contract_address
            .ok_or(BindingError::MissingContractAddress { tx })?;
        info!("{} deployed at {}", self.name(), address);

        let mut instance = self.instance_at(address);
        instance.transaction_hash = Some(tx);
        Ok(instance)
    }

    /// `deploy` for positional JSON callers: a trailing options object is
    /// split off the constructor arguments.
    pub async fn deploy_positional(&self, args: Vec<Value>) -> Result<ContractInstance> {
        let (args, options) = split_options(args)?;
        self.deploy(&args, &options).await
    }

    /// Instance at `address`, which must be a 42 character hex string
    pub fn at(&self, address: &str) -> Result<ContractInstance> {
        let address = utils::validate_address(address).map_err(|_| BindingError::InvalidAddress {
            contract: self.name().to_string(),
            address: address.to_string(),
        })?;
        Ok(self.instance_at(address))
    }

    /// Instance at the active network's recorded address
    pub fn deployed(&self) -> Result<ContractInstance> {
        let address = self.address().ok_or_else(|| BindingError::NotDeployed {
            contract: self.name().to_string(),
        })?;
        Ok(self.instance_at(address))
    }

    pub fn instance_at(&self, address: Address) -> ContractInstance {
        ContractInstance {
            contract_name: self.name().to_string(),
            network: Arc::new(self.active.clone()),
            address,
            transaction_hash: None,
            defaults: self.defaults.clone(),
            sync: self.sync,
            transport: self.transport.clone(),
        }
    }

    fn require_transport(&self) -> Result<&Arc<dyn Transport>> {
        self.transport.as_ref().ok_or_else(|| BindingError::MissingProvider {
            contract: self.name().to_string(),
        })
    }
}

/// Library names still waiting for an address, sorted and deduplicated
pub fn unresolved_libraries(binary: &str) -> Vec<String> {
    let mut names: Vec<String> = LIBRARY_PLACEHOLDER
        .find_iter(binary)
        .map(|m| m.as_str().replace('_', ""))
        .collect();
    names.sort();
    names.dedup();
    names
}

fn split_options(args: Vec<Value>) -> Result<(Vec<Value>, TxParams)> {
    let (args, options) = utils::split_trailing_options(args);
    let options = match options {
        Some(options) => TxParams::from_json(&options)?,
        None => TxParams::default(),
    };
    Ok((args, options))
}

/// A contract at a known address. Every ABI function is reachable by name;
/// constant functions are answered with `eth_call`, the rest are submitted as
/// transactions and tracked until mined.
#[derive(Debug, Clone)]
pub struct ContractInstance {
    contract_name: String,
    network: Arc<NetworkArtifact>,
    address: Address,
    transaction_hash: Option<B256>,
    defaults: TxParams,
    sync: SyncOptions,
    transport: Option<Arc<dyn Transport>>,
}

impl ContractInstance {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Creation transaction, for instances returned by `deploy`
    pub fn transaction_hash(&self) -> Option<B256> {
        self.transaction_hash
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn functions(&self) -> Vec<FunctionDescriptor<'_>> {
        self.network.functions().collect()
    }

    pub fn function(&self, name: &str, arity: usize) -> Result<FunctionDescriptor<'_>> {
        resolve_function(&self.network.abi, name, arity).ok_or_else(|| BindingError::UnknownFunction {
            contract: self.contract_name.clone(),
            function: name.to_string(),
        })
    }

    pub fn events(&self) -> &EventTable {
        &self.network.events
    }

    /// The request an invocation would dispatch, without sending it. The
    /// encoded call always wins over a `data` option.
    pub fn request(&self, name: &str, args: &[Value], options: &TxParams) -> Result<TransactionRequest> {
        let function = self.function(name, args.len())?;
        let calldata = codec::encode_function_call(function.function(), args)?;
        Ok(self.defaults.merge(options).into_request(Some(self.address), calldata))
    }

    /// Runs `name` through `eth_call`, whatever its mutability
    pub async fn call(&self, name: &str, args: &[Value], options: &TxParams) -> Result<Value> {
        let function = self.function(name, args.len())?;
        let request = self.request(name, args, options)?;
        let output = self.require_transport()?.call(&request).await?;
        codec::decode_function_result(function.function(), &output)
    }

    /// Submits `name` as a transaction and returns its hash without waiting
    pub async fn send_transaction(&self, name: &str, args: &[Value], options: &TxParams) -> Result<B256> {
        let request = self.request(name, args, options)?;
        let tx = self.require_transport()?.send_transaction(request).await?;
        info!("{}.{} submitted in transaction {}", self.contract_name, name, tx);
        Ok(tx)
    }

    pub async fn estimate_gas(&self, name: &str, args: &[Value], options: &TxParams) -> Result<u64> {
        let request = self.request(name, args, options)?;
        self.require_transport()?.estimate_gas(&request).await
    }

    /// Submits `name` and waits for the transaction to be mined
    pub async fn transact(&self, name: &str, args: &[Value], options: &TxParams) -> Result<Confirmation> {
        let tx = self.send_transaction(name, args, options).await?;
        self.synchronize(tx).await
    }

    /// Waits for `tx` with this instance's timeout, interval and event table
    pub async fn synchronize(&self, tx: B256) -> Result<Confirmation> {
        let transport = self.require_transport()?;
        confirm::synchronize(
            transport.as_ref(),
            tx,
            &self.sync,
            &self.network.events,
            Some(self.address),
        )
        .await
    }

    /// Calls constant functions and transacts the others
    pub async fn invoke(&self, name: &str, args: &[Value], options: &TxParams) -> Result<Invocation> {
        if self.function(name, args.len())?.constant() {
            self.call(name, args, options).await.map(Invocation::Output)
        } else {
            self.transact(name, args, options).await.map(Invocation::Transaction)
        }
    }

    /// `invoke` for positional JSON callers: a trailing object that is not a
    /// big number is taken as the transaction options.
    pub async fn invoke_positional(&self, name: &str, args: Vec<Value>) -> Result<Invocation> {
        let (args, options) = split_options(args)?;
        self.invoke(name, &args, &options).await
    }

    pub fn decode_logs(&self, logs: &[Log]) -> Vec<DecodedEvent> {
        events::decode_logs(&self.network.events, logs)
    }

    fn require_transport(&self) -> Result<&Arc<dyn Transport>> {
        self.transport.as_ref().ok_or_else(|| BindingError::MissingProvider {
            contract: self.contract_name.clone(),
        })
    }
}
