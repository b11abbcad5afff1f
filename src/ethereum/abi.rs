use alloy::{
    json_abi::{Function, JsonAbi, Param, StateMutability},
    primitives::Address,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{BindingError, Result};
use crate::ethereum::{events::EventTable, utils};

/// Compiled contract metadata for every network it was built for
#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract_name: String,
    pub generated_with: Option<String>,
    pub networks: BTreeMap<String, NetworkArtifact>,
}

/// The slice of an artifact that belongs to one network. Swapped as a whole
/// when the active network changes.
#[derive(Debug, Clone, Default)]
pub struct NetworkArtifact {
    pub abi: JsonAbi,
    pub unlinked_binary: Option<String>,
    pub address: Option<Address>,
    pub links: BTreeMap<String, Address>,
    pub events: EventTable,
    pub updated_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawArtifact {
    contract_name: String,
    generated_with: Option<String>,
    networks: BTreeMap<String, RawNetwork>,
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
    #[serde(default)]
    abi: Value,
    unlinked_binary: Option<String>,
    address: Option<String>,
    #[serde(default)]
    links: HashMap<String, String>,
    events: Option<HashMap<String, Value>>,
    updated_at: Option<u64>,
}

impl Artifact {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawArtifact = serde_json::from_str(content)?;

        let mut networks = BTreeMap::new();
        for (network_id, network) in raw.networks {
            let parsed = NetworkArtifact::from_raw(network)
                .map_err(|e| BindingError::Artifact(format!("network '{}': {}", network_id, e)))?;
            networks.insert(network_id, parsed);
        }

        debug!(
            "Loaded {} artifact with networks: {:?}",
            raw.contract_name,
            networks.keys().collect::<Vec<_>>()
        );

        Ok(Self {
            contract_name: raw.contract_name,
            generated_with: raw.generated_with,
            networks,
        })
    }

    /// Load an artifact JSON file from disk
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| BindingError::Artifact(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_json_str(&content)
    }

    pub fn network(&self, network_id: &str) -> Option<&NetworkArtifact> {
        self.networks.get(network_id)
    }

    pub fn network_ids(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }
}

impl NetworkArtifact {
    fn from_raw(raw: RawNetwork) -> Result<Self> {
        let abi: JsonAbi = if raw.abi.is_null() {
            JsonAbi::new()
        } else {
            serde_json::from_value(raw.abi)?
        };

        let address = raw
            .address
            .as_deref()
            .map(utils::validate_address)
            .transpose()
            .map_err(|e| BindingError::Artifact(e.to_string()))?;

        let mut links = BTreeMap::new();
        for (library, address) in raw.links {
            let address = utils::validate_address(&address)
                .map_err(|e| BindingError::Artifact(format!("link '{}': {}", library, e)))?;
            links.insert(library, address);
        }

        let events = match raw.events {
            Some(events) => EventTable::from_topic_map(events)?,
            None => EventTable::from_abi(&abi),
        };

        Ok(Self {
            abi,
            unlinked_binary: raw.unlinked_binary.filter(|b| !b.is_empty()),
            address,
            links,
            events,
            updated_at: raw.updated_at,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = FunctionDescriptor<'_>> {
        self.abi.functions().map(FunctionDescriptor::new)
    }
}

/// Read-only view over one ABI function entry
#[derive(Debug, Clone, Copy)]
pub struct FunctionDescriptor<'a> {
    function: &'a Function,
}

impl<'a> FunctionDescriptor<'a> {
    pub fn new(function: &'a Function) -> Self {
        Self { function }
    }

    pub fn name(&self) -> &'a str {
        &self.function.name
    }

    pub fn inputs(&self) -> &'a [Param] {
        &self.function.inputs
    }

    pub fn outputs(&self) -> &'a [Param] {
        &self.function.outputs
    }

    /// `view`/`pure` functions, the legacy `constant: true`
    pub fn constant(&self) -> bool {
        matches!(
            self.function.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    pub fn payable(&self) -> bool {
        self.function.state_mutability == StateMutability::Payable
    }

    pub fn function(&self) -> &'a Function {
        self.function
    }

    pub fn signature(&self) -> String {
        self.function.signature()
    }
}

/// Picks the overload of `name` taking `arity` arguments, falling back to the
/// first declared overload so the encoder reports the mismatch.
pub fn resolve_function<'a>(abi: &'a JsonAbi, name: &str, arity: usize) -> Option<FunctionDescriptor<'a>> {
    let overloads = abi.function(name)?;
    overloads
        .iter()
        .find(|f| f.inputs.len() == arity)
        .or_else(|| overloads.first())
        .map(FunctionDescriptor::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::OFFER_ARTIFACT_JSON;
    use tempfile::tempdir;

    #[test]
    fn test_offer_artifact_parses() {
        let artifact = Artifact::from_json_str(OFFER_ARTIFACT_JSON).unwrap();
        assert_eq!(artifact.contract_name, "Offer");
        assert_eq!(artifact.network_ids(), vec!["*".to_string(), "default".to_string()]);

        let network = artifact.network("default").unwrap();
        assert!(network.unlinked_binary.as_deref().unwrap().starts_with("0x"));
        assert!(network.address.is_none());
        assert_eq!(network.events.len(), 5);
    }

    #[test]
    fn test_function_descriptors() {
        let artifact = Artifact::from_json_str(OFFER_ARTIFACT_JSON).unwrap();
        let network = artifact.network("default").unwrap();

        let bid = resolve_function(&network.abi, "bid", 0).unwrap();
        assert!(!bid.constant());
        assert!(bid.payable());

        let odds = resolve_function(&network.abi, "Odds", 0).unwrap();
        assert!(odds.constant());
        assert_eq!(odds.outputs().len(), 1);

        let with_proof = resolve_function(&network.abi, "__callback", 3).unwrap();
        assert_eq!(with_proof.inputs().len(), 3);
        let fallback = resolve_function(&network.abi, "__callback", 7).unwrap();
        assert_eq!(fallback.inputs().len(), 2);

        assert!(resolve_function(&network.abi, "missing", 0).is_none());
    }

    #[test]
    fn test_missing_events_map_derived_from_abi() {
        let offer: Value = serde_json::from_str(OFFER_ARTIFACT_JSON).unwrap();
        let json = serde_json::json!({
            "contract_name": "Offer",
            "networks": { "default": { "abi": offer["networks"]["default"]["abi"] } }
        });
        let artifact = Artifact::from_json_str(&json.to_string()).unwrap();
        let embedded = Artifact::from_json_str(OFFER_ARTIFACT_JSON).unwrap();

        let derived = &artifact.network("default").unwrap().events;
        assert_eq!(derived.len(), 5);
        for event in embedded.network("default").unwrap().abi.events() {
            assert_eq!(derived.get(&event.selector()).map(|e| &e.name), Some(&event.name));
        }
    }

    #[test]
    fn test_invalid_address_rejected() {
        let json = r#"{
            "contract_name": "Thing",
            "networks": { "3": { "abi": [], "address": "0x1234" } }
        }"#;
        let err = Artifact::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("network '3'"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Offer.json");
        tokio::fs::write(&path, OFFER_ARTIFACT_JSON).await.unwrap();

        let artifact = Artifact::load_from_file(&path).await.unwrap();
        assert!(artifact.network("*").is_some());
        assert!(Artifact::load_from_file(dir.path().join("missing.json")).await.is_err());
    }
}
