pub mod abi;
pub mod codec;
pub mod confirm;
pub mod contract;
pub mod events;
pub mod params;
pub mod provider;
pub mod utils;

#[cfg(test)]
pub(crate) mod mock;

use alloy::primitives::{Address, Log, B256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use events::DecodedEvent;

/// The subset of a transaction receipt the binding works with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub contract_address: Option<Address>,
    pub status: bool,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

/// Outcome of waiting for a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confirmation {
    Hash(B256),
    Enriched(EnrichedConfirmation),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedConfirmation {
    pub tx: B256,
    pub receipt: Receipt,
    pub logs: Vec<DecodedEvent>,
}

impl Confirmation {
    pub fn tx_hash(&self) -> B256 {
        match self {
            Self::Hash(hash) => *hash,
            Self::Enriched(enriched) => enriched.tx,
        }
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            Self::Hash(_) => None,
            Self::Enriched(enriched) => Some(&enriched.receipt),
        }
    }

    pub fn logs(&self) -> &[DecodedEvent] {
        match self {
            Self::Hash(_) => &[],
            Self::Enriched(enriched) => &enriched.logs,
        }
    }
}

/// Result of invoking a function binding: constant functions return their
/// decoded output, the others a confirmed transaction. Serialize only; an
/// untagged `Output(Value)` would swallow every other variant on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Invocation {
    Output(Value),
    Transaction(Confirmation),
}

impl Invocation {
    pub fn output(&self) -> Option<&Value> {
        match self {
            Self::Output(value) => Some(value),
            Self::Transaction(_) => None,
        }
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        match self {
            Self::Output(_) => None,
            Self::Transaction(confirmation) => Some(confirmation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invocation_serializes_untagged() {
        let output = Invocation::Output(json!("3"));
        assert_eq!(serde_json::to_value(&output).unwrap(), json!("3"));

        let tx = B256::repeat_byte(1);
        let sent = Invocation::Transaction(Confirmation::Hash(tx));
        assert_eq!(serde_json::to_value(&sent).unwrap(), json!(tx.to_string()));

        let round_trip: Confirmation = serde_json::from_value(json!(tx.to_string())).unwrap();
        assert_eq!(round_trip, Confirmation::Hash(tx));
    }
}
