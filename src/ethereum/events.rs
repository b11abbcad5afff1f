use alloy::{
    dyn_abi::{DynSolValue, EventExt},
    json_abi::{Event, JsonAbi},
    primitives::{Address, Log, B256},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{BindingError, Result};
use crate::ethereum::codec;

/// Topic -> event schema lookup used to decode receipt logs
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    by_topic: HashMap<B256, Event>,
}

impl EventTable {
    /// Builds the table from an artifact's `events` map, keyed by topic hex.
    pub fn from_topic_map(events: HashMap<String, Value>) -> Result<Self> {
        let mut by_topic = HashMap::with_capacity(events.len());
        for (topic, entry) in events {
            let topic = B256::from_str(&topic)
                .map_err(|e| BindingError::Artifact(format!("bad event topic '{}': {}", topic, e)))?;
            let abi: JsonAbi = serde_json::from_value(Value::Array(vec![entry]))?;
            let event = abi
                .events()
                .next()
                .cloned()
                .ok_or_else(|| BindingError::Artifact(format!("topic {} is not an event", topic)))?;
            by_topic.insert(topic, event);
        }
        Ok(Self { by_topic })
    }

    /// Derives the table from the ABI's non-anonymous events.
    pub fn from_abi(abi: &JsonAbi) -> Self {
        let by_topic = abi
            .events()
            .filter(|event| !event.anonymous)
            .map(|event| (event.selector(), event.clone()))
            .collect();
        Self { by_topic }
    }

    pub fn get(&self, topic: &B256) -> Option<&Event> {
        self.by_topic.get(topic)
    }

    pub fn insert(&mut self, topic: B256, event: Event) {
        self.by_topic.insert(topic, event);
    }

    /// Adds every entry of `other`, replacing entries with the same topic
    pub fn extend(&mut self, other: &EventTable) {
        for (topic, event) in &other.by_topic {
            self.by_topic.insert(*topic, event.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.by_topic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_topic.is_empty()
    }
}

/// A log entry matched to its event schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub event: String,
    pub address: Address,
    pub log_index: usize,
    pub args: Map<String, Value>,
}

/// Decodes the logs whose first topic is known. Logs without topics, with an
/// unknown topic, or that fail to decode are skipped; the rest keep their
/// relative order.
pub fn decode_logs(table: &EventTable, logs: &[Log]) -> Vec<DecodedEvent> {
    logs.iter()
        .enumerate()
        .filter_map(|(log_index, log)| {
            let topic = log.topics().first()?;
            let Some(event) = table.get(topic) else {
                debug!("Skipping log {} with unknown topic {}", log_index, topic);
                return None;
            };
            match decode_log(event, log, log_index) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!("Dropping undecodable {} log {}: {}", event.name, log_index, e);
                    None
                }
            }
        })
        .collect()
}

pub fn decode_log(event: &Event, log: &Log, log_index: usize) -> Result<DecodedEvent> {
    let decoded = event
        .decode_log_parts(log.topics().iter().copied(), &log.data.data, false)
        .map_err(|e| BindingError::Abi(e.to_string()))?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut args = Map::new();

    for (position, input) in event.inputs.iter().enumerate() {
        let value: Option<DynSolValue> = if input.indexed {
            indexed.next()
        } else {
            body.next()
        };
        let value = value.ok_or_else(|| {
            BindingError::Abi(format!("missing value for {} input #{}", event.name, position))
        })?;

        let key = if input.name.is_empty() {
            position.to_string()
        } else {
            input.name.clone()
        };
        args.insert(key, codec::dyn_sol_value_to_json(&value)?);
    }

    Ok(DecodedEvent {
        event: event.name.clone(),
        address: log.address,
        log_index,
        args,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::offer::OFFER_ARTIFACT_JSON;
    use crate::ethereum::abi::Artifact;
    use alloy::primitives::{Bytes, U256};
    use serde_json::json;

    pub(crate) fn offer_events() -> EventTable {
        Artifact::from_json_str(OFFER_ARTIFACT_JSON)
            .unwrap()
            .network("default")
            .unwrap()
            .events
            .clone()
    }

    pub(crate) fn new_bid_log(contract: Address, amount: u64, bidder: Address) -> Log {
        let table = offer_events();
        let topic = find_topic(&table, "newBid");
        let mut data = U256::from(amount).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(bidder.into_word().as_slice());
        Log::new_unchecked(contract, vec![topic], Bytes::from(data))
    }

    pub(crate) fn bid_win_log(contract: Address, house_amount: u64) -> Log {
        let table = offer_events();
        let topic = find_topic(&table, "bidWin");
        let data = U256::from(house_amount).to_be_bytes::<32>().to_vec();
        Log::new_unchecked(contract, vec![topic], Bytes::from(data))
    }

    pub(crate) fn find_topic(table: &EventTable, name: &str) -> B256 {
        *table
            .by_topic
            .iter()
            .find(|(_, event)| event.name == name)
            .map(|(topic, _)| topic)
            .unwrap()
    }

    #[test]
    fn test_artifact_topics_match_selectors() {
        let table = offer_events();
        for (topic, event) in &table.by_topic {
            assert_eq!(*topic, event.selector(), "topic mismatch for {}", event.name);
        }
    }

    #[test]
    fn test_decode_drops_unknown_and_keeps_order() {
        let table = offer_events();
        let contract = Address::repeat_byte(0x11);
        let bidder = Address::repeat_byte(0x22);

        let unknown = Log::new_unchecked(contract, vec![B256::repeat_byte(0x99)], Bytes::new());
        let anonymous = Log::new_unchecked(contract, vec![], Bytes::new());
        let logs = vec![
            unknown,
            new_bid_log(contract, 500, bidder),
            anonymous,
            bid_win_log(contract, 7),
        ];

        let decoded = decode_logs(&table, &logs);
        assert_eq!(decoded.len(), 2);

        assert_eq!(decoded[0].event, "newBid");
        assert_eq!(decoded[0].log_index, 1);
        assert_eq!(decoded[0].args["amount"], json!("500"));
        assert_eq!(decoded[0].args["bidder"], json!(format!("0x{:x}", bidder)));

        assert_eq!(decoded[1].event, "bidWin");
        assert_eq!(decoded[1].log_index, 3);
        assert_eq!(decoded[1].args["houseAmount"], json!("7"));
    }

    #[test]
    fn test_undecodable_log_is_dropped() {
        let table = offer_events();
        let contract = Address::repeat_byte(0x11);
        let topic = find_topic(&table, "sellWin");
        // sellWin carries two words, give it one
        let truncated = Log::new_unchecked(contract, vec![topic], Bytes::from(vec![0u8; 32]));

        assert!(decode_logs(&table, &[truncated]).is_empty());
    }

    #[test]
    fn test_extend_merges_tables() {
        let mut table = EventTable::default();
        assert!(table.is_empty());
        table.extend(&offer_events());
        assert_eq!(table.len(), 5);

        let artifact = Artifact::from_json_str(OFFER_ARTIFACT_JSON).unwrap();
        let derived = EventTable::from_abi(&artifact.network("default").unwrap().abi);
        assert_eq!(derived.len(), 5);
    }
}
