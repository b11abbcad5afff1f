//! Typed binding for the `Offer` betting contract, over the embedded
//! artifact.

use alloy::primitives::{Address, B256, U256};
use serde_json::{json, Value};

use crate::config::BindingConfig;
use crate::error::{BindingError, Result};
use crate::ethereum::{
    abi::Artifact,
    contract::{ContractClass, ContractInstance},
    events::DecodedEvent,
    params::TxParams,
    utils, Confirmation,
};

pub const OFFER_ARTIFACT_JSON: &str = include_str!("../artifacts/Offer.json");

pub fn artifact() -> Result<Artifact> {
    Artifact::from_json_str(OFFER_ARTIFACT_JSON)
}

/// Contract class for `Offer`, from `config.artifact` when set
pub async fn class(config: &BindingConfig) -> Result<ContractClass> {
    let artifact = match &config.artifact {
        Some(path) => Artifact::load_from_file(path).await?,
        None => artifact()?,
    };
    ContractClass::new(artifact, config)
}

/// Constructor arguments of `Offer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferParams {
    pub odds: U256,
    pub coverage: U256,
    pub offer_addr: Address,
    pub offer_hash: String,
    pub house_addr: Address,
    pub house_ratio: u8,
}

impl OfferParams {
    fn to_args(&self) -> Vec<Value> {
        vec![
            json!(self.odds.to_string()),
            json!(self.coverage.to_string()),
            json!(self.offer_addr.to_string()),
            json!(self.offer_hash),
            json!(self.house_addr.to_string()),
            json!(self.house_ratio),
        ]
    }
}

/// Deploys a new `Offer`; `options.value` funds the coverage
pub async fn deploy(class: &ContractClass, params: &OfferParams, options: &TxParams) -> Result<Offer> {
    class.deploy(&params.to_args(), options).await.map(Offer::new)
}

#[derive(Debug, Clone)]
pub struct Offer {
    instance: ContractInstance,
}

impl Offer {
    pub fn new(instance: ContractInstance) -> Self {
        Self { instance }
    }

    pub fn instance(&self) -> &ContractInstance {
        &self.instance
    }

    pub fn address(&self) -> Address {
        self.instance.address()
    }

    /// Places a bid worth `options.value`
    pub async fn bid(&self, options: &TxParams) -> Result<Confirmation> {
        self.instance.transact("bid", &[], options).await
    }

    pub async fn update(&self, options: &TxParams) -> Result<Confirmation> {
        self.instance.transact("update", &[], options).await
    }

    /// Oracle callback without proof
    pub async fn callback(&self, myid: B256, result: &str, options: &TxParams) -> Result<Confirmation> {
        let args = [json!(myid.to_string()), json!(result)];
        self.instance.transact("__callback", &args, options).await
    }

    pub async fn callback_with_proof(
        &self,
        myid: B256,
        result: &str,
        proof: &[u8],
        options: &TxParams,
    ) -> Result<Confirmation> {
        let args = [
            json!(myid.to_string()),
            json!(result),
            json!(format!("0x{}", hex::encode(proof))),
        ];
        self.instance.transact("__callback", &args, options).await
    }

    pub async fn string_to_uint(&self, s: &str) -> Result<U256> {
        self.read_uint("stringToUint", &[json!(s)]).await
    }

    pub async fn coverage(&self) -> Result<U256> {
        self.read_uint("Coverage", &[]).await
    }

    pub async fn remaining_coverage(&self) -> Result<U256> {
        self.read_uint("RemainingCoverage", &[]).await
    }

    pub async fn odds(&self) -> Result<U256> {
        self.read_uint("Odds", &[]).await
    }

    pub async fn close_date(&self) -> Result<U256> {
        self.read_uint("CloseDate", &[]).await
    }

    pub async fn lock_date(&self) -> Result<U256> {
        self.read_uint("LockDate", &[]).await
    }

    async fn read_uint(&self, name: &str, args: &[Value]) -> Result<U256> {
        let output = self.instance.call(name, args, &TxParams::default()).await?;
        let raw = output
            .as_str()
            .ok_or_else(|| BindingError::Abi(format!("{} returned {}, expected a number", name, output)))?;
        utils::parse_quantity(raw).map_err(|e| BindingError::Abi(e.to_string()))
    }
}

/// Events emitted by `Offer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferEvent {
    NewOraclizeQuery { description: String },
    Initialized,
    BidWin { house_amount: U256 },
    NewBid { amount: U256, bidder: Address },
    SellWin { amount: U256, house_amount: U256 },
}

impl OfferEvent {
    /// `None` for events of other contracts or with unexpected arguments
    pub fn from_decoded(event: &DecodedEvent) -> Option<Self> {
        let uint = |key: &str| {
            event
                .args
                .get(key)
                .and_then(Value::as_str)
                .and_then(|s| utils::parse_quantity(s).ok())
        };

        match event.event.as_str() {
            "newOraclizeQuery" => Some(Self::NewOraclizeQuery {
                description: event.args.get("description")?.as_str()?.to_string(),
            }),
            "initialized" => Some(Self::Initialized),
            "bidWin" => Some(Self::BidWin {
                house_amount: uint("houseAmount")?,
            }),
            "newBid" => Some(Self::NewBid {
                amount: uint("amount")?,
                bidder: event.args.get("bidder")?.as_str()?.parse().ok()?,
            }),
            "sellWin" => Some(Self::SellWin {
                amount: uint("amount")?,
                house_amount: uint("houseAmount")?,
            }),
            _ => None,
        }
    }
}
