use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BindingError, Result};
use crate::ethereum::utils;

/// Per-call transaction options. Unset fields fall through to the class
/// defaults when merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParams {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub value: Option<U256>,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
    pub data: Option<Bytes>,
}

impl TxParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layers `overrides` on top of `self`; keys set in `overrides` win.
    pub fn merge(&self, overrides: &TxParams) -> TxParams {
        TxParams {
            from: overrides.from.or(self.from),
            to: overrides.to.or(self.to),
            value: overrides.value.or(self.value),
            gas: overrides.gas.or(self.gas),
            gas_price: overrides.gas_price.or(self.gas_price),
            nonce: overrides.nonce.or(self.nonce),
            data: overrides.data.clone().or_else(|| self.data.clone()),
        }
    }

    /// Reads web3-style options (`from`, `to`, `value`, `gas`, `gasPrice`,
    /// `nonce`, `data`). Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(BindingError::InvalidParams(format!(
                "Transaction options must be an object, got {}",
                value
            )));
        };

        let mut params = TxParams::default();
        for (key, field) in map {
            if field.is_null() {
                continue;
            }
            match key.as_str() {
                "from" => params.from = Some(address_field(key, field)?),
                "to" => params.to = Some(address_field(key, field)?),
                "value" => params.value = Some(quantity_field(key, field)?),
                "gas" | "gasLimit" | "gas_limit" => {
                    params.gas = Some(narrow(key, quantity_field(key, field)?)?)
                }
                "gasPrice" | "gas_price" => {
                    params.gas_price = Some(narrow(key, quantity_field(key, field)?)?)
                }
                "nonce" => params.nonce = Some(narrow(key, quantity_field(key, field)?)?),
                "data" => {
                    let hex_str = field.as_str().ok_or_else(|| {
                        BindingError::InvalidParams("'data' must be a hex string".to_string())
                    })?;
                    let bytes = hex::decode(hex_str.trim_start_matches("0x")).map_err(|_| {
                        BindingError::InvalidParams(format!("Invalid hex in 'data': {}", hex_str))
                    })?;
                    params.data = Some(bytes.into());
                }
                other => tracing::debug!("Ignoring unknown transaction option '{}'", other),
            }
        }

        Ok(params)
    }

    /// Builds the request for `to` (or a contract creation when `to` is
    /// `None`) carrying `input`. The `data` option is not consulted here.
    pub fn into_request(self, to: Option<Address>, input: Bytes) -> TransactionRequest {
        let mut request = match to.or(self.to) {
            Some(to) => TransactionRequest::default().with_to(to).with_input(input),
            None => TransactionRequest::default().with_deploy_code(input),
        };

        if let Some(from) = self.from {
            request = request.with_from(from);
        }
        if let Some(value) = self.value {
            request = request.with_value(value);
        }
        if let Some(gas) = self.gas {
            request = request.with_gas_limit(gas);
        }
        if let Some(gas_price) = self.gas_price {
            request = request.with_gas_price(gas_price);
        }
        if let Some(nonce) = self.nonce {
            request = request.with_nonce(nonce);
        }

        request
    }
}

fn address_field(key: &str, field: &Value) -> Result<Address> {
    let raw = field
        .as_str()
        .ok_or_else(|| BindingError::InvalidParams(format!("'{}' must be an address string", key)))?;
    utils::validate_address(raw).map_err(|e| BindingError::InvalidParams(e.to_string()))
}

fn quantity_field(key: &str, field: &Value) -> Result<U256> {
    utils::quantity_from_json(field)
        .map_err(|e| BindingError::InvalidParams(format!("Invalid '{}': {}", key, e)))
}

fn narrow<T: TryFrom<U256>>(key: &str, value: U256) -> Result<T> {
    T::try_from(value)
        .map_err(|_| BindingError::InvalidParams(format!("'{}' is out of range: {}", key, value)))
}
