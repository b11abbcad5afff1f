use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::str::FromStr;

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(anyhow!("Address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!(
            "Invalid address format: '{}'. Ethereum addresses must start with '0x'",
            address
        ));
    }

    if address.len() != 42 {
        return Err(anyhow!(
            "Invalid address length: '{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        ));
    }

    let hex_part = &address[2..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!(
            "Invalid address format: '{}'. Contains non-hexadecimal characters",
            address
        ));
    }

    Address::from_str(address)
        .map_err(|e| anyhow!("Invalid Ethereum address: '{}'. Error: {}", address, e))
}

/// Parses a quantity given either as decimal or as `0x` prefixed hex
pub fn parse_quantity(value_str: &str) -> Result<U256> {
    let value_str = value_str.trim();
    if value_str.is_empty() {
        return Err(anyhow!("Value cannot be empty"));
    }

    if let Some(hex) = value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"))
    {
        U256::from_str_radix(hex, 16)
            .map_err(|_| anyhow!("Invalid hexadecimal value: '{}'", value_str))
    } else {
        U256::from_str_radix(value_str, 10).map_err(|_| {
            anyhow!(
                "Invalid numeric value: '{}'. Use decimal format or '0x' prefixed hex",
                value_str
            )
        })
    }
}

/// Reads a quantity out of a JSON number or string
pub fn quantity_from_json(value: &Value) -> Result<U256> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| anyhow!("Quantity must be a non-negative integer, got {}", n)),
        Value::String(s) => parse_quantity(s),
        other => Err(anyhow!("Quantity must be a number or string, got {}", other)),
    }
}

/// Whether a JSON value looks like a serialized big number rather than an
/// options map. Covers the bignumber.js internal shape (`s`, `e`, `c`) and the
/// `_hex` / `hex` shapes other JS libraries emit.
pub fn is_big_number(value: &Value) -> bool {
    let Value::Object(map) = value else {
        return false;
    };

    let bignumber_js = map.contains_key("s") && map.contains_key("e") && map.contains_key("c");
    let hex_shaped = ["_hex", "hex"]
        .iter()
        .any(|key| map.get(*key).and_then(Value::as_str).is_some_and(|h| h.starts_with("0x")));

    bignumber_js || hex_shaped
}

/// Reads a big number in either shape `is_big_number` accepts. Returns the
/// sign (true when negative) and the magnitude; fractions are rejected.
pub fn parse_big_number(value: &Value) -> Result<(bool, U256)> {
    let Value::Object(map) = value else {
        return Err(anyhow!("Not a big number: {}", value));
    };

    if let Some(hex) = ["_hex", "hex"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
    {
        return Ok((false, parse_quantity(hex)?));
    }

    let chunks = map
        .get("c")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Big number has no coefficient: {}", value))?;
    let exponent = map
        .get("e")
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow!("Big number has no exponent: {}", value))?;
    let negative = map.get("s").and_then(Value::as_i64) == Some(-1);

    // bignumber.js keeps base 1e14 chunks; all but the first are zero padded
    let mut digits = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let chunk = chunk
            .as_u64()
            .ok_or_else(|| anyhow!("Invalid big number chunk: {}", chunk))?;
        if i == 0 {
            digits.push_str(&chunk.to_string());
        } else {
            digits.push_str(&format!("{:014}", chunk));
        }
    }

    let digits = digits.trim_end_matches('0');
    if digits.is_empty() {
        return Ok((false, U256::ZERO));
    }
    let integer_len = exponent + 1;
    if integer_len < digits.len() as i64 {
        return Err(anyhow!("Big number is not an integer: {}", value));
    }

    let decimal = format!("{}{}", digits, "0".repeat(integer_len as usize - digits.len()));
    let magnitude = U256::from_str_radix(&decimal, 10)
        .map_err(|_| anyhow!("Big number out of range: {}", value))?;
    Ok((negative, magnitude))
}

/// Splits positional arguments into (arguments, options). The last argument
/// is taken as the options map only if it is an object and not a big number.
pub fn split_trailing_options(mut args: Vec<Value>) -> (Vec<Value>, Option<Value>) {
    match args.last() {
        Some(last) if last.is_object() && !is_big_number(last) => {
            let options = args.pop();
            (args, options)
        }
        _ => (args, None),
    }
}

/// Creates user-friendly error messages for common RPC errors
pub fn interpret_rpc_error(error: &str) -> String {
    if error.contains("execution reverted") {
        format!(
            "Transaction failed: The contract function reverted execution. {}",
            if error.contains("revert") {
                "This usually means the function's requirements were not met or an assertion failed."
            } else {
                "Check your parameters and try again."
            }
        )
    } else if error.contains("insufficient funds") {
        "Transaction failed: Insufficient funds to cover gas costs.".to_string()
    } else if error.contains("gas required exceeds allowance") {
        "Transaction failed: Gas limit too low. Try increasing the gas limit for this transaction."
            .to_string()
    } else if error.contains("nonce too low") {
        "Transaction failed: Nonce too low. Another transaction was already mined with this nonce."
            .to_string()
    } else if error.contains("unknown account") {
        "Transaction failed: The node does not manage the 'from' account. Unlock it or pick another sender.".to_string()
    } else if error.contains("connection refused") || error.contains("network unreachable") {
        "Network error: Cannot connect to RPC endpoint. Check your RPC URL configuration."
            .to_string()
    } else if error.contains("wasn't processed in") {
        format!("Confirmation timeout: {}", error)
    } else if error.contains("method not found") {
        "RPC error: The requested method is not supported by this RPC endpoint.".to_string()
    } else {
        format!("RPC error: {}", error)
    }
}
