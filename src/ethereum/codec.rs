use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Word},
    json_abi::{Constructor, Function, Param},
    primitives::{Address, Bytes, Sign, I256, U256},
};
use serde_json::Value;
use std::str::FromStr;

use crate::error::{BindingError, Result};
use crate::ethereum::utils;

/// Encode a function call (selector + arguments)
pub fn encode_function_call(function: &Function, args: &[Value]) -> Result<Bytes> {
    let inputs = json_args_to_dyn_sol_values(&function.name, &function.inputs, args)?;
    let encoded = function
        .abi_encode_input(&inputs)
        .map_err(|e| BindingError::Abi(format!("Failed to encode inputs of '{}': {}", function.name, e)))?;
    Ok(encoded.into())
}

/// Encode constructor arguments, to be appended to the creation bytecode
pub fn encode_constructor_args(constructor: Option<&Constructor>, args: &[Value]) -> Result<Bytes> {
    let Some(constructor) = constructor else {
        if !args.is_empty() {
            return Err(BindingError::Abi(format!(
                "Contract has no constructor but {} argument(s) were given",
                args.len()
            )));
        }
        return Ok(Bytes::new());
    };

    let inputs = json_args_to_dyn_sol_values("constructor", &constructor.inputs, args)?;
    let encoded = constructor
        .abi_encode_input(&inputs)
        .map_err(|e| BindingError::Abi(format!("Failed to encode constructor arguments: {}", e)))?;
    Ok(encoded.into())
}

/// Decode the return data of an `eth_call`
pub fn decode_function_result(function: &Function, result_bytes: &Bytes) -> Result<Value> {
    if result_bytes.is_empty() {
        return Ok(Value::Null);
    }

    let decoded = function
        .abi_decode_output(result_bytes, false)
        .map_err(|e| BindingError::Abi(format!("Failed to decode output of '{}': {}", function.name, e)))?;

    dyn_sol_values_to_json(&decoded)
}

fn json_args_to_dyn_sol_values(name: &str, params: &[Param], args: &[Value]) -> Result<Vec<DynSolValue>> {
    if params.len() != args.len() {
        let expected: Vec<String> = params
            .iter()
            .map(|input| format!("{} {}", input.ty, input.name))
            .collect();
        return Err(BindingError::Abi(format!(
            "Parameter count mismatch for '{}': expected {}, got {}. Expected parameters: [{}]",
            name,
            params.len(),
            args.len(),
            expected.join(", ")
        )));
    }

    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| {
            json_to_dyn_sol_value(arg, &param.ty).map_err(|e| {
                BindingError::Abi(format!(
                    "Invalid parameter #{} ('{}' of type '{}'): {}",
                    i + 1,
                    param.name,
                    param.ty,
                    e
                ))
            })
        })
        .collect()
}

/// Convert JSON value to DynSolValue based on expected Solidity type
pub fn json_to_dyn_sol_value(value: &Value, sol_type: &str) -> std::result::Result<DynSolValue, String> {
    match sol_type {
        ty if ty.ends_with(']') => {
            let open = ty.rfind('[').ok_or_else(|| format!("Malformed array type: {}", ty))?;
            let element_type = &ty[..open];
            let fixed_len = &ty[open + 1..ty.len() - 1];
            let array = value
                .as_array()
                .ok_or_else(|| "Array parameter must be an array".to_string())?;
            let elements = array
                .iter()
                .map(|element| json_to_dyn_sol_value(element, element_type))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            if fixed_len.is_empty() {
                Ok(DynSolValue::Array(elements))
            } else {
                let expected: usize = fixed_len
                    .parse()
                    .map_err(|_| format!("Malformed array length in {}", ty))?;
                if expected != elements.len() {
                    return Err(format!("Expected {} elements, got {}", expected, elements.len()));
                }
                Ok(DynSolValue::FixedArray(elements))
            }
        }
        "address" => {
            let addr_str = value
                .as_str()
                .ok_or_else(|| "Address must be a string".to_string())?;
            let address = Address::from_str(addr_str).map_err(|e| e.to_string())?;
            Ok(DynSolValue::Address(address))
        }
        "bool" => value
            .as_bool()
            .map(DynSolValue::Bool)
            .ok_or_else(|| "Bool parameter must be a boolean".to_string()),
        "string" => value
            .as_str()
            .map(|s| DynSolValue::String(s.to_string()))
            .ok_or_else(|| "String parameter must be a string".to_string()),
        "bytes" => Ok(DynSolValue::Bytes(hex_bytes(value)?)),
        ty if ty.starts_with("bytes") => {
            let size: usize = ty[5..].parse().map_err(|_| format!("Unsupported type: {}", ty))?;
            let bytes = hex_bytes(value)?;
            if bytes.len() > size || size > 32 {
                return Err(format!("Value is too long for {}", ty));
            }
            let mut word_bytes = [0u8; 32];
            word_bytes[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(Word::from(word_bytes), size))
        }
        ty if ty.starts_with("uint") => {
            let bits = type_bits(&ty[4..])?;
            let num = match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| format!("Invalid uint value: {}", n))?,
                Value::String(s) => parse_uint(s)?,
                Value::Object(_) if utils::is_big_number(value) => {
                    match utils::parse_big_number(value).map_err(|e| e.to_string())? {
                        (false, magnitude) => magnitude,
                        (true, _) => return Err(format!("Negative value for {}", ty)),
                    }
                }
                _ => return Err("Uint must be a number or string".to_string()),
            };
            Ok(DynSolValue::Uint(num, bits))
        }
        ty if ty.starts_with("int") => {
            let bits = type_bits(&ty[3..])?;
            let num = match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(I256::try_from)
                    .and_then(|r| r.ok())
                    .ok_or_else(|| format!("Invalid int value: {}", n))?,
                Value::String(s) => I256::from_str(s).map_err(|_| format!("Invalid int string: {}", s))?,
                Value::Object(_) if utils::is_big_number(value) => {
                    let (negative, magnitude) = utils::parse_big_number(value).map_err(|e| e.to_string())?;
                    let sign = if negative { Sign::Negative } else { Sign::Positive };
                    I256::checked_from_sign_and_abs(sign, magnitude)
                        .ok_or_else(|| format!("Value out of range for {}", ty))?
                }
                _ => return Err("Int must be a number or string".to_string()),
            };
            Ok(DynSolValue::Int(num, bits))
        }
        _ => Err(format!("Unsupported Solidity type: {}", sol_type)),
    }
}

fn type_bits(suffix: &str) -> std::result::Result<usize, String> {
    if suffix.is_empty() {
        return Ok(256);
    }
    suffix
        .parse()
        .map_err(|_| format!("Invalid integer width: {}", suffix))
}

fn parse_uint(s: &str) -> std::result::Result<U256, String> {
    match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(s, 10),
    }
    .map_err(|_| format!("Invalid uint string: {}", s))
}

fn hex_bytes(value: &Value) -> std::result::Result<Vec<u8>, String> {
    let hex_str = value
        .as_str()
        .ok_or_else(|| "Bytes must be a hex string".to_string())?;
    hex::decode(hex_str.trim_start_matches("0x")).map_err(|_| format!("Invalid hex string: {}", hex_str))
}

/// Convert DynSolValue array to JSON; a single value is unwrapped
pub fn dyn_sol_values_to_json(values: &[DynSolValue]) -> Result<Value> {
    if values.len() == 1 {
        dyn_sol_value_to_json(&values[0])
    } else {
        values
            .iter()
            .map(dyn_sol_value_to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

/// Convert single DynSolValue to JSON. Numbers are rendered as decimal
/// strings so 256-bit values survive.
pub fn dyn_sol_value_to_json(value: &DynSolValue) -> Result<Value> {
    match value {
        DynSolValue::Address(addr) => Ok(Value::String(format!("0x{:x}", addr))),
        DynSolValue::Uint(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Int(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
        DynSolValue::FixedBytes(bytes, size) => Ok(Value::String(format!(
            "0x{}",
            hex::encode(&bytes[..*size])
        ))),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => items
            .iter()
            .map(dyn_sol_value_to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(BindingError::Abi(format!("Unsupported DynSolValue type: {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::json_abi::JsonAbi;
    use serde_json::json;

    fn string_to_uint() -> Function {
        let abi: JsonAbi = serde_json::from_value(json!([{
            "constant": true,
            "inputs": [{"name": "s", "type": "string"}],
            "name": "stringToUint",
            "outputs": [{"name": "result", "type": "uint256"}],
            "payable": false,
            "type": "function"
        }]))
        .unwrap();
        abi.functions().next().unwrap().clone()
    }

    #[test]
    fn test_encode_function_call_prefixes_selector() {
        let function = string_to_uint();
        let encoded = encode_function_call(&function, &[json!("42")]).unwrap();
        assert_eq!(&encoded[..4], function.selector().as_slice());
        // selector + offset + length + one padded word
        assert_eq!(encoded.len(), 4 + 32 * 3);
    }

    #[test]
    fn test_encode_function_call_arity_mismatch() {
        let function = string_to_uint();
        let err = encode_function_call(&function, &[]).unwrap_err();
        assert!(err.to_string().contains("Parameter count mismatch"));
    }

    #[test]
    fn test_decode_function_result() {
        let function = string_to_uint();
        let mut word = [0u8; 32];
        word[31] = 42;
        let decoded = decode_function_result(&function, &Bytes::from(word.to_vec())).unwrap();
        assert_eq!(decoded, json!("42"));
        assert_eq!(
            decode_function_result(&function, &Bytes::new()).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_json_to_dyn_sol_value_types() {
        assert_eq!(
            json_to_dyn_sol_value(&json!("1000"), "uint256").unwrap(),
            DynSolValue::Uint(U256::from(1000), 256)
        );
        assert_eq!(
            json_to_dyn_sol_value(&json!(7), "uint8").unwrap(),
            DynSolValue::Uint(U256::from(7), 8)
        );
        assert_eq!(
            json_to_dyn_sol_value(&json!("-3"), "int256").unwrap(),
            DynSolValue::Int(I256::try_from(-3i64).unwrap(), 256)
        );
        assert!(matches!(
            json_to_dyn_sol_value(&json!("0x01"), "bytes32").unwrap(),
            DynSolValue::FixedBytes(_, 32)
        ));
        assert!(matches!(
            json_to_dyn_sol_value(&json!([1, 2]), "uint256[2]").unwrap(),
            DynSolValue::FixedArray(_)
        ));
        assert_eq!(
            json_to_dyn_sol_value(&json!({"s": 1, "e": 18, "c": [10000]}), "uint256").unwrap(),
            DynSolValue::Uint(U256::from(10u64).pow(U256::from(18)), 256)
        );
        assert_eq!(
            json_to_dyn_sol_value(&json!({"s": -1, "e": 1, "c": [42]}), "int256").unwrap(),
            DynSolValue::Int(I256::try_from(-42i64).unwrap(), 256)
        );
        assert!(json_to_dyn_sol_value(&json!({"s": -1, "e": 0, "c": [1]}), "uint8").is_err());
        assert!(json_to_dyn_sol_value(&json!("x"), "address").is_err());
        assert!(json_to_dyn_sol_value(&json!(1), "tuple").is_err());
    }

    #[test]
    fn test_fixed_bytes_to_json_respects_size() {
        let value = DynSolValue::FixedBytes(Word::repeat_byte(0xaa), 4);
        assert_eq!(dyn_sol_value_to_json(&value).unwrap(), json!("0xaaaaaaaa"));
    }
}
