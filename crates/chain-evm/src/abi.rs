//! ABI encoding for EVM contract calls, driven by a contract's JSON
//! interface description.

use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::B256;
use serde_json::{Map, Value};

use crate::address::checksum;
use crate::error::EvmError;

/// A parsed contract interface.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    abi: JsonAbi,
}

impl ContractAbi {
    /// Parses the standard JSON ABI array emitted by solc.
    pub fn from_json(json: &str) -> Result<Self, EvmError> {
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| EvmError::AbiError(format!("invalid abi json: {e}")))?;
        Ok(Self { abi })
    }

    /// Encodes a call to `method` with string arguments coerced to the
    /// declared parameter types.
    ///
    /// Array parameters accept either the bracketed form `[a,b]` or a bare
    /// comma-separated list; address arguments may omit the `0x` prefix.
    pub fn encode_call(&self, method: &str, args: &[String]) -> Result<Vec<u8>, EvmError> {
        let function = self.function(method, Some(args.len()))?;
        if function.inputs.len() != args.len() {
            return Err(EvmError::AbiError(format!(
                "{method} expects {} arguments, got {}",
                function.inputs.len(),
                args.len()
            )));
        }

        let mut values = Vec::with_capacity(args.len());
        for (param, arg) in function.inputs.iter().zip(args) {
            let ty = param
                .resolve()
                .map_err(|e| EvmError::AbiError(format!("{method}: {e}")))?;
            values.push(coerce_arg(&ty, arg)?);
        }

        let mut data = function.selector().to_vec();
        data.extend_from_slice(&DynSolValue::Tuple(values).abi_encode_params());
        Ok(data)
    }

    /// Decodes the return data of `method` into a name → value mapping.
    ///
    /// Unnamed outputs are keyed by their position.
    pub fn decode_output(&self, method: &str, data: &[u8]) -> Result<Map<String, Value>, EvmError> {
        let function = self.function(method, None)?;
        let mut types = Vec::with_capacity(function.outputs.len());
        for param in &function.outputs {
            types.push(
                param
                    .resolve()
                    .map_err(|e| EvmError::AbiError(format!("{method}: {e}")))?,
            );
        }

        let names = function.outputs.iter().map(|p| p.name.as_str());
        let values = decode_sequence(types, data)?;
        Ok(to_mapping(names, &values))
    }

    /// Decodes an event log, returning the field mapping and the event name.
    pub fn decode_log(&self, topics: &[B256], data: &[u8]) -> Result<(Map<String, Value>, String), EvmError> {
        let signature = topics
            .first()
            .ok_or_else(|| EvmError::AbiError("log has no topics".into()))?;
        let event = self
            .abi
            .events()
            .find(|e| !e.anonymous && e.selector() == *signature)
            .ok_or_else(|| EvmError::AbiError(format!("no event matches topic {signature}")))?;

        let mut indexed = topics[1..].iter();
        let mut body_types = Vec::new();
        let mut slots: Vec<Option<DynSolValue>> = Vec::with_capacity(event.inputs.len());
        for param in &event.inputs {
            let ty = param
                .resolve()
                .map_err(|e| EvmError::AbiError(format!("{}: {e}", event.name)))?;
            if param.indexed {
                let topic = indexed.next().ok_or_else(|| {
                    EvmError::AbiError(format!("{}: missing indexed topic", event.name))
                })?;
                // Reference types are stored as their keccak hash.
                let value = if is_word_type(&ty) {
                    ty.abi_decode(topic.as_slice())
                        .map_err(|e| EvmError::AbiError(format!("{}: {e}", event.name)))?
                } else {
                    DynSolValue::FixedBytes(*topic, 32)
                };
                slots.push(Some(value));
            } else {
                body_types.push(ty);
                slots.push(None);
            }
        }

        let mut body = decode_sequence(body_types, data)?.into_iter();
        let mut values = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Some(v) => values.push(v),
                None => values.push(body.next().ok_or_else(|| {
                    EvmError::AbiError(format!("{}: short log data", event.name))
                })?),
            }
        }

        let names = event.inputs.iter().map(|p| p.name.as_str());
        Ok((to_mapping(names, &values), event.name.clone()))
    }

    /// Picks `method`, preferring the overload with `arity` inputs.
    fn function(&self, method: &str, arity: Option<usize>) -> Result<&Function, EvmError> {
        let overloads = self
            .abi
            .function(method)
            .ok_or_else(|| EvmError::AbiError(format!("unknown method {method}")))?;
        arity
            .and_then(|n| overloads.iter().find(|f| f.inputs.len() == n))
            .or_else(|| overloads.first())
            .ok_or_else(|| EvmError::AbiError(format!("unknown method {method}")))
    }
}

fn decode_sequence(types: Vec<DynSolType>, data: &[u8]) -> Result<Vec<DynSolValue>, EvmError> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    match DynSolType::Tuple(types).abi_decode_params(data) {
        Ok(DynSolValue::Tuple(values)) => Ok(values),
        Ok(other) => Ok(vec![other]),
        Err(e) => Err(EvmError::AbiError(format!("decode failed: {e}"))),
    }
}

fn is_word_type(ty: &DynSolType) -> bool {
    matches!(
        ty,
        DynSolType::Address
            | DynSolType::Bool
            | DynSolType::Int(_)
            | DynSolType::Uint(_)
            | DynSolType::FixedBytes(_)
            | DynSolType::Function
    )
}

fn coerce_arg(ty: &DynSolType, raw: &str) -> Result<DynSolValue, EvmError> {
    let arg = raw.trim();
    match ty {
        DynSolType::Array(inner) if !arg.starts_with('[') => {
            let items = if arg.is_empty() {
                Vec::new()
            } else {
                arg.split(',')
                    .map(|item| coerce_arg(inner, item))
                    .collect::<Result<Vec<_>, _>>()?
            };
            Ok(DynSolValue::Array(items))
        }
        DynSolType::Address if !arg.starts_with("0x") && !arg.starts_with("0X") => {
            coerce_arg(ty, &format!("0x{arg}"))
        }
        _ => ty
            .coerce_str(arg)
            .map_err(|e| EvmError::AbiError(format!("cannot read {arg:?} as {ty}: {e}"))),
    }
}

fn to_mapping<'a>(names: impl Iterator<Item = &'a str>, values: &[DynSolValue]) -> Map<String, Value> {
    names
        .zip(values)
        .enumerate()
        .map(|(i, (name, value))| {
            let key = if name.is_empty() { i.to_string() } else { name.to_string() };
            (key, to_json(value))
        })
        .collect()
}

/// Integers render as decimal strings so no precision is lost in JSON.
pub fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Address(a) => Value::String(checksum(a)),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
        other => Value::String(format!("{other:?}")),
    }
}
