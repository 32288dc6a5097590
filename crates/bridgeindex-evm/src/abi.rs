//! `AbiDecoder`: the [`InterfaceDecoder`] implementation for EVM bridges,
//! built on alloy's dynamic ABI types.
//!
//! # Receipts
//! Each log emitted by the bridge contract is matched by `topic0` against the
//! version's event selectors. Indexed parameters come from `topics[1..]`,
//! the rest from the ABI-encoded data payload.
//!
//! # Call input
//! The first 4 bytes select a function of the version; the remainder is the
//! ABI-encoded argument tuple.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_dyn_abi::Specifier;
use alloy_json_abi::{Event, Function};
use alloy_primitives::B256;

use bridgeindex_core::{ArgValue, DecodedArgs, IndexerError, InterfaceDecoder, InterfaceVersion, TxReceipt};

use crate::fetcher::parse_bytes;
use crate::normalizer;

/// Stateless EVM ABI decoder.
#[derive(Debug, Default, Clone)]
pub struct AbiDecoder;

impl AbiDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceDecoder for AbiDecoder {
    fn decode_receipt(
        &self,
        receipt: &TxReceipt,
        contract: &str,
        version: &InterfaceVersion,
    ) -> Result<Option<DecodedArgs>, IndexerError> {
        for log in receipt.logs.iter().filter(|l| l.address.eq_ignore_ascii_case(contract)) {
            let Some(topic0) = log.topics.first() else {
                continue;
            };
            let selector: B256 = topic0
                .parse()
                .map_err(|e| IndexerError::Decode(format!("invalid topic {topic0:?} in {}: {e}", receipt.tx_hash)))?;
            let Some(event) = version.abi.events().find(|e| !e.anonymous && e.selector() == selector) else {
                continue;
            };

            match decode_event(event, &log.topics[1..], &log.data) {
                Ok(values) => {
                    return Ok(Some(DecodedArgs {
                        name: event.name.clone(),
                        version: version.name.clone(),
                        values,
                    }))
                }
                // Same selector, different layout: leave it to another version.
                Err(reason) => tracing::debug!(
                    tx_hash = %receipt.tx_hash,
                    event = %event.name,
                    version = %version.name,
                    reason = %reason,
                    "event selector matched but payload did not decode"
                ),
            }
        }
        Ok(None)
    }

    fn decode_input(&self, input: &[u8], version: &InterfaceVersion) -> Result<Option<DecodedArgs>, IndexerError> {
        if input.len() < 4 {
            return Err(IndexerError::Decode(format!(
                "calldata too short: {} bytes (need at least 4 for selector)",
                input.len()
            )));
        }
        let (selector, args) = input.split_at(4);
        let Some(func) = version.abi.functions().find(|f| f.selector().as_slice() == selector) else {
            return Ok(None);
        };

        let values = decode_call(func, args)
            .map_err(|reason| IndexerError::Decode(format!("{} input ({}): {reason}", func.name, version.name)))?;
        Ok(Some(DecodedArgs {
            name: func.name.clone(),
            version: version.name.clone(),
            values,
        }))
    }
}

/// Decode an event's parameters in declaration order.
fn decode_event(event: &Event, topics: &[String], data: &[u8]) -> Result<Vec<(String, ArgValue)>, String> {
    let mut indexed = Vec::new();
    let mut body_types = Vec::new();
    for param in &event.inputs {
        let ty = param.resolve().map_err(|e| e.to_string())?;
        if param.indexed {
            indexed.push(ty);
        } else {
            body_types.push(ty);
        }
    }
    if topics.len() != indexed.len() {
        return Err(format!("expected {} indexed topics, found {}", indexed.len(), topics.len()));
    }

    let mut topic_values = Vec::with_capacity(indexed.len());
    for (topic, ty) in topics.iter().zip(&indexed) {
        topic_values.push(decode_topic(topic, ty)?);
    }
    let mut body_values = decode_tuple(body_types, data)?.into_iter();
    let mut topic_values = topic_values.into_iter();

    event
        .inputs
        .iter()
        .enumerate()
        .map(|(i, param)| {
            let value = if param.indexed {
                topic_values.next()
            } else {
                body_values.next().map(normalizer::normalize)
            };
            value
                .map(|v| (param_name(&param.name, i), v))
                .ok_or_else(|| format!("missing value for parameter {i}"))
        })
        .collect()
}

/// Value types are stored in topics directly; reference types only as
/// their keccak256 hash, returned here as raw bytes.
fn decode_topic(topic: &str, ty: &DynSolType) -> Result<ArgValue, String> {
    let bytes = parse_bytes(topic).map_err(|e| e.to_string())?;
    match ty {
        DynSolType::String
        | DynSolType::Bytes
        | DynSolType::Array(_)
        | DynSolType::FixedArray(..)
        | DynSolType::Tuple(_) => Ok(ArgValue::Bytes(bytes)),
        _ => ty
            .abi_decode(&bytes)
            .map(normalizer::normalize)
            .map_err(|e| format!("topic decode: {e}")),
    }
}

fn decode_call(func: &Function, args: &[u8]) -> Result<Vec<(String, ArgValue)>, String> {
    let types = func
        .inputs
        .iter()
        .map(|p| p.resolve().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    let values = decode_tuple(types, args)?;
    Ok(func
        .inputs
        .iter()
        .enumerate()
        .zip(values)
        .map(|((i, p), v)| (param_name(&p.name, i), normalizer::normalize(v)))
        .collect())
}

/// ABI-decode a parameter sequence.
fn decode_tuple(types: Vec<DynSolType>, data: &[u8]) -> Result<Vec<DynSolValue>, String> {
    if types.is_empty() {
        return Ok(vec![]);
    }
    match DynSolType::Tuple(types).abi_decode_params(data) {
        Ok(DynSolValue::Tuple(values)) => Ok(values),
        Ok(other) => Ok(vec![other]),
        Err(e) => Err(e.to_string()),
    }
}

fn param_name(name: &str, i: usize) -> String {
    if name.is_empty() {
        format!("arg{i}")
    } else {
        name.to_string()
    }
}
