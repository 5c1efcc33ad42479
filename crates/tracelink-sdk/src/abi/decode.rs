//! ABI decoding: function return data and event logs

use std::collections::BTreeMap;

use tracelink_primitives::{Address, H256, U256};

use super::json::Event;
use super::types::{I256, ParamType, Token};
use crate::types::LogEntry;
use crate::SdkError;

/// An event occurrence decoded against its ABI entry.
///
/// Produced per poll cycle, handed to subscription handlers, then dropped.
#[derive(Debug, Clone)]
pub struct DecodedLog {
    /// Event name
    pub event: String,
    /// Parameter name to decoded value, in parameter name order.
    /// Unnamed parameters appear as `arg0`, `arg1`, ...
    pub params: BTreeMap<String, Token>,
    /// Contract that emitted the log
    pub address: Address,
    /// Block the log was included in
    pub block_number: u64,
    /// Transaction that emitted the log
    pub transaction_hash: H256,
    /// Position of the log within its block
    pub log_index: u64,
}

impl DecodedLog {
    /// Look up a decoded parameter by name
    pub fn get(&self, name: &str) -> Option<&Token> {
        self.params.get(name)
    }
}

/// Decode function return data against the declared output types
pub fn decode_output(kinds: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    decode_region(kinds, data)
}

/// Decode a raw log against an event's ABI entry.
///
/// Indexed parameters are read from the topics after the signature topic;
/// non-indexed parameters from the ABI-packed data payload; both in
/// declared parameter order. Indexed parameters of dynamic type only carry
/// their hash on the wire and are surfaced as 32-byte `FixedBytes`.
pub fn decode_log(event: &Event, entry: &LogEntry) -> Result<DecodedLog, SdkError> {
    let signature = entry
        .topics
        .first()
        .ok_or_else(|| SdkError::MalformedLog(format!("log for `{}` has no topics", event.name)))?;
    if *signature != event.topic() {
        return Err(SdkError::MalformedLog(format!(
            "signature topic does not match event `{}`",
            event.name
        )));
    }

    let indexed_count = event.indexed_inputs().count();
    if entry.topics.len() - 1 != indexed_count {
        return Err(SdkError::MalformedLog(format!(
            "event `{}` declares {} indexed parameters, log carries {} topics",
            event.name,
            indexed_count,
            entry.topics.len() - 1
        )));
    }

    let data_kinds: Vec<ParamType> = event.data_inputs().map(|p| p.kind.clone()).collect();
    let data_values = decode_region(&data_kinds, &entry.data).map_err(|e| {
        SdkError::MalformedLog(format!("data payload of `{}`: {}", event.name, e))
    })?;

    let mut params = BTreeMap::new();
    let mut topics = entry.topics[1..].iter();
    let mut values = data_values.into_iter();
    for (position, input) in event.inputs.iter().enumerate() {
        let value = if input.indexed {
            // Exactly indexed_count topics remain, checked above
            let topic = topics.next().ok_or_else(|| {
                SdkError::MalformedLog(format!("missing topic for `{}`", input.name))
            })?;
            if input.kind.is_dynamic() {
                Token::FixedBytes(topic.as_bytes().to_vec())
            } else {
                decode_word(&input.kind, topic.as_bytes())?
            }
        } else {
            values.next().ok_or_else(|| {
                SdkError::MalformedLog(format!("missing data value for `{}`", input.name))
            })?
        };
        let name = if input.name.is_empty() {
            format!("arg{}", position)
        } else {
            input.name.clone()
        };
        params.insert(name, value);
    }

    Ok(DecodedLog {
        event: event.name.clone(),
        params,
        address: entry.address,
        block_number: entry.block_number,
        transaction_hash: entry.transaction_hash,
        log_index: entry.log_index,
    })
}

// Decode a value sequence where slot i of `region` holds parameter i's word
// and dynamic offsets are relative to the region start.
fn decode_region(kinds: &[ParamType], region: &[u8]) -> Result<Vec<Token>, SdkError> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| decode_slot(kind, region, i * 32))
        .collect()
}

fn decode_slot(kind: &ParamType, region: &[u8], slot: usize) -> Result<Token, SdkError> {
    let word = read_word(region, slot)?;
    if !kind.is_dynamic() {
        return decode_word(kind, &word);
    }

    let offset = word_to_offset(&word, region.len())?;
    match kind {
        ParamType::Bytes => Ok(Token::Bytes(read_length_prefixed(region, offset)?)),
        ParamType::String => {
            let bytes = read_length_prefixed(region, offset)?;
            let s = String::from_utf8(bytes)
                .map_err(|e| SdkError::AbiDecode(format!("invalid UTF-8 string: {}", e)))?;
            Ok(Token::String(s))
        }
        ParamType::Array(inner) => {
            let len_word = read_word(region, offset)?;
            let len = word_to_offset(&len_word, region.len())?;
            let elements = region
                .get(offset + 32..)
                .ok_or_else(|| truncated(region.len(), offset + 32))?;
            let kinds: Vec<ParamType> = (0..len).map(|_| (**inner).clone()).collect();
            Ok(Token::Array(decode_region(&kinds, elements)?))
        }
        // Static kinds handled above
        _ => unreachable!("dynamic kinds are exhaustive"),
    }
}

// Decode one static value from a 32-byte word
fn decode_word(kind: &ParamType, word: &[u8; 32]) -> Result<Token, SdkError> {
    match kind {
        ParamType::Address => {
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address::from_bytes(bytes)))
        }
        ParamType::Uint(_) => Ok(Token::Uint(U256::from_big_endian(word))),
        ParamType::Int(_) => {
            if word[0] & 0x80 != 0 {
                // Two's complement back to sign-and-magnitude
                let mut abs = [0u8; 32];
                let mut carry = 1u16;
                for i in (0..32).rev() {
                    let sum = (!word[i] as u16) + carry;
                    abs[i] = sum as u8;
                    carry = sum >> 8;
                }
                Ok(Token::Int(I256::new(U256::from_big_endian(&abs), true)))
            } else {
                Ok(Token::Int(I256::new(U256::from_big_endian(word), false)))
            }
        }
        ParamType::Bool => Ok(Token::Bool(word[31] != 0)),
        ParamType::FixedBytes(size) => Ok(Token::FixedBytes(word[..*size].to_vec())),
        _ => Err(SdkError::AbiDecode(format!(
            "`{}` cannot be decoded from a single word",
            kind
        ))),
    }
}

fn read_word(region: &[u8], offset: usize) -> Result<[u8; 32], SdkError> {
    let slice = region
        .get(offset..offset + 32)
        .ok_or_else(|| truncated(region.len(), offset + 32))?;
    let mut word = [0u8; 32];
    word.copy_from_slice(slice);
    Ok(word)
}

fn read_length_prefixed(region: &[u8], offset: usize) -> Result<Vec<u8>, SdkError> {
    let len_word = read_word(region, offset)?;
    let len = word_to_offset(&len_word, region.len())?;
    region
        .get(offset + 32..offset + 32 + len)
        .map(|b| b.to_vec())
        .ok_or_else(|| truncated(region.len(), offset + 32 + len))
}

// Offsets and lengths must stay inside the region; anything larger is a
// malformed payload, not an allocation request.
fn word_to_offset(word: &[u8; 32], region_len: usize) -> Result<usize, SdkError> {
    let value = U256::from_big_endian(word);
    if value > U256::from(region_len) {
        return Err(SdkError::AbiDecode(format!(
            "offset {} beyond payload of {} bytes",
            value, region_len
        )));
    }
    Ok(value.as_usize())
}

fn truncated(have: usize, need: usize) -> SdkError {
    SdkError::AbiDecode(format!("payload truncated: need {} bytes, have {}", need, have))
}
