//! ABI argument encoding
//!
//! Word-oriented layout: every static value occupies one 32-byte big-endian
//! zero-padded word; dynamic values (strings, bytes, arrays) are referenced
//! by offset from the head section and carried length-prefixed in the tail.
//! Arguments are validated against their declared types before a single
//! byte is produced, so malformed calls never reach the transport.

use tracelink_primitives::U256;

use super::json::{Constructor, Function};
use super::types::{ParamType, Token};
use crate::SdkError;

/// Encode a function call: 4-byte selector followed by the argument words
pub fn encode_call(function: &Function, args: &[Token]) -> Result<Vec<u8>, SdkError> {
    let kinds: Vec<ParamType> = function.inputs.iter().map(|p| p.kind.clone()).collect();
    let mut out = function.selector().to_vec();
    out.extend(encode_arguments(&kinds, args)?);
    Ok(out)
}

/// Encode constructor arguments appended to deployment bytecode.
///
/// With no constructor entry in the ABI, any arguments are an arity error.
pub fn encode_constructor(
    constructor: Option<&Constructor>,
    bytecode: &[u8],
    args: &[Token],
) -> Result<Vec<u8>, SdkError> {
    let kinds: Vec<ParamType> = constructor
        .map(|c| c.inputs.iter().map(|p| p.kind.clone()).collect())
        .unwrap_or_default();
    let mut out = bytecode.to_vec();
    out.extend(encode_arguments(&kinds, args)?);
    Ok(out)
}

/// Encode a value sequence against its declared types.
///
/// Checks arity and per-value coercion eagerly; the encoding itself is a
/// deterministic pure transformation.
pub fn encode_arguments(kinds: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    if kinds.len() != tokens.len() {
        return Err(SdkError::Arity {
            expected: kinds.len(),
            got: tokens.len(),
        });
    }
    for (kind, token) in kinds.iter().zip(tokens) {
        token.conforms_to(kind)?;
    }
    Ok(encode_validated(kinds, tokens))
}

// Head/tail layout. Every parameter owns one 32-byte head slot: static
// values inline, dynamic values as an offset into the tail.
fn encode_validated(kinds: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let head_len = 32 * kinds.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (kind, token) in kinds.iter().zip(tokens) {
        if kind.is_dynamic() {
            head.extend(u256_word(&U256::from(head_len + tail.len())));
            tail.extend(encode_tail(kind, token));
        } else {
            head.extend(static_word(kind, token));
        }
    }

    head.extend(tail);
    head
}

/// Single 32-byte word for a static value. Used for head slots and for
/// indexed event topics.
pub(crate) fn static_word(kind: &ParamType, token: &Token) -> [u8; 32] {
    let mut word = [0u8; 32];
    match (kind, token) {
        (ParamType::Address, Token::Address(addr)) => {
            word[12..].copy_from_slice(addr.as_bytes());
        }
        (ParamType::Uint(_), Token::Uint(value)) => {
            value.to_big_endian(&mut word);
        }
        (ParamType::Int(_), Token::Int(value)) => {
            if value.negative {
                // Two's complement over the full word
                let mut abs = [0u8; 32];
                value.abs.to_big_endian(&mut abs);
                let mut carry = 1u16;
                for i in (0..32).rev() {
                    let sum = (!abs[i] as u16) + carry;
                    word[i] = sum as u8;
                    carry = sum >> 8;
                }
            } else {
                value.abs.to_big_endian(&mut word);
            }
        }
        (ParamType::Bool, Token::Bool(b)) => {
            word[31] = *b as u8;
        }
        (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
            word[..*size].copy_from_slice(data);
        }
        // Unreachable after conforms_to; a zero word keeps this total
        _ => {}
    }
    word
}

fn encode_tail(kind: &ParamType, token: &Token) -> Vec<u8> {
    match (kind, token) {
        (ParamType::Bytes, Token::Bytes(data)) => length_prefixed(data),
        (ParamType::String, Token::String(s)) => length_prefixed(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(items)) => {
            let kinds: Vec<ParamType> = items.iter().map(|_| (**inner).clone()).collect();
            let mut out = u256_word(&U256::from(items.len())).to_vec();
            out.extend(encode_validated(&kinds, items));
            out
        }
        _ => Vec::new(),
    }
}

// Length word followed by the payload zero-padded up to a word boundary
fn length_prefixed(data: &[u8]) -> Vec<u8> {
    let mut out = u256_word(&U256::from(data.len())).to_vec();
    let padded = data.len().div_ceil(32) * 32;
    out.extend(data);
    out.resize(32 + padded, 0);
    out
}

fn u256_word(value: &U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::json::ContractAbi;
    use crate::abi::types::I256;
    use tracelink_primitives::Address;

    fn abi() -> ContractAbi {
        ContractAbi::parse(
            br#"[
                {"type": "constructor", "inputs": [{"name": "name", "type": "string"}]},
                {"type": "function", "name": "sendToken",
                 "inputs": [{"name": "to", "type": "address"},
                            {"name": "amount", "type": "uint256"}],
                 "outputs": [{"name": "", "type": "bool"}]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_encode_call_layout() {
        let abi = abi();
        let to = Address::from_hex("0xf07b2cb4d766ffa81bea15b99cd459c69b9f766a").unwrap();
        let data = encode_call(
            abi.function("sendToken").unwrap(),
            &[Token::Address(to), Token::uint(1_000u64)],
        )
        .unwrap();

        // selector + two words
        assert_eq!(data.len(), 4 + 32 + 32);
        // address right-aligned in its word
        assert_eq!(&data[4 + 12..4 + 32], to.as_bytes());
        // amount big-endian in the last word
        assert_eq!(&data[4 + 32 + 30..], &[0x03, 0xe8]);
    }

    #[test]
    fn test_encode_call_is_deterministic() {
        let abi = abi();
        let to = Address::from_bytes([0x11; 20]);
        let f = abi.function("sendToken").unwrap();
        let args = [Token::Address(to), Token::uint(42u64)];
        assert_eq!(encode_call(f, &args).unwrap(), encode_call(f, &args).unwrap());
    }

    #[test]
    fn test_encode_call_arity_error() {
        let abi = abi();
        let err = encode_call(abi.function("sendToken").unwrap(), &[Token::uint(1u64)]).unwrap_err();
        assert!(matches!(err, SdkError::Arity { expected: 2, got: 1 }));
    }

    #[test]
    fn test_encode_call_type_error() {
        let abi = abi();
        let err = encode_call(
            abi.function("sendToken").unwrap(),
            &[Token::string("not an address"), Token::uint(1u64)],
        )
        .unwrap_err();
        assert!(matches!(err, SdkError::TypeMismatch { .. }));
    }

    #[test]
    fn test_encode_string_argument() {
        let encoded = encode_arguments(&[ParamType::String], &[Token::string("asset1")]).unwrap();
        // offset word + length word + one padded payload word
        assert_eq!(encoded.len(), 96);
        assert_eq!(encoded[31], 32); // offset
        assert_eq!(encoded[63], 6); // length
        assert_eq!(&encoded[64..70], b"asset1");
        assert_eq!(&encoded[70..96], &[0u8; 26]);
    }

    #[test]
    fn test_encode_string_array() {
        let encoded = encode_arguments(
            &[ParamType::Array(Box::new(ParamType::String))],
            &[Token::Array(vec![Token::string("color"), Token::string("weight")])],
        )
        .unwrap();
        // head offset word, then: count word + 2 element offsets + 2 * (len + data)
        assert_eq!(encoded[31], 32);
        assert_eq!(encoded[63], 2); // element count
        // first element offset is relative to the start of the element region
        assert_eq!(encoded[95], 64);
    }

    #[test]
    fn test_encode_negative_int() {
        let encoded =
            encode_arguments(&[ParamType::Int(256)], &[Token::Int(I256::from_i128(-1))]).unwrap();
        assert_eq!(encoded, vec![0xff; 32]);
    }

    #[test]
    fn test_encode_bool_and_fixed_bytes() {
        let encoded = encode_arguments(
            &[ParamType::Bool, ParamType::FixedBytes(4)],
            &[Token::Bool(true), Token::FixedBytes(vec![0xde, 0xad, 0xbe, 0xef])],
        )
        .unwrap();
        assert_eq!(encoded[31], 1);
        assert_eq!(&encoded[32..36], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(&encoded[36..64], &[0u8; 28]);
    }

    #[test]
    fn test_encode_constructor_appends_to_bytecode() {
        let abi = abi();
        let bytecode = vec![0x60, 0x80, 0x60, 0x40];
        let data =
            encode_constructor(abi.constructor(), &bytecode, &[Token::string("asset1")]).unwrap();
        assert_eq!(&data[..4], &bytecode[..]);
        assert_eq!(data.len(), 4 + 96);
    }

    #[test]
    fn test_encode_constructor_without_entry_rejects_args() {
        let err = encode_constructor(None, &[0x60], &[Token::string("x")]).unwrap_err();
        assert!(matches!(err, SdkError::Arity { expected: 0, got: 1 }));
        // and with no args it is just the bytecode
        assert_eq!(encode_constructor(None, &[0x60], &[]).unwrap(), vec![0x60]);
    }
}
