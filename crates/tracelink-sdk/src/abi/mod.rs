//! ABI encoding and decoding for contract calls and event logs
//!
//! The codec is pure and deterministic: the same entry and arguments always
//! produce byte-identical output, and every validation failure is raised
//! before anything touches the transport.
//!
//! # Example
//!
//! ```rust
//! use tracelink_sdk::abi::{encode_call, decode_output, ContractAbi, Token};
//! use tracelink_primitives::Address;
//!
//! let abi = ContractAbi::parse(br#"[
//!     {"type": "function", "name": "sendToken",
//!      "inputs": [{"name": "to", "type": "address"},
//!                 {"name": "amount", "type": "uint256"}],
//!      "outputs": [{"name": "", "type": "bool"}]}
//! ]"#).unwrap();
//!
//! let send = abi.function("sendToken").unwrap();
//! let data = encode_call(send, &[
//!     Token::Address(Address::ZERO),
//!     Token::uint(1_000u64),
//! ]).unwrap();
//! assert_eq!(data.len(), 4 + 32 + 32);
//!
//! let outputs: Vec<_> = send.outputs.iter().map(|p| p.kind.clone()).collect();
//! let values = decode_output(&outputs, &[0u8; 32]).unwrap();
//! assert_eq!(values, vec![Token::Bool(false)]);
//! ```

mod decode;
mod encode;
mod json;
mod types;

pub use decode::{decode_log, decode_output, DecodedLog};
pub use encode::{encode_arguments, encode_call, encode_constructor};
pub use json::{Constructor, ContractAbi, Event, EventParam, Function, Param};
pub use types::{I256, ParamType, Token};

pub(crate) use encode::static_word;
