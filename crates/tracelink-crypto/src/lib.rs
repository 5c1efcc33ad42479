//! # tracelink-crypto
//!
//! Keccak-256 hashing for the TraceLink SDK. Used to derive function
//! selectors and event signature topics from ABI signatures.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::keccak256;
