//! Shared parse error for the primitive types

use thiserror::Error;

/// Error produced when parsing an [`crate::Address`] or [`crate::H256`]
/// from hex or raw bytes.
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Input was not valid hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Input had the wrong byte length
    #[error("invalid length: expected {expected} bytes, got {got}")]
    BadLength {
        /// Required byte length
        expected: usize,
        /// Actual byte length
        got: usize,
    },
}
