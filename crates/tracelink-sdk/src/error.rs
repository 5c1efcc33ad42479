//! SDK error taxonomy
//!
//! Every public operation returns one of these kinds so callers can branch
//! on failure class: retry on [`SdkError::Transport`], re-unlock on
//! [`SdkError::Authorization`], fix the call site on the codec errors.

use thiserror::Error;

/// SDK error type
#[derive(Debug, Error)]
pub enum SdkError {
    /// Network-level failure (connect, send, per-request timeout).
    /// Transient: the same call may succeed if retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// Error object returned by the node's RPC layer
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// Node error code
        code: i64,
        /// Node error message
        message: String,
    },

    /// Account unlock failed or the unlock expired. Not retryable without
    /// re-unlocking.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// Wrong number of arguments for an ABI entry
    #[error("wrong argument count: expected {expected}, got {got}")]
    Arity {
        /// Parameter count the ABI entry declares
        expected: usize,
        /// Argument count supplied by the caller
        got: usize,
    },

    /// An argument cannot be coerced to its declared ABI type
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Declared parameter type
        expected: String,
        /// Description of the offending value
        got: String,
    },

    /// A log's topics/data disagree with the event's declared parameters
    #[error("malformed log: {0}")]
    MalformedLog(String),

    /// The ABI description blob is invalid, or names an unknown entry
    #[error("ABI error: {0}")]
    AbiParse(String),

    /// Return data or log data could not be decoded against the ABI
    #[error("ABI decoding error: {0}")]
    AbiDecode(String),

    /// Contract deployment failed or never mined
    #[error("deployment failed: {0}")]
    Deployment(String),

    /// The node rejected or reverted a submitted transaction
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// The node rejected a submission over its gas parameters
    #[error("insufficient gas specified: {0}")]
    InsufficientGas(String),

    /// A wall-clock budget was exhausted. The whole operation may be retried.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Call or send attempted on a binding with no address yet
    #[error("contract binding has no address")]
    NotBound,

    /// Invalid hex in an RPC response
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// JSON (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SdkError {
    /// True for failures that may succeed if the same call is retried
    pub fn is_transient(&self) -> bool {
        matches!(self, SdkError::Transport(_))
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl From<tracelink_primitives::PrimitiveError> for SdkError {
    fn from(e: tracelink_primitives::PrimitiveError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}
