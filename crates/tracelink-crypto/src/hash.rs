//! Keccak-256 hashing

use sha3::{Digest, Keccak256};
use tracelink_primitives::H256;

/// Compute the Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_bytes(hasher.finalize().into())
}
