//! # tracelink-primitives
//!
//! Primitive types shared across the TraceLink SDK: the 20-byte account and
//! contract [`Address`], the 32-byte [`H256`] hash, and the 256-bit unsigned
//! integer re-exported from `primitive-types`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::Address;
pub use error::PrimitiveError;
pub use hash::H256;

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Block height type
pub type BlockHeight = u64;

/// Gas type
pub type Gas = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_arithmetic() {
        let a = U256::from(7u64);
        let b = U256::from(5u64);
        assert_eq!(a + b, U256::from(12u64));
    }
}
