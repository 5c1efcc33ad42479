//! ABI parameter types and argument values

use std::fmt;

use tracelink_primitives::{Address, U256};

use crate::SdkError;

/// Closed set of ABI parameter types the session encodes.
///
/// `Array` makes the set recursive; extending the codec means adding a
/// variant here and teaching [`super::encode`] / [`super::decode`] about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// 20-byte address
    Address,
    /// Unsigned integer with bit width (8, 16, .., 256)
    Uint(usize),
    /// Signed integer with bit width
    Int(usize),
    /// Boolean
    Bool,
    /// Dynamic byte string
    Bytes,
    /// Fixed-size byte string (1-32 bytes)
    FixedBytes(usize),
    /// UTF-8 string
    String,
    /// Dynamic array of a single element type
    Array(Box<ParamType>),
}

impl ParamType {
    /// Whether the type is dynamically sized (encoded in the tail section)
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ParamType::Bytes | ParamType::String | ParamType::Array(_))
    }

    /// Parse a Solidity-style type string, e.g. `uint256`, `address`,
    /// `string[]`, `bytes32`.
    pub fn parse(s: &str) -> Result<Self, SdkError> {
        let s = s.trim();

        if let Some(inner) = s.strip_suffix("[]") {
            return Ok(ParamType::Array(Box::new(Self::parse(inner)?)));
        }
        if s.contains('[') {
            return Err(SdkError::AbiParse(format!(
                "fixed-size arrays are not supported: {}",
                s
            )));
        }

        match s {
            "address" => return Ok(ParamType::Address),
            "bool" => return Ok(ParamType::Bool),
            "string" => return Ok(ParamType::String),
            "bytes" => return Ok(ParamType::Bytes),
            _ => {}
        }

        if let Some(rest) = s.strip_prefix("uint") {
            return Ok(ParamType::Uint(parse_bit_width(s, rest)?));
        }
        if let Some(rest) = s.strip_prefix("int") {
            return Ok(ParamType::Int(parse_bit_width(s, rest)?));
        }
        if let Some(rest) = s.strip_prefix("bytes") {
            let size: usize = rest
                .parse()
                .map_err(|_| SdkError::AbiParse(format!("invalid bytes size: {}", s)))?;
            if size == 0 || size > 32 {
                return Err(SdkError::AbiParse(format!("bytes size out of range: {}", s)));
            }
            return Ok(ParamType::FixedBytes(size));
        }

        Err(SdkError::AbiParse(format!("unknown type: {}", s)))
    }
}

fn parse_bit_width(full: &str, rest: &str) -> Result<usize, SdkError> {
    let bits: usize = if rest.is_empty() {
        256
    } else {
        rest.parse()
            .map_err(|_| SdkError::AbiParse(format!("invalid integer width: {}", full)))?
    };
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(SdkError::AbiParse(format!("integer width out of range: {}", full)));
    }
    Ok(bits)
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Int(bits) => write!(f, "int{}", bits),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::FixedBytes(size) => write!(f, "bytes{}", size),
            ParamType::String => write!(f, "string"),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

/// An argument or decoded value, tagged by shape.
///
/// Coercion to a declared [`ParamType`] is explicit and checked: see
/// [`Token::conforms_to`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// 20-byte address
    Address(Address),
    /// Unsigned integer
    Uint(U256),
    /// Signed integer
    Int(I256),
    /// Boolean
    Bool(bool),
    /// Dynamic byte string
    Bytes(Vec<u8>),
    /// Fixed-size byte string
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Array of values
    Array(Vec<Token>),
}

/// Signed 256-bit integer, sign-and-magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct I256 {
    /// Absolute value
    pub abs: U256,
    /// True if negative
    pub negative: bool,
}

impl I256 {
    /// Create from magnitude and sign
    pub fn new(abs: U256, negative: bool) -> Self {
        // Normalize negative zero so equality behaves
        let negative = negative && !abs.is_zero();
        Self { abs, negative }
    }

    /// Create from a native i128
    pub fn from_i128(value: i128) -> Self {
        if value < 0 {
            Self::new(U256::from(value.unsigned_abs()), true)
        } else {
            Self::new(U256::from(value as u128), false)
        }
    }

    /// True for zero
    pub fn is_zero(&self) -> bool {
        self.abs.is_zero()
    }
}

impl Token {
    /// Convenience constructor for a string token
    pub fn string(s: impl Into<String>) -> Self {
        Token::String(s.into())
    }

    /// Convenience constructor for a uint token from a native integer
    pub fn uint(value: impl Into<U256>) -> Self {
        Token::Uint(value.into())
    }

    /// Short name of the token's shape, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Token::Address(_) => "address",
            Token::Uint(_) => "uint",
            Token::Int(_) => "int",
            Token::Bool(_) => "bool",
            Token::Bytes(_) => "bytes",
            Token::FixedBytes(_) => "fixed bytes",
            Token::String(_) => "string",
            Token::Array(_) => "array",
        }
    }

    /// Check that this token can be encoded as `kind`.
    ///
    /// Width-checked: a `uint8` argument of 256 is a
    /// [`SdkError::TypeMismatch`], not a silent truncation. Performed before
    /// any transport call.
    pub fn conforms_to(&self, kind: &ParamType) -> Result<(), SdkError> {
        match (kind, self) {
            (ParamType::Address, Token::Address(_)) => Ok(()),
            (ParamType::Bool, Token::Bool(_)) => Ok(()),
            (ParamType::Bytes, Token::Bytes(_)) => Ok(()),
            (ParamType::String, Token::String(_)) => Ok(()),
            (ParamType::Uint(bits), Token::Uint(value)) => {
                if *bits < 256 && *value >= (U256::one() << *bits) {
                    return Err(mismatch(kind, format!("uint value {} exceeds {} bits", value, bits)));
                }
                Ok(())
            }
            (ParamType::Int(bits), Token::Int(value)) => {
                let limit = U256::one() << (bits - 1);
                let fits = if value.negative {
                    value.abs <= limit
                } else {
                    value.abs < limit
                };
                if !fits {
                    return Err(mismatch(kind, format!("int magnitude {} exceeds {} bits", value.abs, bits)));
                }
                Ok(())
            }
            (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
                if data.len() != *size {
                    return Err(mismatch(kind, format!("{} bytes", data.len())));
                }
                Ok(())
            }
            (ParamType::Array(inner), Token::Array(items)) => {
                for item in items {
                    item.conforms_to(inner)?;
                }
                Ok(())
            }
            _ => Err(mismatch(kind, self.kind_name().to_string())),
        }
    }
}

fn mismatch(expected: &ParamType, got: String) -> SdkError {
    SdkError::TypeMismatch {
        expected: expected.to_string(),
        got,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_types() {
        assert_eq!(ParamType::parse("address").unwrap(), ParamType::Address);
        assert_eq!(ParamType::parse("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(ParamType::parse("uint8").unwrap(), ParamType::Uint(8));
        assert_eq!(ParamType::parse("int128").unwrap(), ParamType::Int(128));
        assert_eq!(ParamType::parse("bool").unwrap(), ParamType::Bool);
        assert_eq!(ParamType::parse("bytes").unwrap(), ParamType::Bytes);
        assert_eq!(ParamType::parse("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert_eq!(ParamType::parse("string").unwrap(), ParamType::String);
    }

    #[test]
    fn test_parse_arrays() {
        assert_eq!(
            ParamType::parse("uint256[]").unwrap(),
            ParamType::Array(Box::new(ParamType::Uint(256)))
        );
        assert_eq!(
            ParamType::parse("string[]").unwrap(),
            ParamType::Array(Box::new(ParamType::String))
        );
        // Nested arrays parse recursively
        assert_eq!(
            ParamType::parse("address[][]").unwrap(),
            ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::Address))))
        );
    }

    #[test]
    fn test_parse_rejects_bad_widths() {
        assert!(ParamType::parse("uint7").is_err());
        assert!(ParamType::parse("uint264").is_err());
        assert!(ParamType::parse("int0").is_err());
        assert!(ParamType::parse("bytes0").is_err());
        assert!(ParamType::parse("bytes33").is_err());
        assert!(ParamType::parse("uint256[3]").is_err());
        assert!(ParamType::parse("mapping").is_err());
    }

    #[test]
    fn test_display_matches_parse() {
        for s in ["address", "uint256", "int64", "bool", "bytes", "bytes8", "string", "uint8[]"] {
            assert_eq!(ParamType::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_is_dynamic() {
        assert!(!ParamType::Address.is_dynamic());
        assert!(!ParamType::Uint(256).is_dynamic());
        assert!(!ParamType::FixedBytes(32).is_dynamic());
        assert!(ParamType::Bytes.is_dynamic());
        assert!(ParamType::String.is_dynamic());
        assert!(ParamType::Array(Box::new(ParamType::Uint(8))).is_dynamic());
    }

    #[test]
    fn test_conforms_checks_shape() {
        assert!(Token::Bool(true).conforms_to(&ParamType::Bool).is_ok());
        assert!(matches!(
            Token::string("red").conforms_to(&ParamType::Uint(256)),
            Err(SdkError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_conforms_checks_uint_width() {
        assert!(Token::uint(255u64).conforms_to(&ParamType::Uint(8)).is_ok());
        assert!(matches!(
            Token::uint(256u64).conforms_to(&ParamType::Uint(8)),
            Err(SdkError::TypeMismatch { .. })
        ));
        assert!(Token::Uint(U256::MAX).conforms_to(&ParamType::Uint(256)).is_ok());
    }

    #[test]
    fn test_conforms_checks_int_width() {
        assert!(Token::Int(I256::from_i128(127)).conforms_to(&ParamType::Int(8)).is_ok());
        assert!(Token::Int(I256::from_i128(-128)).conforms_to(&ParamType::Int(8)).is_ok());
        assert!(Token::Int(I256::from_i128(128)).conforms_to(&ParamType::Int(8)).is_err());
        assert!(Token::Int(I256::from_i128(-129)).conforms_to(&ParamType::Int(8)).is_err());
    }

    #[test]
    fn test_conforms_checks_fixed_bytes_length() {
        assert!(Token::FixedBytes(vec![0; 32]).conforms_to(&ParamType::FixedBytes(32)).is_ok());
        assert!(Token::FixedBytes(vec![0; 31]).conforms_to(&ParamType::FixedBytes(32)).is_err());
    }

    #[test]
    fn test_conforms_checks_array_elements() {
        let kind = ParamType::Array(Box::new(ParamType::Uint(8)));
        assert!(Token::Array(vec![Token::uint(1u64), Token::uint(2u64)])
            .conforms_to(&kind)
            .is_ok());
        assert!(Token::Array(vec![Token::uint(1u64), Token::Bool(false)])
            .conforms_to(&kind)
            .is_err());
        assert!(Token::Array(vec![Token::uint(300u64)]).conforms_to(&kind).is_err());
    }

    #[test]
    fn test_i256_normalizes_negative_zero() {
        assert_eq!(I256::new(U256::zero(), true), I256::from_i128(0));
        assert!(I256::from_i128(-5).negative);
        assert_eq!(I256::from_i128(-5).abs, U256::from(5u64));
    }
}
