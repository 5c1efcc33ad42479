//! Wire-facing request and response types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracelink_primitives::{Address, H256, U256};

use crate::SdkError;

/// Block identifier for RPC queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// A specific block height
    Number(u64),
    /// The newest block
    #[default]
    Latest,
    /// The pending block
    Pending,
    /// The genesis block
    Earliest,
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            BlockId::Number(n) => serializer.serialize_str(&format!("0x{:x}", n)),
            BlockId::Latest => serializer.serialize_str("latest"),
            BlockId::Pending => serializer.serialize_str("pending"),
            BlockId::Earliest => serializer.serialize_str("earliest"),
        }
    }
}

/// Parameters for a read-only call or a node-signed transaction submission.
///
/// Gas parameters are caller-supplied; the SDK never estimates them.
#[derive(Debug, Clone, Default)]
pub struct TxRequest {
    /// Sending account
    pub from: Option<Address>,
    /// Target contract; `None` for contract creation
    pub to: Option<Address>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price
    pub gas_price: Option<u128>,
    /// Value transferred with the call
    pub value: Option<U256>,
    /// ABI-encoded payload
    pub data: Option<Bytes>,
}

impl Serialize for TxRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let fields = [
            self.from.is_some(),
            self.to.is_some(),
            self.gas.is_some(),
            self.gas_price.is_some(),
            self.value.is_some(),
            self.data.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        let mut map = serializer.serialize_map(Some(fields))?;
        if let Some(from) = &self.from {
            map.serialize_entry("from", &from.to_hex())?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", &to.to_hex())?;
        }
        if let Some(gas) = &self.gas {
            map.serialize_entry("gas", &format!("0x{:x}", gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &format!("0x{:x}", gas_price))?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", &format!("0x{:x}", value))?;
        }
        if let Some(data) = &self.data {
            map.serialize_entry("data", &format!("0x{}", hex::encode(data)))?;
        }
        map.end()
    }
}

/// A mined transaction's receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Hash of the transaction this receipt belongs to
    pub transaction_hash: H256,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Hash of that block
    pub block_hash: Option<H256>,
    /// Address of the created contract, for creation transactions
    pub contract_address: Option<Address>,
    /// Gas consumed by the transaction
    pub gas_used: Option<u64>,
    /// Execution status: `Some(0)` means reverted, anything else success.
    /// Old nodes omit the field entirely.
    pub status: Option<u64>,
}

impl TxReceipt {
    /// Whether execution succeeded
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

// Receipt as the node serializes it: camelCase keys, hex-string numbers
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    block_hash: Option<String>,
    contract_address: Option<String>,
    gas_used: Option<String>,
    status: Option<String>,
}

impl TryFrom<RpcReceipt> for TxReceipt {
    type Error = SdkError;

    fn try_from(raw: RpcReceipt) -> Result<Self, SdkError> {
        let block_number = raw
            .block_number
            .as_deref()
            .ok_or_else(|| SdkError::Serialization("receipt missing blockNumber".into()))?;
        Ok(TxReceipt {
            transaction_hash: H256::from_hex(&raw.transaction_hash)?,
            block_number: parse_hex_u64(block_number)?,
            block_hash: raw.block_hash.as_deref().map(H256::from_hex).transpose()?,
            contract_address: raw
                .contract_address
                .as_deref()
                .map(Address::from_hex)
                .transpose()?,
            gas_used: raw.gas_used.as_deref().map(parse_hex_u64).transpose()?,
            status: raw.status.as_deref().map(parse_hex_u64).transpose()?,
        })
    }
}

/// A raw log entry as returned by a log query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Contract that emitted the log
    pub address: Address,
    /// Signature topic followed by the indexed parameter topics
    pub topics: Vec<H256>,
    /// ABI-packed non-indexed parameters
    pub data: Bytes,
    /// Block the log was included in
    pub block_number: u64,
    /// Transaction that emitted the log
    pub transaction_hash: H256,
    /// Position of the log within its block
    pub log_index: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: Option<String>,
    transaction_hash: Option<String>,
    log_index: Option<String>,
}

impl TryFrom<RpcLog> for LogEntry {
    type Error = SdkError;

    fn try_from(raw: RpcLog) -> Result<Self, SdkError> {
        let block_number = raw
            .block_number
            .as_deref()
            .ok_or_else(|| SdkError::Serialization("log missing blockNumber".into()))?;
        let transaction_hash = raw
            .transaction_hash
            .as_deref()
            .ok_or_else(|| SdkError::Serialization("log missing transactionHash".into()))?;
        Ok(LogEntry {
            address: Address::from_hex(&raw.address)?,
            topics: raw
                .topics
                .iter()
                .map(|t| H256::from_hex(t).map_err(SdkError::from))
                .collect::<Result<_, _>>()?,
            data: parse_hex_bytes(&raw.data)?,
            block_number: parse_hex_u64(block_number)?,
            transaction_hash: H256::from_hex(transaction_hash)?,
            log_index: raw
                .log_index
                .as_deref()
                .map(parse_hex_u64)
                .transpose()?
                .unwrap_or(0),
        })
    }
}

/// One topic position of a log query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicFilter {
    /// Match any value at this position
    Any,
    /// Match exactly one value
    Exact(H256),
    /// Match any of the listed values
    OneOf(Vec<H256>),
}

/// Wire form of a log query: address, block range, topic constraints
#[derive(Debug, Clone)]
pub struct LogFilter {
    /// Emitting contract
    pub address: Address,
    /// First block to search, inclusive
    pub from_block: u64,
    /// Last block to search, inclusive; `None` means `latest`
    pub to_block: Option<u64>,
    /// Topic constraints by position; trailing `Any` entries may be omitted
    pub topics: Vec<TopicFilter>,
}

impl LogFilter {
    /// Serialize into the JSON parameter object for a log query
    pub fn to_params(&self) -> serde_json::Value {
        let topics: Vec<serde_json::Value> = self
            .topics
            .iter()
            .map(|t| match t {
                TopicFilter::Any => serde_json::Value::Null,
                TopicFilter::Exact(h) => serde_json::Value::String(h.to_hex()),
                TopicFilter::OneOf(hs) => {
                    serde_json::Value::Array(hs.iter().map(|h| h.to_hex().into()).collect())
                }
            })
            .collect();

        serde_json::json!({
            "address": self.address.to_hex(),
            "fromBlock": format!("0x{:x}", self.from_block),
            "toBlock": match self.to_block {
                Some(n) => format!("0x{:x}", n),
                None => "latest".to_string(),
            },
            "topics": topics,
        })
    }
}

// ==================== Hex parsing helpers ====================

pub(crate) fn parse_hex_u64(s: &str) -> Result<u64, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(e.to_string()))
}

pub(crate) fn parse_hex_u256(s: &str) -> Result<U256, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(e.to_string()))
}

pub(crate) fn parse_hex_bytes(s: &str) -> Result<Bytes, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Bytes::new());
    }
    Ok(Bytes::from(hex::decode(s)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_serialize() {
        assert_eq!(serde_json::to_string(&BlockId::Latest).unwrap(), "\"latest\"");
        assert_eq!(serde_json::to_string(&BlockId::Number(256)).unwrap(), "\"0x100\"");
        assert_eq!(serde_json::to_string(&BlockId::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&BlockId::Earliest).unwrap(), "\"earliest\"");
    }

    #[test]
    fn test_tx_request_skips_absent_fields() {
        let req = TxRequest {
            to: Some(Address::ZERO),
            data: Some(Bytes::from(vec![0xa9, 0x05])),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["to"], "0x0000000000000000000000000000000000000000");
        assert_eq!(json["data"], "0xa905");
        assert!(json.get("from").is_none());
        assert!(json.get("gas").is_none());
    }

    #[test]
    fn test_tx_request_hex_numbers() {
        let req = TxRequest {
            from: Some(Address::from_bytes([1; 20])),
            gas: Some(0x47b760),
            gas_price: Some(1_000_000_000),
            value: Some(U256::from(10u64)),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["gas"], "0x47b760");
        assert_eq!(json["gasPrice"], "0x3b9aca00");
        assert_eq!(json["value"], "0xa");
    }

    #[test]
    fn test_receipt_deserialization() {
        let raw: RpcReceipt = serde_json::from_str(
            r#"{
                "transactionHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
                "blockNumber": "0x10",
                "blockHash": "0x0101010101010101010101010101010101010101010101010101010101010101",
                "contractAddress": "0x1dbaccedfe36189819d2f6029b8036f9a0ea398b",
                "gasUsed": "0x5208",
                "status": "0x1"
            }"#,
        )
        .unwrap();
        let receipt = TxReceipt::try_from(raw).unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used, Some(21000));
        assert!(receipt.succeeded());
        assert_eq!(
            receipt.contract_address.unwrap().to_hex(),
            "0x1dbaccedfe36189819d2f6029b8036f9a0ea398b"
        );
    }

    #[test]
    fn test_receipt_reverted_status() {
        let raw: RpcReceipt = serde_json::from_str(
            r#"{"transactionHash": "0x0101010101010101010101010101010101010101010101010101010101010101",
                "blockNumber": "0x2", "status": "0x0"}"#,
        )
        .unwrap();
        let receipt = TxReceipt::try_from(raw).unwrap();
        assert!(!receipt.succeeded());
    }

    #[test]
    fn test_receipt_without_status_is_success() {
        let raw: RpcReceipt = serde_json::from_str(
            r#"{"transactionHash": "0x0101010101010101010101010101010101010101010101010101010101010101",
                "blockNumber": "0x2"}"#,
        )
        .unwrap();
        assert!(TxReceipt::try_from(raw).unwrap().succeeded());
    }

    #[test]
    fn test_log_deserialization() {
        let raw: RpcLog = serde_json::from_str(
            r#"{
                "address": "0x1dbaccedfe36189819d2f6029b8036f9a0ea398b",
                "topics": ["0x0202020202020202020202020202020202020202020202020202020202020202"],
                "data": "0x00000000000000000000000000000000000000000000000000000000000000ff",
                "blockNumber": "0x101",
                "transactionHash": "0x0303030303030303030303030303030303030303030303030303030303030303",
                "logIndex": "0x2"
            }"#,
        )
        .unwrap();
        let log = LogEntry::try_from(raw).unwrap();
        assert_eq!(log.block_number, 257);
        assert_eq!(log.log_index, 2);
        assert_eq!(log.topics.len(), 1);
        assert_eq!(log.data.len(), 32);
    }

    #[test]
    fn test_log_filter_params() {
        let filter = LogFilter {
            address: Address::from_bytes([0xaa; 20]),
            from_block: 257,
            to_block: None,
            topics: vec![
                TopicFilter::Exact(H256::from_bytes([0x01; 32])),
                TopicFilter::Any,
                TopicFilter::OneOf(vec![H256::from_bytes([0x02; 32]), H256::from_bytes([0x03; 32])]),
            ],
        };
        let params = filter.to_params();
        assert_eq!(params["fromBlock"], "0x101");
        assert_eq!(params["toBlock"], "latest");
        assert!(params["topics"][1].is_null());
        assert_eq!(params["topics"][2].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_hex_helpers() {
        assert_eq!(parse_hex_u64("0x100").unwrap(), 256);
        assert_eq!(parse_hex_u64("ff").unwrap(), 255);
        assert_eq!(parse_hex_u256("0xde0b6b3a7640000").unwrap(), U256::exp10(18));
        assert_eq!(parse_hex_bytes("0x").unwrap().len(), 0);
        assert_eq!(parse_hex_bytes("0x1234").unwrap().as_ref(), &[0x12, 0x34]);
        assert!(parse_hex_u64("0xnope").is_err());
    }
}
