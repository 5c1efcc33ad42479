//! RPC client: typed wrappers over the transport

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tracelink_primitives::{Address, H256, U256};
#[cfg(feature = "http")]
use tracing::debug;

use crate::transport::{deserialize_response, MockTransport, Transport};
use crate::types::{
    parse_hex_bytes, parse_hex_u64, parse_hex_u256, BlockId, LogEntry, LogFilter, RpcLog,
    RpcReceipt, TxReceipt, TxRequest,
};
use crate::SdkError;

#[cfg(feature = "http")]
use crate::endpoint::NodeEndpoint;
#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Handle to one ledger node.
///
/// Cheap to clone; every clone shares the same transport. The client holds
/// no session state; accounts live in [`crate::AccountSession`].
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    network_id: Option<u64>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("network_id", &self.network_id)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connect to a node and verify it responds.
    ///
    /// Performs one `net_version` round-trip, which both checks
    /// connectivity and caches the network id.
    #[cfg(feature = "http")]
    pub async fn connect(endpoint: &NodeEndpoint) -> Result<Self, SdkError> {
        let transport = HttpTransport::new(endpoint)?;
        let mut client = Self {
            transport: Arc::new(transport),
            network_id: None,
        };
        let network_id = client.fetch_network_id().await?;
        client.network_id = Some(network_id);
        debug!(network_id, url = endpoint.url(), "connected to node");
        Ok(client)
    }

    /// Client over a mock transport, for tests
    pub fn new_mock() -> (Self, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        (
            Self {
                transport: transport.clone(),
                network_id: Some(1),
            },
            transport,
        )
    }

    /// Client over a caller-supplied transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            network_id: None,
        }
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        let value = self.transport.request_json(method, params).await?;
        deserialize_response(value)
    }

    // ==================== Node info ====================

    /// The node's network id
    pub async fn network_id(&self) -> Result<u64, SdkError> {
        if let Some(id) = self.network_id {
            return Ok(id);
        }
        self.fetch_network_id().await
    }

    async fn fetch_network_id(&self) -> Result<u64, SdkError> {
        // net_version returns a decimal string
        let result: String = self.request("net_version", vec![]).await?;
        result
            .parse()
            .map_err(|_| SdkError::Serialization(format!("invalid network id: {}", result)))
    }

    /// The current block height
    pub async fn block_number(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&result)
    }

    // ==================== Accounts ====================

    /// Accounts the node manages
    pub async fn accounts(&self) -> Result<Vec<Address>, SdkError> {
        let result: Vec<String> = self.request("eth_accounts", vec![]).await?;
        result
            .iter()
            .map(|s| Address::from_hex(s).map_err(SdkError::from))
            .collect()
    }

    /// Ask the node to unlock an account for `duration_secs` seconds.
    ///
    /// Unlocking is a remote capability of the node's key store, not a
    /// local operation.
    pub async fn unlock_account(
        &self,
        account: &Address,
        passphrase: &str,
        duration_secs: u64,
    ) -> Result<bool, SdkError> {
        self.request(
            "personal_unlockAccount",
            vec![
                Value::String(account.to_hex()),
                Value::String(passphrase.to_string()),
                Value::Number(duration_secs.into()),
            ],
        )
        .await
    }

    /// Balance of an address at a block
    pub async fn get_balance(&self, address: &Address, block: BlockId) -> Result<U256, SdkError> {
        let result: String = self
            .request(
                "eth_getBalance",
                vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_u256(&result)
    }

    /// Code deployed at an address
    pub async fn get_code(&self, address: &Address, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_getCode",
                vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    // ==================== Calls and submissions ====================

    /// Execute a read-only call; no transaction is created
    pub async fn call(&self, request: &TxRequest, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_call",
                vec![serde_json::to_value(request)?, serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    /// Submit a transaction for the node to sign with the sending account's
    /// unlocked key. Returns the transaction hash.
    pub async fn send_transaction(&self, request: &TxRequest) -> Result<H256, SdkError> {
        let result: String = self
            .request("eth_sendTransaction", vec![serde_json::to_value(request)?])
            .await?;
        H256::from_hex(&result).map_err(SdkError::from)
    }

    // ==================== Receipts and logs ====================

    /// Receipt for a transaction hash; `None` while unmined
    pub async fn get_receipt(&self, hash: &H256) -> Result<Option<TxReceipt>, SdkError> {
        let value = self
            .transport
            .request_json(
                "eth_getTransactionReceipt",
                vec![Value::String(hash.to_hex())],
            )
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RpcReceipt = deserialize_response(value)?;
        Ok(Some(TxReceipt::try_from(raw)?))
    }

    /// Logs matching a filter
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, SdkError> {
        let raw: Vec<RpcLog> = self.request("eth_getLogs", vec![filter.to_params()]).await?;
        raw.into_iter().map(LogEntry::try_from).collect()
    }
}
