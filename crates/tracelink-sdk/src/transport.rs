//! Transport layer for RPC communication
//!
//! The transport is the session's only suspending boundary: everything that
//! can block, fail transiently, or time out funnels through
//! [`Transport::request_json`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
#[cfg(feature = "http")]
use tracing::debug;

use crate::SdkError;

#[cfg(feature = "http")]
use crate::endpoint::NodeEndpoint;

/// Object-safe request/response boundary to the node
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one RPC request and return the raw result value.
    ///
    /// A JSON `null` result is a valid response (e.g. a receipt lookup for
    /// an unmined transaction), distinct from an error.
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError>;
}

/// Deserialize a raw result value into a typed response
pub fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Serialization(e.to_string()))
}

// One scripted mock reply
#[derive(Debug, Clone)]
enum MockReply {
    Result(Value),
    TransportError(String),
    RpcError { code: i64, message: String },
}

/// Scriptable in-memory transport for tests.
///
/// Three layers answer each request: a per-method FIFO queue of one-shot
/// replies (for polling sequences), then a sticky per-method response, then
/// built-in defaults. Every request is journaled so tests can assert what
/// did and did not reach the wire.
pub struct MockTransport {
    queues: Mutex<HashMap<String, VecDeque<MockReply>>>,
    sticky: Mutex<HashMap<String, Value>>,
    defaults: HashMap<String, Value>,
    journal: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
}

impl MockTransport {
    /// Create a mock with defaults for the common methods
    pub fn new() -> Self {
        let mut defaults = HashMap::new();
        defaults.insert("net_version".to_string(), Value::String("1".into()));
        defaults.insert("eth_blockNumber".to_string(), Value::String("0x100".into()));
        defaults.insert(
            "eth_accounts".to_string(),
            serde_json::json!(["0xf07b2cb4d766ffa81bea15b99cd459c69b9f766a"]),
        );
        defaults.insert(
            "eth_getBalance".to_string(),
            Value::String("0xde0b6b3a7640000".into()),
        );
        defaults.insert("eth_getCode".to_string(), Value::String("0x".into()));
        defaults.insert("eth_call".to_string(), Value::String("0x".into()));
        defaults.insert(
            "eth_sendTransaction".to_string(),
            Value::String(
                "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".into(),
            ),
        );
        defaults.insert("eth_getTransactionReceipt".to_string(), Value::Null);
        defaults.insert("eth_getLogs".to_string(), serde_json::json!([]));
        defaults.insert("personal_unlockAccount".to_string(), Value::Bool(true));

        Self {
            queues: Mutex::new(HashMap::new()),
            sticky: Mutex::new(HashMap::new()),
            defaults,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the sticky response for a method
    pub fn respond(&self, method: &str, response: Value) {
        self.lock(&self.sticky).insert(method.to_string(), response);
    }

    /// Queue a one-shot response for a method, consumed before the sticky
    /// response. Queue order is reply order.
    pub fn enqueue(&self, method: &str, response: Value) {
        self.lock(&self.queues)
            .entry(method.to_string())
            .or_default()
            .push_back(MockReply::Result(response));
    }

    /// Queue a one-shot transport (transient) failure for a method
    pub fn enqueue_transport_error(&self, method: &str, message: &str) {
        self.lock(&self.queues)
            .entry(method.to_string())
            .or_default()
            .push_back(MockReply::TransportError(message.to_string()));
    }

    /// Queue a one-shot node error for a method
    pub fn enqueue_rpc_error(&self, method: &str, code: i64, message: &str) {
        self.lock(&self.queues)
            .entry(method.to_string())
            .or_default()
            .push_back(MockReply::RpcError {
                code,
                message: message.to_string(),
            });
    }

    /// Methods of every request received so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.lock(&self.journal).iter().map(|(m, _)| m.clone()).collect()
    }

    /// Number of requests received for one method
    pub fn request_count(&self, method: &str) -> usize {
        self.lock(&self.journal).iter().filter(|(m, _)| m == method).count()
    }

    /// Parameters of the most recent request for a method
    pub fn last_params(&self, method: &str) -> Option<Vec<Value>> {
        self.lock(&self.journal)
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        // A poisoned mutex means a test already panicked; propagating the
        // inner state is still the most useful behavior.
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        self.lock(&self.journal).push((method.to_string(), params));

        let queued = self
            .lock(&self.queues)
            .get_mut(method)
            .and_then(|q| q.pop_front());
        if let Some(reply) = queued {
            return match reply {
                MockReply::Result(value) => Ok(value),
                MockReply::TransportError(message) => Err(SdkError::Transport(message)),
                MockReply::RpcError { code, message } => Err(SdkError::Rpc { code, message }),
            };
        }

        if let Some(value) = self.lock(&self.sticky).get(method).cloned() {
            return Ok(value);
        }
        if let Some(value) = self.defaults.get(method).cloned() {
            return Ok(value);
        }

        Err(SdkError::Rpc {
            code: -32601,
            message: format!("method not found: {}", method),
        })
    }
}

/// HTTP transport speaking JSON-RPC 2.0
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    credentials: Option<crate::endpoint::Credentials>,
    request_id: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Build a transport for the given endpoint, applying its timeout and
    /// credentials to every request
    pub fn new(endpoint: &NodeEndpoint) -> Result<Self, SdkError> {
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout())
            .build()
            .map_err(|e| SdkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: endpoint.url().to_string(),
            credentials: endpoint.credentials().cloned(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": method,
            "params": params,
        });
        debug!(method, "sending RPC request");

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(creds) = &self.credentials {
            builder = builder.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;
        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(SdkError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        // `result: null` is a legitimate response, not an error
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_defaults() {
        let transport = MockTransport::new();
        let result = transport.request_json("net_version", vec![]).await.unwrap();
        assert_eq!(result, Value::String("1".into()));
        let result = transport
            .request_json("eth_getTransactionReceipt", vec![])
            .await
            .unwrap();
        assert!(result.is_null());
    }

    #[tokio::test]
    async fn test_mock_sticky_overrides_default() {
        let transport = MockTransport::new();
        transport.respond("net_version", Value::String("1337".into()));
        let result = transport.request_json("net_version", vec![]).await.unwrap();
        assert_eq!(result, Value::String("1337".into()));
    }

    #[tokio::test]
    async fn test_mock_queue_consumed_in_order() {
        let transport = MockTransport::new();
        transport.enqueue("eth_blockNumber", Value::String("0x1".into()));
        transport.enqueue("eth_blockNumber", Value::String("0x2".into()));

        let first = transport.request_json("eth_blockNumber", vec![]).await.unwrap();
        let second = transport.request_json("eth_blockNumber", vec![]).await.unwrap();
        // queue exhausted, default takes over
        let third = transport.request_json("eth_blockNumber", vec![]).await.unwrap();

        assert_eq!(first, Value::String("0x1".into()));
        assert_eq!(second, Value::String("0x2".into()));
        assert_eq!(third, Value::String("0x100".into()));
    }

    #[tokio::test]
    async fn test_mock_error_injection() {
        let transport = MockTransport::new();
        transport.enqueue_transport_error("eth_call", "connection reset");
        transport.enqueue_rpc_error("eth_call", -32000, "execution reverted");

        let first = transport.request_json("eth_call", vec![]).await;
        assert!(matches!(first, Err(SdkError::Transport(_))));
        let second = transport.request_json("eth_call", vec![]).await;
        assert!(matches!(second, Err(SdkError::Rpc { code: -32000, .. })));
    }

    #[tokio::test]
    async fn test_mock_journal() {
        let transport = MockTransport::new();
        transport
            .request_json("net_version", vec![Value::Bool(true)])
            .await
            .unwrap();
        transport.request_json("eth_blockNumber", vec![]).await.unwrap();

        assert_eq!(transport.requests(), vec!["net_version", "eth_blockNumber"]);
        assert_eq!(transport.request_count("net_version"), 1);
        assert_eq!(
            transport.last_params("net_version").unwrap(),
            vec![Value::Bool(true)]
        );
    }

    #[tokio::test]
    async fn test_mock_unknown_method() {
        let transport = MockTransport::new();
        let result = transport.request_json("eth_unheardOf", vec![]).await;
        assert!(matches!(result, Err(SdkError::Rpc { code: -32601, .. })));
    }
}
