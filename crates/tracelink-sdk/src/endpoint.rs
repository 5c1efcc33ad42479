//! Node endpoint description

use std::time::Duration;

/// Basic-auth credentials for a node that fronts its RPC port with HTTP auth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

/// Where and how to reach a ledger node.
///
/// Immutable after construction; build one per node and hand it to
/// [`crate::Client::connect`].
#[derive(Debug, Clone)]
pub struct NodeEndpoint {
    url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl NodeEndpoint {
    /// Default per-request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Endpoint for the given RPC URL with the default timeout and no auth
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Attach basic-auth credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The RPC URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The configured credentials, if any
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
