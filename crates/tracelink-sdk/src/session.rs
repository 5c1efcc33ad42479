//! Account session: the signing identity behind a contract binding

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracelink_primitives::Address;
use tracing::debug;

use crate::client::Client;
use crate::SdkError;

/// The account a contract session submits transactions as.
///
/// The account itself is immutable for the lifetime of the session, so
/// concurrent submissions can never race on which account signs which
/// transaction. Only the unlock expiry is mutable, and it is informational:
/// the node enforces the actual unlock window, and a submission after
/// node-side expiry fails with [`SdkError::Authorization`].
#[derive(Clone, Debug)]
pub struct AccountSession {
    client: Client,
    account: Address,
    unlocked_until: Arc<Mutex<Option<Instant>>>,
}

impl AccountSession {
    /// Session for a known account
    pub fn new(client: Client, account: Address) -> Self {
        Self {
            client,
            account,
            unlocked_until: Arc::new(Mutex::new(None)),
        }
    }

    /// Session for the node's first managed account, the conventional
    /// default for single-operator deployments
    pub async fn first_available(client: Client) -> Result<Self, SdkError> {
        let accounts = client.accounts().await?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| SdkError::Authorization("node manages no accounts".into()))?;
        Ok(Self::new(client, account))
    }

    /// The client this session talks through
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The session's signing account
    pub fn active_account(&self) -> Address {
        self.account
    }

    /// Ask the node to unlock the session account for `duration`.
    ///
    /// A node refusal (wrong passphrase, unknown account) surfaces as
    /// [`SdkError::Authorization`] carrying the node's message.
    pub async fn unlock(&self, passphrase: &str, duration: Duration) -> Result<(), SdkError> {
        let secs = duration.as_secs();
        let unlocked = self
            .client
            .unlock_account(&self.account, passphrase, secs)
            .await
            .map_err(|e| match e {
                SdkError::Rpc { message, .. } => SdkError::Authorization(message),
                other => other,
            })?;
        if !unlocked {
            return Err(SdkError::Authorization(format!(
                "node declined to unlock {}",
                self.account
            )));
        }

        let expiry = Instant::now() + duration;
        *self.lock_expiry() = Some(expiry);
        debug!(account = %self.account, ?duration, "account unlocked");
        Ok(())
    }

    /// When the last successful unlock expires, if any.
    ///
    /// Informational only; the node is the authority.
    pub fn unlock_expires_at(&self) -> Option<Instant> {
        *self.lock_expiry()
    }

    /// Whether the last unlock window is still open, by local clock
    pub fn is_unlocked(&self) -> bool {
        self.lock_expiry().map(|t| t > Instant::now()).unwrap_or(false)
    }

    fn lock_expiry(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.unlocked_until.lock().unwrap_or_else(|e| e.into_inner())
    }
}
