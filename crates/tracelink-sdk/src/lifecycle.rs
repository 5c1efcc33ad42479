//! Transaction lifecycle: submission through mining confirmation
//!
//! Every submitted transaction moves through an explicit state machine:
//! `Submitted`, then exactly one of `Mined`, `Failed`, or `TimedOut`.
//! Transitions are monotonic; a terminal state is never left. Each pending
//! transaction is polled by its own task, so unrelated transactions never
//! serialize on each other.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time;
use tracelink_primitives::{Address, H256};
use tracing::{debug, warn};

use crate::client::Client;
use crate::types::{TxReceipt, TxRequest};
use crate::SdkError;

/// Polling policy for pending transactions
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between receipt lookups
    pub poll_interval: Duration,
    /// Wall-clock budget for a transaction to mine. Exhausting it yields
    /// `TimedOut`; it is never silently extended.
    pub mining_timeout: Duration,
    /// Consecutive transient transport failures tolerated before the
    /// transaction is marked failed
    pub max_transient_retries: u32,
    /// Base delay after a transient failure; grows linearly per attempt
    pub retry_backoff: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            mining_timeout: Duration::from_secs(90),
            max_transient_retries: 5,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// What a transaction is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxTarget {
    /// A method call on a deployed contract
    Call {
        /// The contract being called
        to: Address,
    },
    /// Contract creation
    Create,
}

/// Observable state of a pending transaction
#[derive(Debug, Clone)]
pub enum TxStatus {
    /// Accepted by the node, not yet mined
    Submitted,
    /// Included in a block; carries the receipt
    Mined(TxReceipt),
    /// Rejected, reverted, or dropped; carries the node's reason
    Failed(String),
    /// The mining budget elapsed with no receipt
    TimedOut,
}

impl TxStatus {
    /// Whether this state ends the lifecycle
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Submitted)
    }
}

/// Submits transactions and tracks each to a terminal state
#[derive(Clone, Debug)]
pub struct TxMonitor {
    client: Client,
    config: MonitorConfig,
}

impl TxMonitor {
    /// Monitor with the default polling policy
    pub fn new(client: Client) -> Self {
        Self::with_config(client, MonitorConfig::default())
    }

    /// Monitor with an explicit policy
    pub fn with_config(client: Client, config: MonitorConfig) -> Self {
        Self { client, config }
    }

    /// The active polling policy
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Submit a transaction and start tracking it.
    ///
    /// The node signs with the sending account's unlocked key; a rejection
    /// at this point is terminal and no [`PendingTransaction`] is created.
    /// Gas parameters come from the request exactly as the caller supplied
    /// them; the monitor never estimates.
    pub async fn submit(
        &self,
        request: TxRequest,
        target: TxTarget,
    ) -> Result<PendingTransaction, SdkError> {
        let hash = self
            .client
            .send_transaction(&request)
            .await
            .map_err(classify_submission_error)?;
        debug!(%hash, ?target, "transaction submitted");

        let (status_tx, status_rx) = watch::channel(TxStatus::Submitted);
        let (stop_tx, stop_rx) = watch::channel(false);
        let client = self.client.clone();
        let config = self.config.clone();
        tokio::spawn(poll_until_terminal(client, hash, config, status_tx, stop_rx));

        Ok(PendingTransaction {
            hash,
            submitted_at: Instant::now(),
            target,
            status: status_rx,
            stop: stop_tx,
        })
    }
}

/// Handle to a submitted transaction.
///
/// Only the monitor's polling task writes the status; the handle observes.
/// Dropping the handle cancels polling, since no observer remains.
#[derive(Debug)]
pub struct PendingTransaction {
    hash: H256,
    submitted_at: Instant,
    target: TxTarget,
    status: watch::Receiver<TxStatus>,
    stop: watch::Sender<bool>,
}

impl PendingTransaction {
    /// The transaction hash the node assigned
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// What the transaction targets
    pub fn target(&self) -> &TxTarget {
        &self.target
    }

    /// When the transaction was submitted
    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Current state, without waiting
    pub fn status(&self) -> TxStatus {
        self.status.borrow().clone()
    }

    /// Stop polling promptly. The status stays wherever it was; no terminal
    /// state is fabricated.
    pub fn cancel(&self) {
        let _ = self.stop.send(true);
    }

    /// Wait for the terminal state.
    ///
    /// `Mined` resolves to the receipt; `Failed` surfaces as
    /// [`SdkError::TransactionFailed`]; an exhausted mining budget as
    /// [`SdkError::Timeout`].
    pub async fn wait(&self) -> Result<TxReceipt, SdkError> {
        let mut rx = self.status.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            match current {
                TxStatus::Submitted => {
                    if rx.changed().await.is_err() {
                        return Err(SdkError::Timeout(
                            "receipt polling stopped before a terminal state".into(),
                        ));
                    }
                }
                TxStatus::Mined(receipt) => return Ok(receipt),
                TxStatus::Failed(reason) => return Err(SdkError::TransactionFailed(reason)),
                TxStatus::TimedOut => {
                    return Err(SdkError::Timeout(format!(
                        "transaction {} not mined within budget",
                        self.hash
                    )))
                }
            }
        }
    }
}

// The single writer of a pending transaction's status.
async fn poll_until_terminal(
    client: Client,
    hash: H256,
    config: MonitorConfig,
    status: watch::Sender<TxStatus>,
    mut stop: watch::Receiver<bool>,
) {
    let deadline = Instant::now() + config.mining_timeout;
    let mut transient_failures = 0u32;

    loop {
        match client.get_receipt(&hash).await {
            Ok(Some(receipt)) => {
                if receipt.succeeded() {
                    debug!(%hash, block = receipt.block_number, "transaction mined");
                    let _ = status.send(TxStatus::Mined(receipt));
                } else {
                    let _ = status.send(TxStatus::Failed(format!(
                        "transaction {} reverted in block {}",
                        hash, receipt.block_number
                    )));
                }
                return;
            }
            Ok(None) => {
                transient_failures = 0;
            }
            Err(e) if e.is_transient() => {
                transient_failures += 1;
                warn!(%hash, attempt = transient_failures, error = %e, "transient error polling receipt");
                if transient_failures > config.max_transient_retries {
                    let _ = status.send(TxStatus::Failed(format!(
                        "receipt polling exhausted {} retries: {}",
                        config.max_transient_retries, e
                    )));
                    return;
                }
                let backoff = config.retry_backoff * transient_failures;
                if pause(&mut stop, backoff).await.is_break() {
                    return;
                }
                continue;
            }
            Err(e) => {
                // The node explicitly rejected the lookup: the transaction
                // is unknown or dropped. Terminal, not retryable.
                let _ = status.send(TxStatus::Failed(e.to_string()));
                return;
            }
        }

        if Instant::now() >= deadline {
            warn!(%hash, "mining budget exhausted");
            let _ = status.send(TxStatus::TimedOut);
            return;
        }
        if pause(&mut stop, config.poll_interval).await.is_break() {
            return;
        }
    }
}

// Sleep, but wake early on cancellation. Break means stop polling: either
// the caller cancelled or every handle was dropped.
pub(crate) async fn pause(stop: &mut watch::Receiver<bool>, period: Duration) -> ControlFlow<()> {
    tokio::select! {
        _ = time::sleep(period) => ControlFlow::Continue(()),
        changed = stop.changed() => match changed {
            Ok(()) if *stop.borrow() => ControlFlow::Break(()),
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        },
    }
}

// Map node-reported submission rejections onto the taxonomy. Transport
// errors pass through untouched: they are transient and the submission may
// be retried wholesale.
fn classify_submission_error(e: SdkError) -> SdkError {
    match e {
        SdkError::Rpc { message, .. } => {
            let lower = message.to_lowercase();
            if lower.contains("lock") || lower.contains("auth") || lower.contains("password") {
                SdkError::Authorization(message)
            } else if lower.contains("gas") {
                SdkError::InsufficientGas(message)
            } else {
                SdkError::TransactionFailed(message)
            }
        }
        other => other,
    }
}
