//! Event subscription manager
//!
//! Subscriptions share filters: two handlers with the same (address, event,
//! criteria, range) ride one polling task. Each filter task keeps a
//! (block, log index) watermark, so logs are delivered in non-decreasing
//! block order and never twice. A failing handler is reported on the fault
//! channel and never stops the stream or its neighbors.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracelink_crypto::keccak256;
use tracelink_primitives::{Address, H256};
use tracing::{debug, warn};

use crate::abi::{decode_log, static_word, DecodedLog, Event, ParamType, Token};
use crate::client::Client;
use crate::contract::Contract;
use crate::lifecycle::pause;
use crate::types::{LogFilter, TopicFilter};
use crate::SdkError;

/// Indexed-parameter match criteria: parameter name to accepted value set.
/// A parameter absent from the map matches any value.
pub type MatchCriteria = BTreeMap<String, Vec<Token>>;

/// Error a handler may return; reported on the fault channel
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Inclusive block range for a subscription. The default is "from now,
/// unbounded": only logs after the current head are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BlockRange {
    /// First block to observe; `None` means the block after the current head
    pub from: Option<u64>,
    /// Last block to observe; `None` means unbounded
    pub to: Option<u64>,
}

/// A problem encountered while dispatching a filter's logs: a handler
/// returned an error, a log failed to decode, or polling gave up a cycle.
#[derive(Debug)]
pub struct HandlerFault {
    /// Event the filter observes
    pub event: String,
    /// Contract the filter observes
    pub address: Address,
    /// Offending handler, when the fault came from one
    pub handler_id: Option<u64>,
    /// What went wrong
    pub message: String,
}

/// Handle returned by `subscribe`; pass it back to
/// [`EventWatcher::unsubscribe`]
#[derive(Debug, Clone)]
pub struct Subscription {
    key: FilterKey,
    id: u64,
}

impl Subscription {
    /// Registration-ordered handler id, unique per watcher
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Polling policy for event filters
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Delay between log queries per filter
    pub poll_interval: Duration,
    /// Consecutive transient failures tolerated before a cycle is reported
    /// on the fault channel
    pub max_transient_retries: u32,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_transient_retries: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FilterKey {
    address: Address,
    event: String,
    criteria: MatchCriteria,
    range: BlockRange,
}

#[derive(Clone)]
struct HandlerSlot {
    id: u64,
    callback: Arc<dyn Fn(&DecodedLog) -> Result<(), HandlerError> + Send + Sync>,
}

struct FilterEntry {
    handlers: Arc<Mutex<Vec<HandlerSlot>>>,
    stop: watch::Sender<bool>,
}

// Everything a filter's polling task needs, resolved at subscribe time
struct FilterJob {
    address: Address,
    event: Event,
    topics: Vec<TopicFilter>,
    // Criteria translated to decoded form: for dynamic indexed parameters
    // the wire only carries a hash, so the accepted values are hashes too.
    accepted: BTreeMap<String, Vec<Token>>,
    range: BlockRange,
}

/// Registers log filters, polls them concurrently, and dispatches decoded
/// events to subscribed handlers
pub struct EventWatcher {
    client: Client,
    config: WatcherConfig,
    filters: Mutex<HashMap<FilterKey, FilterEntry>>,
    faults: mpsc::UnboundedSender<HandlerFault>,
    next_id: AtomicU64,
}

impl EventWatcher {
    /// Watcher with the default polling policy. The receiver carries
    /// handler and polling faults; dropping it silently discards them.
    pub fn new(client: Client) -> (Self, mpsc::UnboundedReceiver<HandlerFault>) {
        Self::with_config(client, WatcherConfig::default())
    }

    /// Watcher with an explicit policy
    pub fn with_config(
        client: Client,
        config: WatcherConfig,
    ) -> (Self, mpsc::UnboundedReceiver<HandlerFault>) {
        let (faults, fault_rx) = mpsc::unbounded_channel();
        (
            Self {
                client,
                config,
                filters: Mutex::new(HashMap::new()),
                faults,
                next_id: AtomicU64::new(0),
            },
            fault_rx,
        )
    }

    /// Subscribe a handler to a contract's event, observing from now on
    pub fn subscribe<F>(
        &self,
        contract: &Contract,
        event_name: &str,
        criteria: MatchCriteria,
        handler: F,
    ) -> Result<Subscription, SdkError>
    where
        F: Fn(&DecodedLog) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.subscribe_range(contract, event_name, criteria, BlockRange::default(), handler)
    }

    /// Subscribe over an explicit block range.
    ///
    /// Spawns the filter's polling task, so this must be called within a
    /// Tokio runtime.
    pub fn subscribe_range<F>(
        &self,
        contract: &Contract,
        event_name: &str,
        criteria: MatchCriteria,
        range: BlockRange,
        handler: F,
    ) -> Result<Subscription, SdkError>
    where
        F: Fn(&DecodedLog) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let address = contract.address().ok_or(SdkError::NotBound)?;
        let event = contract.abi().event(event_name)?.clone();
        let (topics, accepted) = resolve_criteria(&event, &criteria)?;

        let key = FilterKey {
            address,
            event: event.name.clone(),
            criteria,
            range,
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let slot = HandlerSlot {
            id,
            callback: Arc::new(handler),
        };

        let mut filters = lock(&self.filters);
        if let Some(entry) = filters.get(&key) {
            lock(&entry.handlers).push(slot);
            debug!(event = %key.event, "handler joined existing filter");
        } else {
            let handlers = Arc::new(Mutex::new(vec![slot]));
            let (stop_tx, stop_rx) = watch::channel(false);
            let job = FilterJob {
                address,
                event,
                topics,
                accepted,
                range,
            };
            tokio::spawn(poll_filter(
                self.client.clone(),
                self.config.clone(),
                job,
                handlers.clone(),
                stop_rx,
                self.faults.clone(),
            ));
            filters.insert(key.clone(), FilterEntry {
                handlers,
                stop: stop_tx,
            });
            debug!(event = %key.event, address = %key.address, "filter registered");
        }

        Ok(Subscription { key, id })
    }

    /// Remove one handler. Dispatch to it stops; when a filter's last
    /// handler goes, the filter's polling task is stopped and dropped.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let mut filters = lock(&self.filters);
        let Some(entry) = filters.get(&subscription.key) else {
            return;
        };
        let empty = {
            let mut handlers = lock(&entry.handlers);
            handlers.retain(|slot| slot.id != subscription.id);
            handlers.is_empty()
        };
        if empty {
            if let Some(entry) = filters.remove(&subscription.key) {
                let _ = entry.stop.send(true);
            }
            debug!(event = %subscription.key.event, "filter dropped with last handler");
        }
    }

    /// Stop all polling promptly. Already-dispatched logs stay delivered;
    /// nothing is delivered after this returns and the tasks observe it.
    pub fn shutdown(&self) {
        let mut filters = lock(&self.filters);
        for (_, entry) in filters.drain() {
            let _ = entry.stop.send(true);
        }
    }

    /// Number of distinct filters currently polling
    pub fn active_filters(&self) -> usize {
        lock(&self.filters).len()
    }
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// Validate criteria against the event declaration and translate them into
// wire topic constraints plus decoded-form accepted values.
fn resolve_criteria(
    event: &Event,
    criteria: &MatchCriteria,
) -> Result<(Vec<TopicFilter>, BTreeMap<String, Vec<Token>>), SdkError> {
    for (name, values) in criteria {
        let input = event
            .inputs
            .iter()
            .find(|p| p.name == *name)
            .ok_or_else(|| {
                SdkError::AbiParse(format!(
                    "event `{}` has no parameter `{}`",
                    event.name, name
                ))
            })?;
        if !input.indexed {
            return Err(SdkError::AbiParse(format!(
                "cannot filter on non-indexed parameter `{}` of `{}`",
                name, event.name
            )));
        }
        if matches!(input.kind, ParamType::Array(_)) {
            return Err(SdkError::AbiParse(format!(
                "cannot filter on array parameter `{}` of `{}`",
                name, event.name
            )));
        }
        if values.is_empty() {
            return Err(SdkError::AbiParse(format!(
                "empty accepted-value set for parameter `{}`",
                name
            )));
        }
        for value in values {
            value.conforms_to(&input.kind)?;
        }
    }

    let mut topics = vec![TopicFilter::Exact(event.topic())];
    let mut accepted = BTreeMap::new();
    for input in event.indexed_inputs() {
        match criteria.get(&input.name) {
            Some(values) => {
                let hashes: Vec<H256> =
                    values.iter().map(|v| topic_for(&input.kind, v)).collect();
                topics.push(TopicFilter::OneOf(hashes));
                let decoded: Vec<Token> = values
                    .iter()
                    .map(|v| {
                        if input.kind.is_dynamic() {
                            Token::FixedBytes(topic_for(&input.kind, v).as_bytes().to_vec())
                        } else {
                            v.clone()
                        }
                    })
                    .collect();
                accepted.insert(input.name.clone(), decoded);
            }
            None => topics.push(TopicFilter::Any),
        }
    }
    while matches!(topics.last(), Some(TopicFilter::Any)) {
        topics.pop();
    }

    Ok((topics, accepted))
}

// The topic a value produces when its parameter is indexed: value types are
// their padded word, dynamic types the hash of their raw payload.
fn topic_for(kind: &ParamType, token: &Token) -> H256 {
    match (kind, token) {
        (ParamType::String, Token::String(s)) => keccak256(s.as_bytes()),
        (ParamType::Bytes, Token::Bytes(data)) => keccak256(data),
        _ => H256::from_bytes(static_word(kind, token)),
    }
}

fn log_matches(accepted: &BTreeMap<String, Vec<Token>>, log: &DecodedLog) -> bool {
    accepted.iter().all(|(name, values)| {
        log.get(name).map(|v| values.contains(v)).unwrap_or(false)
    })
}

// One filter's polling loop: the only dispatcher for its handlers.
async fn poll_filter(
    client: Client,
    config: WatcherConfig,
    job: FilterJob,
    handlers: Arc<Mutex<Vec<HandlerSlot>>>,
    mut stop: watch::Receiver<bool>,
    faults: mpsc::UnboundedSender<HandlerFault>,
) {
    // "from now": everything up to the current head is already history
    let mut next_from = match job.range.from {
        Some(from) => from,
        None => loop {
            match client.block_number().await {
                Ok(head) => break head + 1,
                Err(e) => {
                    warn!(event = %job.event.name, error = %e, "cannot establish start block");
                    if pause(&mut stop, config.poll_interval).await.is_break() {
                        return;
                    }
                }
            }
        },
    };
    let mut last_delivered: Option<(u64, u64)> = None;
    let mut transient_failures = 0u32;

    loop {
        if pause(&mut stop, config.poll_interval).await.is_break() {
            debug!(event = %job.event.name, "filter polling cancelled");
            return;
        }

        let head = match client.block_number().await {
            Ok(head) => head,
            Err(e) => {
                transient_failures =
                    bump_failures(transient_failures, &config, &job, &faults, &e);
                continue;
            }
        };
        if let Some(to) = job.range.to {
            if next_from > to {
                debug!(event = %job.event.name, "filter range exhausted");
                return;
            }
        }
        let to = job.range.to.map_or(head, |t| t.min(head));
        if to < next_from {
            continue;
        }

        let filter = LogFilter {
            address: job.address,
            from_block: next_from,
            to_block: Some(to),
            topics: job.topics.clone(),
        };
        let mut entries = match client.get_logs(&filter).await {
            Ok(entries) => {
                transient_failures = 0;
                entries
            }
            Err(e) if e.is_transient() => {
                transient_failures =
                    bump_failures(transient_failures, &config, &job, &faults, &e);
                continue;
            }
            Err(e) => {
                report(&faults, &job, None, format!("log query rejected: {}", e));
                continue;
            }
        };

        // Non-decreasing block order regardless of how the node returned them
        entries.sort_by_key(|entry| (entry.block_number, entry.log_index));
        for entry in entries {
            let position = (entry.block_number, entry.log_index);
            if last_delivered.is_some_and(|w| position <= w) {
                continue;
            }
            last_delivered = Some(position);

            let decoded = match decode_log(&job.event, &entry) {
                Ok(decoded) => decoded,
                Err(e) => {
                    report(&faults, &job, None, format!("undecodable log skipped: {}", e));
                    continue;
                }
            };
            if !log_matches(&job.accepted, &decoded) {
                continue;
            }

            // Snapshot per log so a handler can unsubscribe itself without
            // deadlocking the dispatch path
            let snapshot: Vec<HandlerSlot> = lock(&handlers).clone();
            for slot in snapshot {
                if let Err(e) = (slot.callback)(&decoded) {
                    report(&faults, &job, Some(slot.id), e.to_string());
                }
            }
        }
        next_from = to + 1;
    }
}

fn bump_failures(
    count: u32,
    config: &WatcherConfig,
    job: &FilterJob,
    faults: &mpsc::UnboundedSender<HandlerFault>,
    error: &SdkError,
) -> u32 {
    let count = count + 1;
    warn!(event = %job.event.name, attempt = count, error = %error, "transient error polling logs");
    if count > config.max_transient_retries {
        report(
            faults,
            job,
            None,
            format!(
                "log polling exhausted {} retries: {}",
                config.max_transient_retries, error
            ),
        );
        return 0;
    }
    count
}

fn report(
    faults: &mpsc::UnboundedSender<HandlerFault>,
    job: &FilterJob,
    handler_id: Option<u64>,
    message: String,
) {
    let _ = faults.send(HandlerFault {
        event: job.event.name.clone(),
        address: job.address,
        handler_id,
        message,
    });
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
