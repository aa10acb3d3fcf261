use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};

use crate::{wire, FeedError, FeedOptions, FeedState, KeySource, Result};

/// Reactive fetch engine: one logical subscription to a URL-identified
/// resource.
///
/// The engine resolves its [`KeySource`] to a target key, GETs it with a
/// fixed retry budget, optionally refetches on a polling interval, and
/// publishes `{ value, error, is_fetching, last_updated }` through a watch
/// channel. Whenever the resolved key changes, the poll timer is stopped,
/// the fetch protocol runs once, and a fresh timer is started; this also
/// happens once at construction.
///
/// In-flight requests are never cancelled. Instead the resolved key is
/// re-compared after every asynchronous step, and a settlement belonging to
/// a superseded key is discarded without touching any state (last key wins,
/// not last response). Poll ticks and re-activations may therefore overlap
/// in flight; the staleness check is the sole ordering mechanism.
///
/// Requires a running tokio runtime: construction spawns a background driver
/// task, which is aborted (together with any in-flight invocations) when the
/// engine is dropped.
pub struct FeedEngine<T> {
    shared: Arc<EngineShared<T>>,
    state_rx: watch::Receiver<FeedState<T>>,
    driver: JoinHandle<()>,
}

struct EngineShared<T> {
    http: reqwest::Client,
    key: KeySource,
    options: FeedOptions,
    state: watch::Sender<FeedState<T>>,
}

impl<T> fmt::Debug for FeedEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedEngine")
            .field("key", &self.shared.key)
            .field("options", &self.shared.options)
            .finish()
    }
}

impl<T> FeedEngine<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Creates an engine with a fresh `reqwest::Client` and activates it
    /// against the current resolved key.
    pub fn new(key: impl Into<KeySource>, options: FeedOptions) -> Self {
        Self::with_client(reqwest::Client::new(), key, options)
    }

    /// Creates an engine on an existing `reqwest::Client`, so one connection
    /// pool can back many feeds.
    pub fn with_client(
        http: reqwest::Client,
        key: impl Into<KeySource>,
        options: FeedOptions,
    ) -> Self {
        let key = key.into();
        let (state_tx, state_rx) = watch::channel(FeedState::default());
        let shared = Arc::new(EngineShared {
            http,
            key: key.clone(),
            options,
            state: state_tx,
        });
        let driver = tokio::spawn(drive(Arc::clone(&shared), key));
        Self {
            shared,
            state_rx,
            driver,
        }
    }

    /// Runs the fetch protocol once, outside the polling cadence, against
    /// the currently resolved key. The poll timer is not reset.
    pub async fn refetch(&self) {
        self.shared.run_protocol().await;
    }

    /// Subscribes to state changes. `Receiver::changed` resolves on every
    /// mutation of the feed state.
    pub fn subscribe(&self) -> watch::Receiver<FeedState<T>> {
        self.state_rx.clone()
    }

    /// Snapshot of the full feed state.
    pub fn state(&self) -> FeedState<T>
    where
        T: Clone,
    {
        self.state_rx.borrow().clone()
    }

    /// Most recent successfully decoded value, if any.
    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        self.state_rx.borrow().value.clone()
    }

    /// Error of the most recent failed attempt, if any.
    pub fn error(&self) -> Option<Arc<FeedError>> {
        self.state_rx.borrow().error.clone()
    }

    /// Whether a protocol invocation is currently in flight.
    pub fn is_fetching(&self) -> bool {
        self.state_rx.borrow().is_fetching
    }

    /// Wall-clock time of the last successful update.
    pub fn last_updated(&self) -> Option<SystemTime> {
        self.state_rx.borrow().last_updated
    }
}

impl<T> Drop for FeedEngine<T> {
    fn drop(&mut self) {
        // Aborting the driver drops its JoinSet, which aborts any in-flight
        // protocol invocations. No output mutation can happen afterwards.
        self.driver.abort();
    }
}

/// Background task owning the activation loop: initial fetch, key-change
/// reactions and the poll timer.
async fn drive<T>(shared: Arc<EngineShared<T>>, mut changes: KeySource)
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let mut tasks = JoinSet::new();
    let mut last_key = shared.key.resolve();
    tracing::debug!(key = %last_key, "feed engine activated");
    tasks.spawn(invoke(Arc::clone(&shared)));
    let mut poll = new_poll_timer(&shared.options);

    loop {
        tokio::select! {
            () = changes.changed() => {
                let current = shared.key.resolve();
                if current == last_key {
                    continue;
                }
                tracing::debug!(from = %last_key, to = %current, "target key changed, reactivating");
                last_key = current;
                // Stop the old poll timer before fetching, then start fresh.
                poll.take();
                tasks.spawn(invoke(Arc::clone(&shared)));
                poll = new_poll_timer(&shared.options);
            }
            () = tick(&mut poll) => {
                tracing::trace!(key = %last_key, "poll tick");
                tasks.spawn(invoke(Arc::clone(&shared)));
            }
            // Reap finished invocations so the set does not grow unbounded.
            Some(_) = tasks.join_next() => {}
        }
    }
}

fn invoke<T>(shared: Arc<EngineShared<T>>) -> impl Future<Output = ()> + Send
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async move { shared.run_protocol().await }
}

fn new_poll_timer(options: &FeedOptions) -> Option<Interval> {
    let every = options.polling_interval.filter(|interval| !interval.is_zero())?;
    // interval() would tick immediately; the activation fetch already ran.
    let mut timer = interval_at(Instant::now() + every, every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(timer)
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl<T> EngineShared<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// One invocation of the fetch protocol.
    async fn run_protocol(&self) {
        let request_key = self.key.resolve();

        if request_key.is_empty() {
            self.state.send_modify(|state| {
                state.value = None;
                state.error = None;
            });
            return;
        }

        self.state.send_modify(|state| {
            state.is_fetching = true;
            state.error = None;
        });

        let attempts = self.options.max_attempts.max(1);
        for attempt in 0..attempts {
            let outcome = self.attempt(&request_key).await;

            // Staleness check: a newer activation owns the state now.
            if self.key.resolve() != request_key {
                tracing::debug!(key = %request_key, "discarding stale fetch settlement");
                return;
            }

            match outcome {
                Ok(value) => {
                    self.state.send_modify(|state| {
                        state.value = Some(value);
                        state.error = None;
                        state.last_updated = Some(SystemTime::now());
                    });
                    break;
                }
                Err(err) => {
                    tracing::debug!(key = %request_key, attempt, error = %err, "fetch attempt failed");
                    let exhausted = attempt + 1 == attempts;
                    // The last-known-good value is deliberately preserved on
                    // failure; only the error slot is updated.
                    self.state
                        .send_modify(|state| state.error = Some(Arc::new(err)));
                    if exhausted {
                        tracing::warn!(key = %request_key, attempts, "retry budget exhausted");
                    } else {
                        sleep(self.options.retry_delay).await;
                    }
                }
            }
        }

        if self.key.resolve() == request_key {
            self.state.send_modify(|state| state.is_fetching = false);
        }
    }

    /// One network attempt: GET the key, shape failures into [`FeedError`].
    async fn attempt(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(FeedError::Transport)?;
        let status = response.status();

        if !status.is_success() {
            let fallback = || {
                format!(
                    "Error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )
            };
            let message = match response.text().await {
                Ok(body) => serde_json::from_str::<wire::ErrorBody>(&body)
                    .ok()
                    .and_then(|err| err.message)
                    .unwrap_or_else(fallback),
                Err(_) => fallback(),
            };
            return Err(FeedError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(FeedError::Transport)?;
        serde_json::from_str::<T>(&body)
            .map_err(|err| FeedError::Decode(format!("invalid response JSON: {err}")))
    }
}
