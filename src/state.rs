use std::sync::Arc;
use std::time::SystemTime;

use crate::FeedError;

/// Snapshot of one feed's reactive outputs.
///
/// Exactly one logical instance exists per engine; it is mutated in place
/// behind a `tokio::sync::watch` channel and observed by consumers through
/// [`crate::FeedEngine::subscribe`]. While `is_fetching` is `true`, `value`
/// and `error` still describe the previous completed attempt, not the
/// in-flight one.
#[derive(Clone, Debug)]
pub struct FeedState<T> {
    /// Most recent successfully decoded payload, if any.
    pub value: Option<T>,
    /// Error from the most recent failed attempt. Shared so snapshots stay
    /// cheap to clone (`reqwest::Error` is not `Clone`).
    pub error: Option<Arc<FeedError>>,
    /// Whether a protocol invocation is currently in flight.
    pub is_fetching: bool,
    /// Wall-clock time of the last successful update.
    pub last_updated: Option<SystemTime>,
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self {
            value: None,
            error: None,
            is_fetching: false,
            last_updated: None,
        }
    }
}
