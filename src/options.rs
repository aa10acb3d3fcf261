use std::time::Duration;

/// Configures polling and retry behavior of a [`crate::FeedEngine`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeedOptions {
    /// Interval between automatic refetches. `None` (or a zero duration)
    /// disables polling entirely.
    pub polling_interval: Option<Duration>,
    /// Total attempts per protocol invocation, including the initial one.
    /// Values below 1 are treated as 1.
    pub max_attempts: usize,
    /// Fixed delay between failed attempts. Not applied after the final one.
    pub retry_delay: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            polling_interval: None,
            max_attempts: 4,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl FeedOptions {
    /// Default options with polling enabled at the given interval.
    pub fn polling(every: Duration) -> Self {
        Self {
            polling_interval: Some(every),
            ..Self::default()
        }
    }
}
