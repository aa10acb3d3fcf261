use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;

use crate::wire::{CoinData, CoinsData, HistoryData};
use crate::{
    Coin, CoinDetails, Envelope, FeedEngine, FeedError, FeedOptions, FeedState, KeySource,
    MarketApi, PricePoint,
};

/// Poll interval the derived adapters default to.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Coin count requested by [`CoinListFeed::new`].
pub const DEFAULT_COIN_LIMIT: u32 = 50;

fn default_options() -> FeedOptions {
    FeedOptions::polling(DEFAULT_POLL_INTERVAL)
}

/// Live market statistics for one coin.
///
/// Derives the detail-endpoint URL from a coin identifier source (empty
/// identifier means no fetch) and maps the response envelope to
/// [`CoinDetails`]. Retry, polling and staleness handling all live in the
/// wrapped [`FeedEngine`].
pub struct CoinDetailsFeed {
    inner: FeedEngine<Envelope<CoinData>>,
}

impl CoinDetailsFeed {
    pub fn new(api: &MarketApi, coin: impl Into<KeySource>) -> Self {
        Self::with_options(api, coin, default_options())
    }

    pub fn with_options(
        api: &MarketApi,
        coin: impl Into<KeySource>,
        options: FeedOptions,
    ) -> Self {
        let api = api.clone();
        let key = coin.into().map(move |uuid| {
            if uuid.is_empty() {
                String::new()
            } else {
                api.coin_url(uuid)
            }
        });
        Self {
            inner: FeedEngine::new(key, options),
        }
    }

    /// The coin's statistics, when the latest envelope reports success.
    /// Any other status (or an absent payload) yields `None` with no error.
    pub fn details(&self) -> Option<CoinDetails> {
        self.inner
            .value()
            .and_then(Envelope::into_success_data)
            .map(|data| data.coin)
    }

    pub fn error(&self) -> Option<Arc<FeedError>> {
        self.inner.error()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.is_fetching()
    }

    pub fn last_updated(&self) -> Option<SystemTime> {
        self.inner.last_updated()
    }

    pub async fn refetch(&self) {
        self.inner.refetch().await;
    }

    /// Raw engine state, for consumers that want to await changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedState<Envelope<CoinData>>> {
        self.inner.subscribe()
    }
}

/// Price history of one coin over a selectable time period.
///
/// Both the identifier and the period may be reactive; a change in either
/// re-derives the history-endpoint URL and re-activates the engine. The
/// API delivers samples oldest-first; [`CoinHistoryFeed::history`] returns
/// them newest-first.
pub struct CoinHistoryFeed {
    inner: FeedEngine<Envelope<HistoryData>>,
}

impl CoinHistoryFeed {
    pub fn new(
        api: &MarketApi,
        coin: impl Into<KeySource>,
        period: impl Into<KeySource>,
    ) -> Self {
        Self::with_options(api, coin, period, default_options())
    }

    pub fn with_options(
        api: &MarketApi,
        coin: impl Into<KeySource>,
        period: impl Into<KeySource>,
        options: FeedOptions,
    ) -> Self {
        let api = api.clone();
        let key = KeySource::join(coin, period, move |uuid, period| {
            if uuid.is_empty() {
                String::new()
            } else {
                api.history_url(uuid, period)
            }
        });
        Self {
            inner: FeedEngine::new(key, options),
        }
    }

    /// Price samples in reverse chronological order (newest first).
    /// Empty when the envelope reports failure or carries no payload.
    pub fn history(&self) -> Vec<PricePoint> {
        self.inner
            .value()
            .and_then(Envelope::into_success_data)
            .map(|data| {
                let mut history = data.history;
                history.reverse();
                history
            })
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<Arc<FeedError>> {
        self.inner.error()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.is_fetching()
    }

    pub fn last_updated(&self) -> Option<SystemTime> {
        self.inner.last_updated()
    }

    pub async fn refetch(&self) {
        self.inner.refetch().await;
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState<Envelope<HistoryData>>> {
        self.inner.subscribe()
    }
}

/// The ranked list of coins tracked by the API.
pub struct CoinListFeed {
    inner: FeedEngine<Envelope<CoinsData>>,
}

impl CoinListFeed {
    pub fn new(api: &MarketApi) -> Self {
        Self::with_limit(api, DEFAULT_COIN_LIMIT)
    }

    pub fn with_limit(api: &MarketApi, limit: u32) -> Self {
        Self::with_options(api, limit, default_options())
    }

    pub fn with_options(api: &MarketApi, limit: u32, options: FeedOptions) -> Self {
        Self {
            inner: FeedEngine::new(api.coins_url(limit), options),
        }
    }

    /// Coins from the latest successful envelope, else empty.
    pub fn coins(&self) -> Vec<Coin> {
        self.inner
            .value()
            .and_then(Envelope::into_success_data)
            .map(|data| data.coins)
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<Arc<FeedError>> {
        self.inner.error()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.is_fetching()
    }

    pub fn last_updated(&self) -> Option<SystemTime> {
        self.inner.last_updated()
    }

    pub async fn refetch(&self) {
        self.inner.refetch().await;
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState<Envelope<CoinsData>>> {
        self.inner.subscribe()
    }
}
