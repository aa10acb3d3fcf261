//! `coinfeed` turns a (possibly changing) URL into a continuously updated,
//! retry-resilient, pollable stream of live market data.
//!
//! The core is [`FeedEngine`]: it observes a [`KeySource`], fetches on every
//! key change and poll tick with a fixed retry budget, suppresses stale
//! in-flight results, and publishes its state through a watch channel. On
//! top sit thin adapters for the Coinranking-style API:
//! - [`CoinDetailsFeed`]
//! - [`CoinHistoryFeed`]
//! - [`CoinListFeed`]

mod adapters;
mod api;
mod engine;
mod error;
mod key;
mod options;
mod state;
mod wire;

pub use adapters::{
    CoinDetailsFeed, CoinHistoryFeed, CoinListFeed, DEFAULT_COIN_LIMIT, DEFAULT_POLL_INTERVAL,
};
pub use api::{MarketApi, COINRANKING_API_BASE};
pub use engine::FeedEngine;
pub use error::FeedError;
pub use key::KeySource;
pub use options::FeedOptions;
pub use state::FeedState;
pub use wire::{
    Coin, CoinData, CoinDetails, CoinsData, Envelope, HistoryData, PricePoint, STATUS_SUCCESS,
};

pub type Result<T> = std::result::Result<T, FeedError>;
