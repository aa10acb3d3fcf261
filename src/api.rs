/// Production base URL of the Coinranking market-data API.
pub const COINRANKING_API_BASE: &str = "https://api.coinranking.com/v2";

/// Builds endpoint URLs for the market-data API.
///
/// Constructed explicitly and passed by reference to the adapters; the base
/// is injectable so tests can point every adapter at a local server.
#[derive(Clone, Debug)]
pub struct MarketApi {
    base: String,
}

impl Default for MarketApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketApi {
    /// API rooted at [`COINRANKING_API_BASE`].
    pub fn new() -> Self {
        Self::with_base(COINRANKING_API_BASE)
    }

    /// API rooted at a custom base URL. A trailing slash is stripped.
    pub fn with_base(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_owned(),
        }
    }

    /// Detail endpoint for one coin.
    pub fn coin_url(&self, uuid: &str) -> String {
        format!("{}/coin/{uuid}", self.base)
    }

    /// Price-history endpoint for one coin over a time period (e.g. `"24h"`).
    pub fn history_url(&self, uuid: &str, period: &str) -> String {
        format!("{}/coin/{uuid}/history?timePeriod={period}", self.base)
    }

    /// Coin-list endpoint.
    pub fn coins_url(&self, limit: u32) -> String {
        format!("{}/coins?limit={limit}", self.base)
    }
}
