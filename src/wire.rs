use serde::Deserialize;

/// The only envelope status treated as valid.
pub const STATUS_SUCCESS: &str = "success";

/// Top-level response envelope: `{ "status": "...", "data": { ... } }`.
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>"))]
pub struct Envelope<D> {
    pub status: String,
    #[serde(default)]
    pub data: Option<D>,
}

impl<D> Envelope<D> {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Returns the payload only when the envelope reports success.
    pub fn into_success_data(self) -> Option<D> {
        if self.is_success() {
            self.data
        } else {
            None
        }
    }
}

/// Error body shape: upstream failures may carry a `message` field.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// `data` payload of the coin-detail endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct CoinData {
    pub coin: CoinDetails,
}

/// Market statistics for one coin.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CoinDetails {
    pub price: String,
    pub change: String,
    #[serde(rename = "marketCap")]
    pub market_cap: String,
    #[serde(rename = "24hVolume")]
    pub volume_24h: String,
}

/// `data` payload of the coin-history endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct HistoryData {
    pub history: Vec<PricePoint>,
}

/// One sample of a coin's price history. Delivered oldest-first by the API.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PricePoint {
    pub price: String,
    pub timestamp: i64,
}

/// `data` payload of the coin-list endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct CoinsData {
    pub coins: Vec<Coin>,
}

/// One entry of the coin-list endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub uuid: String,
    pub symbol: String,
    pub name: String,
    pub color: Option<String>,
    pub icon_url: String,
    pub market_cap: String,
    pub price: String,
    pub listed_at: i64,
    pub tier: u32,
    pub change: String,
    pub rank: u32,
}
