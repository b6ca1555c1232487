use std::fmt;

use serde::{Deserialize, Serialize};

/// Credentials and symbol forwarded to the upstream provider.
///
/// Both values are passed through unchanged; the provider decides whether
/// they are valid.
#[derive(Clone, PartialEq)]
pub struct QuoteRequest {
    pub token: String,
    pub symbol: String,
}

impl QuoteRequest {
    pub fn new(token: impl Into<String>, symbol: impl Into<String>) -> Self {
        QuoteRequest {
            token: token.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Debug for QuoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuoteRequest")
            .field("token", &"***")
            .field("symbol", &self.symbol)
            .finish()
    }
}

/// 公司基本資料
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFragment {
    pub name: String,
    /// 上游回傳的 ticker，不是查詢時帶入的代碼
    pub symbol: String,
    pub market_cap: f64,
}

/// 即時報價含漲跌、漲幅
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceFragment {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

/// Body of a successful `/stock-profile` reply.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StockProfile {
    #[serde(flatten)]
    pub profile: ProfileFragment,
    #[serde(flatten)]
    pub quote: PriceFragment,
}

/// Body of a successful `/price` reply.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StockPrice {
    pub price: f64,
}
