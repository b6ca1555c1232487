use anyhow::Result;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{declare::ProfileFragment, util};

/// Finnhub `/stock/profile2` 回應，僅保留轉送需要的欄位。
///
/// 查無代碼時 Finnhub 會回傳 `{}`，缺欄位即視為解析失敗。
#[derive(Deserialize, Debug, Clone)]
pub struct CompanyProfile {
    pub name: String,
    pub ticker: String,
    #[serde(rename = "marketCapitalization")]
    pub market_capitalization: f64,
}

impl From<CompanyProfile> for ProfileFragment {
    fn from(profile: CompanyProfile) -> Self {
        ProfileFragment {
            name: profile.name,
            symbol: profile.ticker,
            market_cap: profile.market_capitalization,
        }
    }
}

pub async fn visit(client: &Client, url: &Url) -> Result<ProfileFragment> {
    let profile = util::http::get_json::<CompanyProfile>(client, url).await?;
    Ok(profile.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_profile2() {
        let text = r#"{
            "country": "US",
            "currency": "USD",
            "exchange": "NASDAQ NMS - GLOBAL MARKET",
            "ipo": "1980-12-12",
            "marketCapitalization": 2804326.5,
            "name": "Apple Inc",
            "phone": "14089961010",
            "shareOutstanding": 15634.23,
            "ticker": "AAPL",
            "weburl": "https://www.apple.com/",
            "finnhubIndustry": "Technology"
        }"#;
        let fragment: ProfileFragment = serde_json::from_str::<CompanyProfile>(text)
            .unwrap()
            .into();

        assert_eq!(fragment.name, "Apple Inc");
        assert_eq!(fragment.symbol, "AAPL");
        assert_eq!(fragment.market_cap, 2804326.5);
    }

    #[test]
    fn test_unknown_symbol_is_malformed() {
        assert!(serde_json::from_str::<CompanyProfile>("{}").is_err());
    }
}
