//! # Finnhub 行情來源
//!
//! 透過 Finnhub REST API 取得美股公司基本資料與即時報價。
//!
//! ## 端點
//!
//! - `GET /stock/profile2?token&symbol`：公司名稱 (`name`)、代碼 (`ticker`)、
//!   市值 (`marketCapitalization`)
//! - `GET /quote?token&symbol`：目前價 (`c`)、漲跌 (`d`)、漲跌幅 (`dp`)
//!
//! 驗證方式為 `token` 查詢參數，呼叫端帶入的 token 與 symbol 原樣轉送。

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use concat_string::concat_string;
use reqwest::{Client, Url};

use crate::{
    config,
    declare::{PriceFragment, ProfileFragment, QuoteRequest},
    error::RelayError,
    upstream::QuoteProvider,
    util,
};

/// 公司基本資料
pub mod profile;
/// 即時報價
pub mod quote;

const PROFILE_PATH: &str = "/stock/profile2";
const QUOTE_PATH: &str = "/quote";

/// Finnhub client bound to one base URL.
pub struct Finnhub {
    base_url: String,
    client: Client,
}

impl Finnhub {
    pub fn new(base_url: &str, connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        Ok(Finnhub {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: util::http::build_client(connect_timeout, timeout)?,
        })
    }

    pub fn from_settings(settings: &config::Finnhub) -> Result<Self> {
        Self::new(
            &settings.base_url,
            Duration::from_secs(settings.connect_timeout_secs),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn endpoint(&self, path: &str, req: &QuoteRequest) -> Result<Url, RelayError> {
        Url::parse_with_params(
            &concat_string!(self.base_url, path),
            &[("token", &req.token), ("symbol", &req.symbol)],
        )
        .map_err(|why| RelayError::Upstream(format!("invalid upstream url: {}", why)))
    }
}

#[async_trait]
impl QuoteProvider for Finnhub {
    async fn get_company_profile(
        &self,
        req: &QuoteRequest,
    ) -> Result<ProfileFragment, RelayError> {
        let url = self.endpoint(PROFILE_PATH, req)?;
        profile::visit(&self.client, &url)
            .await
            .map_err(|why| RelayError::from_upstream("profile request failed", why))
    }

    // 未知代碼的報價為 c: 0，這裡原樣回傳 0
    async fn get_stock_price(&self, req: &QuoteRequest) -> Result<f64, RelayError> {
        let url = self.endpoint(QUOTE_PATH, req)?;
        quote::visit(&self.client, &url)
            .await
            .map(|quote| quote.current_price)
            .map_err(|why| RelayError::from_upstream("quote request failed", why))
    }

    async fn get_stock_quotes(&self, req: &QuoteRequest) -> Result<PriceFragment, RelayError> {
        let url = self.endpoint(QUOTE_PATH, req)?;
        quote::visit(&self.client, &url)
            .await
            .and_then(PriceFragment::try_from)
            .map_err(|why| RelayError::from_upstream("quote request failed", why))
    }
}
