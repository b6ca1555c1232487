use anyhow::{anyhow, Result};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{declare::PriceFragment, util};

/// Finnhub `/quote` 回應。
///
/// 查無代碼時 `c` 為 0，`d`、`dp` 為 null。
#[derive(Deserialize, Debug, Clone)]
pub struct Quote {
    /// 目前價
    #[serde(rename = "c")]
    pub current_price: f64,
    /// 漲跌
    #[serde(rename = "d")]
    pub change: Option<f64>,
    /// 漲跌幅
    #[serde(rename = "dp")]
    pub change_percent: Option<f64>,
}

impl TryFrom<Quote> for PriceFragment {
    type Error = anyhow::Error;

    fn try_from(quote: Quote) -> Result<Self> {
        match (quote.change, quote.change_percent) {
            (Some(change), Some(change_percent)) => Ok(PriceFragment {
                price: quote.current_price,
                change,
                change_percent,
            }),
            _ => Err(anyhow!(
                "quote has no change data (d: {:?}, dp: {:?})",
                quote.change,
                quote.change_percent
            )),
        }
    }
}

pub async fn visit(client: &Client, url: &Url) -> Result<Quote> {
    util::http::get_json::<Quote>(client, url).await
}
