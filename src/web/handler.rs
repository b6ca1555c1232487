use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    declare::{ProfileFragment, QuoteRequest, StockPrice, StockProfile},
    error::RelayError,
    logging,
    web::AppState,
};

/// Query string of `/stock-profile` and `/price`.
#[derive(Deserialize, Default)]
pub struct QuoteParams {
    pub token: Option<String>,
    pub symbol: Option<String>,
}

impl QuoteParams {
    /// The query token wins; the configured token is the fallback.
    fn into_request(self, default_token: &str) -> Result<QuoteRequest, RelayError> {
        let symbol = self
            .symbol
            .filter(|symbol| !symbol.trim().is_empty())
            .ok_or_else(|| RelayError::InvalidRequest("symbol is required".to_string()))?;

        let token = match self.token.filter(|token| !token.is_empty()) {
            Some(token) => token,
            None if !default_token.is_empty() => default_token.to_string(),
            None => return Err(RelayError::InvalidRequest("token is required".to_string())),
        };

        Ok(QuoteRequest::new(token, symbol))
    }
}

fn quote_request(
    params: Result<Query<QuoteParams>, QueryRejection>,
    state: &AppState,
) -> Result<QuoteRequest, RelayError> {
    let Query(params) = params.map_err(|why| RelayError::InvalidRequest(why.body_text()))?;
    params.into_request(&state.default_token)
}

pub async fn index() -> &'static str {
    "welcome to stock data"
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 公司基本資料與即時報價合併回傳
///
/// 兩個上游請求同時送出，任一失敗即整個請求失敗，不回傳缺欄位的結果。
pub async fn stock_profile(
    State(state): State<AppState>,
    params: Result<Query<QuoteParams>, QueryRejection>,
) -> Result<Json<StockProfile>, RelayError> {
    let req = quote_request(params, &state)?;

    let (profile, quote) = futures::try_join!(
        company_profile(&state, &req),
        state.provider.get_stock_quotes(&req)
    )?;

    logging::debug_file_async(format!("{} profile: {:?} quote: {:?}", req.symbol, profile, quote));

    Ok(Json(StockProfile { profile, quote }))
}

pub async fn price(
    State(state): State<AppState>,
    params: Result<Query<QuoteParams>, QueryRejection>,
) -> Result<Json<StockPrice>, RelayError> {
    let req = quote_request(params, &state)?;
    let price = state.provider.get_stock_price(&req).await?;

    logging::debug_file_async(format!("{} price: {}", req.symbol, price));

    Ok(Json(StockPrice { price }))
}

async fn company_profile(
    state: &AppState,
    req: &QuoteRequest,
) -> Result<ProfileFragment, RelayError> {
    if let Some(profile) = state.profiles.get(&req.symbol) {
        return Ok(profile);
    }

    let profile = state.provider.get_company_profile(req).await?;
    state.profiles.insert(&req.symbol, profile.clone());

    Ok(profile)
}
