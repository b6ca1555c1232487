use async_trait::async_trait;

use crate::{
    declare::{PriceFragment, ProfileFragment, QuoteRequest},
    error::RelayError,
};

/// Finnhub 美股報價與公司資料
pub mod finnhub;

/// A quote provider the relay forwards requests to.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// 公司名稱、ticker 與市值
    async fn get_company_profile(
        &self,
        req: &QuoteRequest,
    ) -> Result<ProfileFragment, RelayError>;

    /// 目前的成交價
    ///
    /// 只需要 `c`。Finnhub 對未知代碼回 `c: 0` 與 null 的 `d`/`dp`，此時回傳 0，
    /// 而 [`get_stock_quotes`](QuoteProvider::get_stock_quotes) 會失敗。
    async fn get_stock_price(&self, req: &QuoteRequest) -> Result<f64, RelayError>;

    /// 目前的報價含漲跌、漲幅
    async fn get_stock_quotes(&self, req: &QuoteRequest) -> Result<PriceFragment, RelayError>;
}
