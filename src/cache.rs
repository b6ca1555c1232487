//! 公司基本資料快取。
//!
//! 公司名稱、ticker 與市值變動很慢，成功取得後保留一段時間，
//! 減少對上游的請求次數。報價永遠不快取。

use std::time::Duration;

use moka::sync::Cache;

use crate::declare::ProfileFragment;

const MAX_CAPACITY: u64 = 10_000;

/// TTL cache of company profiles keyed by upper-cased symbol.
///
/// A zero TTL disables the cache: `get` always misses and `insert` is a no-op.
#[derive(Clone)]
pub struct ProfileCache {
    inner: Option<Cache<String, ProfileFragment>>,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        if ttl.is_zero() {
            return Self::disabled();
        }

        ProfileCache {
            inner: Some(
                Cache::builder()
                    .max_capacity(MAX_CAPACITY)
                    .time_to_live(ttl)
                    .build(),
            ),
        }
    }

    pub fn disabled() -> Self {
        ProfileCache { inner: None }
    }

    pub fn get(&self, symbol: &str) -> Option<ProfileFragment> {
        self.inner.as_ref()?.get(&key(symbol))
    }

    pub fn insert(&self, symbol: &str, profile: ProfileFragment) {
        if let Some(cache) = self.inner.as_ref() {
            cache.insert(key(symbol), profile);
        }
    }
}

fn key(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
