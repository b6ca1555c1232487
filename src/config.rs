use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub system: System,
    #[serde(default)]
    pub finnhub: Finnhub,
}

const SYSTEM_HTTP_HOST: &str = "SYSTEM_HTTP_HOST";
const SYSTEM_HTTP_PORT: &str = "SYSTEM_HTTP_PORT";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct System {
    pub http_host: String,
    pub http_port: u16,
}

impl Default for System {
    fn default() -> Self {
        System {
            http_host: "0.0.0.0".to_string(),
            http_port: 4000,
        }
    }
}

const FINNHUB_BASE_URL: &str = "FINNHUB_BASE_URL";
const FINNHUB_TOKEN: &str = "FINNHUB_TOKEN";
const FINNHUB_CONNECT_TIMEOUT_SECS: &str = "FINNHUB_CONNECT_TIMEOUT_SECS";
const FINNHUB_TIMEOUT_SECS: &str = "FINNHUB_TIMEOUT_SECS";
const FINNHUB_PROFILE_CACHE_SECS: &str = "FINNHUB_PROFILE_CACHE_SECS";

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Finnhub {
    pub base_url: String,
    /// 查詢字串未帶 token 時使用
    pub token: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    /// 0 表示不快取公司基本資料
    pub profile_cache_secs: u64,
}

impl Default for Finnhub {
    fn default() -> Self {
        Finnhub {
            base_url: "https://finnhub.io/api/v1".to_string(),
            token: String::new(),
            connect_timeout_secs: 8,
            timeout_secs: 15,
            profile_cache_secs: 3600,
        }
    }
}

// token 不可出現在任何日誌中
impl std::fmt::Debug for Finnhub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finnhub")
            .field("base_url", &self.base_url)
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("profile_cache_secs", &self.profile_cache_secs)
            .finish()
    }
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        logging::error_console(format!(
            "I can't read the config context because {:?}, using defaults",
            why
        ));
        App::default().override_with_env()
    })
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(self) -> Self {
        self.override_with(|key| env::var(key).ok())
    }

    fn override_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup(SYSTEM_HTTP_HOST) {
            self.system.http_host = host;
        }

        if let Some(port) = lookup(SYSTEM_HTTP_PORT) {
            self.system.http_port = parse_or(&port, self.system.http_port);
        }

        if let Some(base_url) = lookup(FINNHUB_BASE_URL) {
            self.finnhub.base_url = base_url;
        }

        if let Some(token) = lookup(FINNHUB_TOKEN) {
            self.finnhub.token = token;
        }

        if let Some(secs) = lookup(FINNHUB_CONNECT_TIMEOUT_SECS) {
            self.finnhub.connect_timeout_secs =
                parse_positive_or(&secs, self.finnhub.connect_timeout_secs);
        }

        if let Some(secs) = lookup(FINNHUB_TIMEOUT_SECS) {
            self.finnhub.timeout_secs = parse_positive_or(&secs, self.finnhub.timeout_secs);
        }

        if let Some(secs) = lookup(FINNHUB_PROFILE_CACHE_SECS) {
            self.finnhub.profile_cache_secs = parse_or(&secs, self.finnhub.profile_cache_secs);
        }

        self.finnhub = self.finnhub.with_valid_timeouts();
        self
    }
}

impl Finnhub {
    /// 逾時為 0 時每個上游請求都會立即失敗，改用預設值
    fn with_valid_timeouts(mut self) -> Self {
        let defaults = Finnhub::default();
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = defaults.connect_timeout_secs;
        }

        if self.timeout_secs == 0 {
            self.timeout_secs = defaults.timeout_secs;
        }

        self
    }
}

fn parse_or<T: FromStr>(text: &str, fallback: T) -> T {
    T::from_str(text.trim()).unwrap_or(fallback)
}

fn parse_positive_or(text: &str, fallback: u64) -> u64 {
    match parse_or(text, 0) {
        0 => fallback,
        secs => secs,
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let app = App::default();
        assert_eq!(app.system.http_port, 4000);
        assert_eq!(app.system.http_host, "0.0.0.0");
        assert_eq!(app.finnhub.base_url, "https://finnhub.io/api/v1");
        assert!(app.finnhub.token.is_empty());
        assert_eq!(app.finnhub.timeout_secs, 15);
        assert_eq!(app.finnhub.profile_cache_secs, 3600);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let app: App =
            serde_json::from_str(r#"{"finnhub":{"token":"abc","timeout_secs":3}}"#).unwrap();
        assert_eq!(app.finnhub.token, "abc");
        assert_eq!(app.finnhub.timeout_secs, 3);
        assert_eq!(app.finnhub.connect_timeout_secs, 8);
        assert_eq!(app.system.http_port, 4000);
    }

    #[test]
    fn test_override_with_env() {
        let vars = HashMap::from([
            (SYSTEM_HTTP_PORT, "8080"),
            (FINNHUB_TOKEN, "secret"),
            (FINNHUB_TIMEOUT_SECS, "not a number"),
            (FINNHUB_PROFILE_CACHE_SECS, " 0 "),
        ]);
        let app = App::default().override_with(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(app.system.http_port, 8080);
        assert_eq!(app.finnhub.token, "secret");
        assert_eq!(app.finnhub.timeout_secs, 15);
        assert_eq!(app.finnhub.profile_cache_secs, 0);
    }

    #[test]
    fn test_zero_timeouts_keep_defaults() {
        let vars = HashMap::from([
            (FINNHUB_TIMEOUT_SECS, "0"),
            (FINNHUB_CONNECT_TIMEOUT_SECS, "3"),
        ]);
        let app = App::default().override_with(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(app.finnhub.timeout_secs, 15);
        assert_eq!(app.finnhub.connect_timeout_secs, 3);

        let file: App =
            serde_json::from_str(r#"{"finnhub":{"connect_timeout_secs":0,"timeout_secs":0}}"#)
                .unwrap();
        let app = file.override_with(|_| None);
        assert_eq!(app.finnhub.connect_timeout_secs, 8);
        assert_eq!(app.finnhub.timeout_secs, 15);
    }

    #[test]
    fn test_debug_hides_token() {
        let finnhub = Finnhub {
            token: "d3tmr19r01qigeg3u1hg".to_string(),
            ..Default::default()
        };
        let text = format!("{:?}", finnhub);
        assert!(!text.contains("d3tmr19r01qigeg3u1hg"));
        assert!(text.contains("***"));
    }
}
