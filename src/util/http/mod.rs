use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use crate::{logging::Logger, util};

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// HTTP 請求連線失敗時的最大嘗試次數。
const MAX_RETRIES: u32 = 2;

/// Query parameters whose values never reach a log line or an error message.
const SECRET_PARAMS: [&str; 2] = ["token", "apikey"];

/// Longest slice of an upstream body quoted back in an error message.
const BODY_EXCERPT_LEN: usize = 200;

/// A non-2xx reply from an upstream server.
#[derive(Error, Debug)]
#[error("upstream returned {status}: {message}")]
pub struct StatusError {
    pub status: StatusCode,
    pub message: String,
}

/// Error document some providers send along with a failure status.
#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

/// Builds a reqwest client with rustls, compression and the given timeouts.
///
/// `timeout` bounds the whole exchange (connect, headers and body), so an
/// upstream that never answers surfaces as a timeout error.
pub fn build_client(connect_timeout: Duration, timeout: Duration) -> Result<Client> {
    util::ensure_rustls_crypto_provider();

    Client::builder()
        // ===== 壓縮 =====
        .brotli(true)
        .gzip(true)
        .zstd(true)
        // ===== 超時設置 =====
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        // ===== TCP =====
        .tcp_nodelay(true)
        .tcp_keepalive(Duration::from_secs(60))
        // ===== 連接池 =====
        .pool_max_idle_per_host(20)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
}

/// Performs an HTTP GET request and deserializes the JSON response into `RES`.
///
/// # Errors
///
/// * transport failures (the reqwest error stays in the chain, so
///   `is_timeout()` can still be inspected by callers),
/// * a [`StatusError`] for any non-2xx status,
/// * a parse error quoting the start of the body when it is not valid `RES`.
pub async fn get_json<RES: DeserializeOwned>(client: &Client, url: &Url) -> Result<RES> {
    let response = send(client, Method::GET, url).await?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|why| why.without_url())
        .context("Error reading response body")?;

    if !status.is_success() {
        return Err(status_error(status, &body).into());
    }

    serde_json::from_str(&body)
        .with_context(|| format!("Error parsing response JSON({})", excerpt(&body)))
}

/// Sends a request, retrying only when the connection was refused or reset.
///
/// Timeouts (a connect timeout included) and HTTP error statuses are
/// returned to the caller as is.
async fn send(client: &Client, method: Method, url: &Url) -> Result<Response> {
    let visit_log = format!("{}:{}", method, redact_url(url));
    let mut attempt = 1;

    loop {
        let start = Instant::now();
        let res = client.request(method.clone(), url.clone()).send().await;
        let elapsed = start.elapsed().as_millis();

        match res {
            Ok(response) => {
                LOGGER.info(format!(
                    "Attempt {} to send {} {} {} ms",
                    attempt,
                    visit_log,
                    response.status(),
                    elapsed
                ));
                return Ok(response);
            }
            Err(why) => {
                let why = why.without_url();
                LOGGER.error(format!(
                    "Attempt {} to send {} failed because {:?}. {} ms",
                    attempt, visit_log, why, elapsed
                ));

                if is_retryable(&why) && attempt < MAX_RETRIES {
                    tokio::time::sleep(retry_delay(attempt)).await;
                    attempt += 1;
                    continue;
                }

                return Err(
                    anyhow::Error::new(why).context(format!("Failed to send {}", visit_log))
                );
            }
        }
    }
}

// reqwest 連線逾時同時是 is_connect 與 is_timeout，逾時不重試
fn is_retryable(why: &reqwest::Error) -> bool {
    why.is_connect() && !why.is_timeout()
}

/// 第 n 次失敗後的等待時間
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(250 * 2u64.pow(attempt))
}

/// Returns `url` as text with the values of secret query parameters masked.
pub fn redact_url(url: &Url) -> String {
    if !url.query_pairs().any(|(key, _)| is_secret(&key)) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if is_secret(&key) {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

fn is_secret(key: &str) -> bool {
    SECRET_PARAMS.iter().any(|secret| key.eq_ignore_ascii_case(secret))
}

fn status_error(status: StatusCode, body: &str) -> StatusError {
    let message = match serde_json::from_str::<ErrorReply>(body) {
        Ok(reply) => reply.error,
        Err(_) if !body.trim().is_empty() => excerpt(body.trim()).to_string(),
        Err(_) => status.canonical_reason().unwrap_or("no reason").to_string(),
    };

    StatusError { status, message }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
