use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{Method, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;

use crate::{
    cache::ProfileCache,
    config::SETTINGS,
    logging,
    upstream::{finnhub::Finnhub, QuoteProvider},
};

pub mod handler;

/// Shared by every request; holds no per-request state.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn QuoteProvider>,
    /// 查詢字串未帶 token 時使用，可為空
    pub default_token: Arc<str>,
    pub profiles: ProfileCache,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        default_token: &str,
        profiles: ProfileCache,
    ) -> Self {
        AppState {
            provider,
            default_token: Arc::from(default_token),
            profiles,
        }
    }

    fn from_settings() -> Result<Self> {
        let finnhub = Finnhub::from_settings(&SETTINGS.finnhub)?;
        Ok(AppState::new(
            Arc::new(finnhub),
            &SETTINGS.finnhub.token,
            ProfileCache::new(Duration::from_secs(SETTINGS.finnhub.profile_cache_secs)),
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handler::index))
        .route("/health", get(handler::health))
        .route("/stock-profile", get(handler::stock_profile))
        .route("/price", get(handler::price))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// 啟動 HTTP 服務，直到收到停止訊號
pub async fn start() -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", SETTINGS.system.http_host, SETTINGS.system.http_port)
        .parse()
        .context("Invalid http listen address")?;
    let state = AppState::from_settings()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    logging::info_file_async(format!("HTTP 服務正在 {:?} 開始服務...", addr));
    logging::info_console(format!("app is listening to {}", addr));

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match &result {
        Ok(_) => logging::info_file_async(format!("HTTP 服務在 {:?} 正常停止", addr)),
        Err(why) => logging::error_file_async(format!("HTTP 服務運行中斷 ({:?}): {}", addr, why)),
    }

    Ok(result?)
}

/// Logs method, path, status and elapsed time. The query string is left out
/// because it may carry the caller's token.
async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    let line = request_log_line(&method, &uri, status, start.elapsed().as_millis());

    if status.is_success() {
        logging::info_file_async(line);
    } else {
        logging::warn_file_async(line);
    }

    response
}

fn request_log_line(method: &Method, uri: &Uri, status: StatusCode, elapsed: u128) -> String {
    format!("{} {} {} {} ms", method, uri.path(), status, elapsed)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(why) = tokio::signal::ctrl_c().await {
            logging::error_file_async(format!("Failed to listen for ctrl_c because {:?}", why));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to listen for SIGTERM because {:?}",
                    why
                ));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    logging::info_file_async("收到停止訊號，關閉 HTTP 服務".to_string());
}
