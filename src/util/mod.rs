use std::sync::Once;

pub mod http;

static RUSTLS_PROVIDER: Once = Once::new();

/// reqwest 使用 rustls-no-provider，建立 Client 前須先安裝 crypto provider
pub fn ensure_rustls_crypto_provider() {
    RUSTLS_PROVIDER.call_once(|| {
        // 其他元件可能已先安裝，失敗代表已存在
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
