//! Serve command implementation

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use paylio_core::PlaidSource;
use paylio_server::ServerConfig;

/// Environment variable holding comma-separated bearer API keys
const API_KEYS_ENV: &str = "PAYLIO_API_KEYS";

pub async fn cmd_serve(api_base: &str, host: &str, port: u16, no_auth: bool) -> Result<()> {
    let api_keys: Vec<String> = std::env::var(API_KEYS_ENV)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();

    if !no_auth && api_keys.is_empty() {
        anyhow::bail!(
            "No API keys configured. Set {} or pass --no-auth for local development.",
            API_KEYS_ENV
        );
    }

    let config = ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
    };

    let source = Arc::new(PlaidSource::new(api_base));
    info!("Transaction source: {}", source.base_url());

    paylio_server::serve(source, host, port, config).await
}
