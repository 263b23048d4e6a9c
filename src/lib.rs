// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod connectors;
pub mod error;
pub mod http;
pub mod metrics;
pub mod probe;
pub mod request_log;
pub mod status;
pub mod text;
pub mod types;

// Router entrypoint is reachable as both `api_fusion::api::router` and `api_fusion::router`.
pub use crate::api::{router, AppState};
pub use crate::config::Settings;

use anyhow::Context;

/// Build the full application router from process environment.
///
/// Call after `.env` is loaded and tracing is initialized.
pub fn app_from_env() -> anyhow::Result<axum::Router> {
    let settings = Settings::from_env().context("loading settings from environment")?;
    tracing::info!(
        app = %settings.app_name,
        env = %settings.environment,
        feeds = settings.rss_feeds.len(),
        github_auth = settings.github_token.is_some(),
        status_ttl_ms = settings.status_ttl.as_millis() as u64,
        "settings loaded"
    );
    Ok(router(AppState::from_settings(settings)))
}
