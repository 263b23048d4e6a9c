// src/config/mod.rs
//! Runtime settings resolved from the environment (after `.env` is loaded).

pub mod feeds;

use std::time::Duration;

use anyhow::Result;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_HN_SEARCH_URL: &str = "https://hn.algolia.com";
pub const DEFAULT_HN_PROBE_URL: &str = "https://hacker-news.firebaseio.com/v0/topstories.json";
pub const DEFAULT_RSS_FEED: &str = "https://hnrss.org/newest";
pub const DEFAULT_STATUS_TTL_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub environment: String,
    /// Per-request budget for connector calls (connect + body).
    pub http_timeout: Duration,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub hn_search_url: String,
    pub rss_feeds: Vec<String>,
    pub status_ttl: Duration,
    pub probe_timeout: Duration,
    /// Probe targets; `None` means derive from the provider defaults.
    pub github_probe_url: Option<String>,
    pub hn_probe_url: Option<String>,
    pub request_log_capacity: usize,
    /// `["*"]` means permissive CORS.
    pub cors_allow_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "API Fusion".to_string(),
            environment: "local".to_string(),
            http_timeout: Duration::from_secs(3),
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            hn_search_url: DEFAULT_HN_SEARCH_URL.to_string(),
            rss_feeds: vec![DEFAULT_RSS_FEED.to_string()],
            status_ttl: Duration::from_secs(DEFAULT_STATUS_TTL_SECS),
            probe_timeout: Duration::from_secs(3),
            github_probe_url: None,
            hn_probe_url: None,
            request_log_capacity: 2000,
            cors_allow_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Settings {
    /// Build settings from process env. Only feed-file problems are fatal;
    /// malformed numbers fall back to defaults with a warning.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();

        let feed_list = feeds::resolve_feeds()?;
        tracing::debug!(origin = ?feed_list.origin, count = feed_list.urls.len(), "rss feeds resolved");

        Ok(Self {
            app_name: env_string("APP_NAME").unwrap_or(d.app_name),
            environment: env_string("ENVIRONMENT").unwrap_or(d.environment),
            http_timeout: env_secs("HTTP_TIMEOUT_SECONDS").unwrap_or(d.http_timeout),
            github_token: env_string("GITHUB_TOKEN"),
            github_api_url: env_string("GITHUB_API_URL").unwrap_or(d.github_api_url),
            hn_search_url: env_string("HN_SEARCH_URL").unwrap_or(d.hn_search_url),
            rss_feeds: feed_list.urls,
            status_ttl: env_secs("STATUS_TTL_SECONDS").unwrap_or(d.status_ttl),
            probe_timeout: env_secs("PROBE_TIMEOUT_SECONDS").unwrap_or(d.probe_timeout),
            github_probe_url: env_string("GITHUB_PROBE_URL"),
            hn_probe_url: env_string("HN_PROBE_URL"),
            request_log_capacity: env_parse::<usize>("REQUEST_LOG_CAPACITY")
                .filter(|n| *n > 0)
                .unwrap_or(d.request_log_capacity),
            cors_allow_origins: env_string("CORS_ALLOW_ORIGINS")
                .map(|raw| feeds::split_csv(&raw))
                .filter(|v| !v.is_empty())
                .unwrap_or(d.cors_allow_origins),
        })
    }

    pub fn github_probe_target(&self) -> String {
        self.github_probe_url.clone().unwrap_or_else(|| {
            format!("{}/rate_limit", self.github_api_url.trim_end_matches('/'))
        })
    }

    pub fn hn_probe_target(&self) -> String {
        self.hn_probe_url
            .clone()
            .unwrap_or_else(|| DEFAULT_HN_PROBE_URL.to_string())
    }

    /// First configured feed, or the built-in default when none are configured.
    pub fn rss_probe_target(&self) -> String {
        self.rss_feeds
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_RSS_FEED.to_string())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "invalid numeric env value, using default");
            None
        }
    }
}

// Fractional seconds, e.g. "2.5".
fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<f64>(key)
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn from_env_reads_overrides_and_falls_back() {
        // Keep a stray ./config/feeds.* from shadowing RSS_FEEDS_CSV.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var("RSS_FEEDS_PATH");
        env::set_var("APP_NAME", "Fusion Test");
        env::set_var("HTTP_TIMEOUT_SECONDS", "1.5");
        env::set_var("STATUS_TTL_SECONDS", "not-a-number");
        env::set_var("RSS_FEEDS_CSV", "https://a.example/feed, ,https://b.example/rss");
        env::set_var("CORS_ALLOW_ORIGINS", "*");

        let s = Settings::from_env().unwrap();
        assert_eq!(s.app_name, "Fusion Test");
        assert_eq!(s.http_timeout, Duration::from_millis(1500));
        assert_eq!(s.status_ttl, Duration::from_secs(DEFAULT_STATUS_TTL_SECS));
        assert_eq!(s.rss_feeds.len(), 2);
        assert_eq!(s.rss_probe_target(), "https://a.example/feed");
        assert_eq!(s.cors_allow_origins, vec!["*".to_string()]);

        for k in [
            "APP_NAME",
            "HTTP_TIMEOUT_SECONDS",
            "STATUS_TTL_SECONDS",
            "RSS_FEEDS_CSV",
            "CORS_ALLOW_ORIGINS",
        ] {
            env::remove_var(k);
        }
        env::set_current_dir(&old).unwrap();
    }

    #[test]
    fn probe_targets_derive_from_base_urls() {
        let s = Settings {
            github_api_url: "http://127.0.0.1:9999/".into(),
            ..Settings::default()
        };
        assert_eq!(s.github_probe_target(), "http://127.0.0.1:9999/rate_limit");
        assert_eq!(s.hn_probe_target(), DEFAULT_HN_PROBE_URL);

        let empty = Settings {
            rss_feeds: vec![],
            ..Settings::default()
        };
        assert_eq!(empty.rss_probe_target(), DEFAULT_RSS_FEED);
    }
}
