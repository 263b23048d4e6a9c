//! Upstream reachability probes.
//!
//! A probe never fails: transport errors and bad statuses are reported as data
//! so the status cache can fan in all probes without per-probe error handling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::Settings;
use crate::http::make_probe_client;
use crate::types::SourceName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub ok: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// One bounded GET with redirect-following. 200..=399 counts as healthy.
pub async fn probe_http_get(url: &str, timeout: Duration) -> ProbeResult {
    let start = Instant::now();
    let elapsed_ms = |start: Instant| start.elapsed().as_millis() as u64;

    let client = match make_probe_client(timeout) {
        Ok(c) => c,
        Err(e) => {
            return ProbeResult {
                ok: false,
                latency_ms: elapsed_ms(start),
                error: Some(e.to_string()),
            }
        }
    };

    match client.get(url).send().await {
        Ok(resp) => {
            let latency_ms = elapsed_ms(start);
            let code = resp.status().as_u16();
            if (200..400).contains(&code) {
                ProbeResult {
                    ok: true,
                    latency_ms,
                    error: None,
                }
            } else {
                ProbeResult {
                    ok: false,
                    latency_ms,
                    error: Some(format!("http_status:{code}")),
                }
            }
        }
        Err(e) => ProbeResult {
            ok: false,
            latency_ms: elapsed_ms(start),
            error: Some(describe_transport_error(&e)),
        },
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {e}")
    } else if e.is_connect() {
        format!("connect: {e}")
    } else {
        e.to_string()
    }
}

/// Health check for one provider.
#[async_trait]
pub trait Probe: Send + Sync {
    fn source(&self) -> SourceName;
    async fn check(&self) -> ProbeResult;
}

pub type DynProbe = Arc<dyn Probe>;

/// [`probe_http_get`] against a fixed endpoint.
pub struct HttpProbe {
    source: SourceName,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(source: SourceName, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            source,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn source(&self) -> SourceName {
        self.source
    }

    async fn check(&self) -> ProbeResult {
        probe_http_get(&self.url, self.timeout).await
    }
}

/// One probe per known provider, in fixed provider order.
pub fn default_probes(settings: &Settings) -> Vec<DynProbe> {
    SourceName::ALL
        .iter()
        .map(|s| {
            let url = match s {
                SourceName::Github => settings.github_probe_target(),
                SourceName::Hackernews => settings.hn_probe_target(),
                SourceName::Rss => settings.rss_probe_target(),
            };
            Arc::new(HttpProbe::new(*s, url, settings.probe_timeout)) as DynProbe
        })
        .collect()
}
