// src/connectors/mod.rs
//! Provider connectors: one implementation per [`SourceName`], resolved once at
//! startup into a [`ConnectorRegistry`].

pub mod github;
pub mod hackernews;
pub mod rss;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::config::Settings;
use crate::error::ConnectorError;
use crate::types::{ResultItem, SourceName};

pub use github::GithubConnector;
pub use hackernews::HackerNewsConnector;
pub use rss::RssConnector;

/// Upstream page size ceiling, regardless of what the caller asks for.
pub const MAX_PAGE_SIZE: usize = 50;

/// Search capability of a single provider.
///
/// A call either yields at most `limit` items tagged with [`Connector::source`],
/// or exactly one error. Partial results are never returned alongside an error.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn fetch(
        &self,
        client: &reqwest::Client,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ResultItem>, ConnectorError>;

    fn source(&self) -> SourceName;
}

pub type DynConnector = Arc<dyn Connector>;

/// Fixed mapping from provider to connector.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    inner: BTreeMap<SourceName, DynConnector>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All three providers wired from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .with(Arc::new(GithubConnector::new(
                &settings.github_api_url,
                settings.github_token.clone(),
            )))
            .with(Arc::new(HackerNewsConnector::new(&settings.hn_search_url)))
            .with(Arc::new(RssConnector::new(settings.rss_feeds.clone())))
    }

    /// Register (or replace) the connector for its own source.
    pub fn with(mut self, connector: DynConnector) -> Self {
        self.inner.insert(connector.source(), connector);
        self
    }

    pub fn get(&self, source: SourceName) -> Option<&DynConnector> {
        self.inner.get(&source)
    }

    pub fn sources(&self) -> impl Iterator<Item = SourceName> + '_ {
        self.inner.keys().copied()
    }
}

/// GET + status check + JSON decode, with errors classified for the aggregator.
pub(crate) async fn get_json<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
) -> Result<T, ConnectorError> {
    let resp = req.send().await?.error_for_status()?;
    Ok(resp.json::<T>().await?)
}

pub(crate) fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn page_size(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}
