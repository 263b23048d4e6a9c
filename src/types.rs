//! Core types shared by connectors, the aggregator and the status cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known upstream providers. Declaration order is the fixed provider order
/// used by `/v1/sources` and by status snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    /// Code-hosting index (GitHub repository search).
    Github,
    /// Discussion-forum index (Hacker News via Algolia).
    Hackernews,
    /// Syndication feeds (RSS 2.0 / Atom).
    Rss,
}

impl SourceName {
    pub const ALL: [SourceName; 3] = [Self::Github, Self::Hackernews, Self::Rss];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Hackernews => "hackernews",
            Self::Rss => "rss",
        }
    }

    /// Sources searched when a request names none.
    pub fn default_search_set() -> Vec<SourceName> {
        vec![Self::Github, Self::Hackernews]
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source '{0}'")]
pub struct UnknownSource(pub String);

impl FromStr for SourceName {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "hackernews" => Ok(Self::Hackernews),
            "rss" => Ok(Self::Rss),
            _ => Err(UnknownSource(s.to_string())),
        }
    }
}

/// One normalized search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub source: SourceName,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Provider-defined (stars, points); never cross-normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Failure category reported to API consumers as `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    BadStatus,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::BadStatus => "bad_status",
            Self::Unknown => "unknown",
        }
    }
}

/// A single connector's total failure for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source: SourceName,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

/// Merged outcome of one `aggregate` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationResult {
    pub items: Vec<ResultItem>,
    pub errors: Vec<SourceError>,
}

/// Health of one provider as observed by a single refresh pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    pub source: SourceName,
    pub ok: bool,
    #[serde(rename = "last_checked_at")]
    pub checked_at: DateTime<Utc>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}
