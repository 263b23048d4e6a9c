// src/connectors/hackernews.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{get_json, page_size, parse_rfc3339, Connector};
use crate::error::ConnectorError;
use crate::types::{ResultItem, SourceName};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    title: Option<String>,
    story_title: Option<String>,
    url: Option<String>,
    story_url: Option<String>,
    story_text: Option<String>,
    points: Option<i64>,
    created_at: Option<String>,
}

/// Hacker News stories through the Algolia search API.
pub struct HackerNewsConnector {
    search_url: String,
}

impl HackerNewsConnector {
    pub fn new(base: &str) -> Self {
        Self {
            search_url: format!("{}/api/v1/search", base.trim_end_matches('/')),
        }
    }
}

fn non_empty(a: Option<String>, b: Option<String>) -> Option<String> {
    a.filter(|s| !s.is_empty())
        .or_else(|| b.filter(|s| !s.is_empty()))
}

#[async_trait]
impl Connector for HackerNewsConnector {
    async fn fetch(
        &self,
        client: &reqwest::Client,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ResultItem>, ConnectorError> {
        let hits_per_page = page_size(limit).to_string();
        let req = client.get(&self.search_url).query(&[
            ("query", query),
            ("tags", "story"),
            ("hitsPerPage", hits_per_page.as_str()),
        ]);

        let body: SearchResponse = get_json(req).await?;

        let items = body
            .hits
            .into_iter()
            .filter_map(|hit| {
                let title = non_empty(hit.title, hit.story_title)?;
                let url = non_empty(hit.url, hit.story_url)?;
                Some(ResultItem {
                    source: SourceName::Hackernews,
                    title,
                    url,
                    snippet: hit.story_text.filter(|s| !s.is_empty()),
                    score: hit.points,
                    timestamp: hit.created_at.as_deref().and_then(parse_rfc3339),
                })
            })
            .take(limit)
            .collect();

        Ok(items)
    }

    fn source(&self) -> SourceName {
        SourceName::Hackernews
    }
}
