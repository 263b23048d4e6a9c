// src/connectors/github.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{get_json, page_size, parse_rfc3339, Connector};
use crate::error::ConnectorError;
use crate::types::{ResultItem, SourceName};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    full_name: Option<String>,
    html_url: Option<String>,
    description: Option<String>,
    stargazers_count: Option<i64>,
    pushed_at: Option<String>,
}

/// Repository search, ranked by stars.
pub struct GithubConnector {
    search_url: String,
    token: Option<String>,
}

impl GithubConnector {
    pub fn new(api_base: &str, token: Option<String>) -> Self {
        Self {
            search_url: format!("{}/search/repositories", api_base.trim_end_matches('/')),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl Connector for GithubConnector {
    async fn fetch(
        &self,
        client: &reqwest::Client,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ResultItem>, ConnectorError> {
        let per_page = page_size(limit).to_string();
        let mut req = client
            .get(&self.search_url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let body: SearchResponse = get_json(req).await?;

        let items = body
            .items
            .into_iter()
            .filter_map(|repo| {
                let (title, url) = match (repo.full_name, repo.html_url) {
                    (Some(t), Some(u)) if !t.is_empty() && !u.is_empty() => (t, u),
                    _ => return None,
                };
                Some(ResultItem {
                    source: SourceName::Github,
                    title,
                    url,
                    snippet: repo.description.filter(|d| !d.is_empty()),
                    score: repo.stargazers_count,
                    timestamp: repo.pushed_at.as_deref().and_then(parse_rfc3339),
                })
            })
            .take(limit)
            .collect();

        Ok(items)
    }

    fn source(&self) -> SourceName {
        SourceName::Github
    }
}
