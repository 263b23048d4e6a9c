// src/connectors/rss.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use super::{parse_rfc3339, Connector};
use crate::error::ConnectorError;
use crate::text::{contains_ci, normalize_text, scrub_html_entities_for_xml, SNIPPET_MAX_CHARS};
use crate::types::{ResultItem, SourceName};

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct Atom {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<TextNode>,
    #[serde(default)]
    link: Vec<AtomLink>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Format-independent view of one feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let dt = OffsetDateTime::parse(ts.trim(), &Rfc2822).ok()?;
    DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
}

fn clean(s: Option<String>) -> Option<String> {
    s.map(|v| normalize_text(&v, SNIPPET_MAX_CHARS))
        .filter(|v| !v.is_empty())
}

/// Local name of the document element, skipping the prolog.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

fn parse_rss(xml: &str) -> Result<Vec<FeedEntry>, ConnectorError> {
    let rss: Rss = from_str(xml)?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| FeedEntry {
            title: clean(it.title),
            link: it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            summary: clean(it.description),
            published: it.pub_date.as_deref().and_then(parse_rfc2822),
        })
        .collect())
}

fn parse_atom(xml: &str) -> Result<Vec<FeedEntry>, ConnectorError> {
    let atom: Atom = from_str(xml)?;
    Ok(atom
        .entry
        .into_iter()
        .map(|e| {
            let link = e
                .link
                .iter()
                .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                .or_else(|| e.link.first())
                .and_then(|l| l.href.clone())
                .filter(|h| !h.is_empty());
            let summary = e.summary.or(e.content).map(|n| n.value);
            let published = e
                .published
                .or(e.updated)
                .as_deref()
                .and_then(parse_rfc3339);
            FeedEntry {
                title: clean(e.title.map(|n| n.value)),
                link,
                summary: clean(summary),
                published,
            }
        })
        .collect())
}

/// Parse an RSS 2.0 or Atom document into entries, in document order.
///
/// The root element picks the format: `<feed>` is Atom, anything else must
/// parse as RSS 2.0.
pub fn parse_feed(body: &str) -> Result<Vec<FeedEntry>, ConnectorError> {
    let xml = scrub_html_entities_for_xml(body);
    match root_element(&xml).as_deref() {
        Some("feed") => parse_atom(&xml),
        _ => parse_rss(&xml),
    }
}

/// Keyword search over a fixed list of syndication feeds.
///
/// Feeds are fetched one after another in configured order; the walk stops as
/// soon as `limit` matching entries have been collected.
pub struct RssConnector {
    feeds: Vec<String>,
}

impl RssConnector {
    pub fn new(feeds: Vec<String>) -> Self {
        Self { feeds }
    }
}

#[async_trait]
impl Connector for RssConnector {
    async fn fetch(
        &self,
        client: &reqwest::Client,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ResultItem>, ConnectorError> {
        let needle = query.to_lowercase();
        let mut items = Vec::new();

        for feed_url in &self.feeds {
            let body = client
                .get(feed_url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;

            for entry in parse_feed(&body)? {
                let (Some(title), Some(url)) = (entry.title, entry.link) else {
                    continue;
                };
                if !(contains_ci(Some(&title), &needle)
                    || contains_ci(entry.summary.as_deref(), &needle))
                {
                    continue;
                }

                items.push(ResultItem {
                    source: SourceName::Rss,
                    title,
                    url,
                    snippet: entry.summary,
                    score: None,
                    timestamp: entry.published,
                });

                if items.len() >= limit {
                    return Ok(items);
                }
            }
        }

        Ok(items)
    }

    fn source(&self) -> SourceName {
        SourceName::Rss
    }
}
