// tests/common/mod.rs
//
// Shared helpers: wiremock upstreams and a router wired to them.

#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt as _;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use api_fusion::{router, AppState, Settings};

const BODY_LIMIT: usize = 1024 * 1024;

/// Settings pointing every provider (and every probe) at local mock servers.
pub fn settings_for(github: &MockServer, hn: &MockServer, feeds: Vec<String>) -> Settings {
    Settings {
        http_timeout: Duration::from_millis(300),
        probe_timeout: Duration::from_millis(300),
        github_api_url: github.uri(),
        hn_search_url: hn.uri(),
        github_probe_url: Some(format!("{}/rate_limit", github.uri())),
        hn_probe_url: Some(format!("{}/v0/topstories.json", hn.uri())),
        rss_feeds: feeds,
        ..Settings::default()
    }
}

pub fn app(settings: Settings) -> (Router, AppState) {
    let state = AppState::from_settings(settings);
    (router(state.clone()), state)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, headers, v)
}

pub async fn mount_github(server: &MockServer) {
    let body = json!({
        "items": [
            {
                "full_name": "rust-lang/rust",
                "html_url": "https://github.com/rust-lang/rust",
                "description": "Empowering everyone to build reliable software.",
                "stargazers_count": 98000,
                "pushed_at": "2025-01-02T03:04:05Z"
            },
            {
                "full_name": "tokio-rs/tokio",
                "html_url": "https://github.com/tokio-rs/tokio",
                "description": "A runtime for writing reliable asynchronous applications",
                "stargazers_count": 27000,
                "pushed_at": "2025-01-01T00:00:00Z"
            },
            {
                "full_name": "no/url",
                "stargazers_count": 1
            },
            {
                "full_name": "small/crate",
                "html_url": "https://github.com/small/crate",
                "description": "",
                "stargazers_count": 12,
                "pushed_at": "2024-06-01T00:00:00Z"
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_hn(server: &MockServer) {
    let body = json!({
        "hits": [
            {
                "title": "Why Rust in production",
                "url": "https://example.com/rust-prod",
                "points": 450,
                "created_at": "2025-01-03T00:00:00Z"
            },
            {
                "story_title": "Ask HN: learning Rust",
                "story_url": "https://news.ycombinator.com/item?id=1",
                "story_text": "Where to start?",
                "points": 27000,
                "created_at": "2025-01-04T00:00:00Z"
            },
            {
                "title": "No link at all",
                "points": 99999
            },
            {
                "title": "Rust 2024 edition",
                "url": "https://example.com/edition",
                "created_at": "2025-01-05T00:00:00Z"
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub const RSS_BODY: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
  <item><title>Rust news</title><link>https://feed.example/1</link>
    <description><![CDATA[<p>All about <b>rust</b></p>]]></description>
    <pubDate>Tue, 10 Jun 2025 04:00:00 +0000</pubDate></item>
  <item><title>Go news</title><link>https://feed.example/2</link></item>
</channel></rss>"#;

pub async fn mount_probe_ok(server: &MockServer, p: &str) {
    Mock::given(method("GET"))
        .and(path(p.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(server)
        .await;
}
