// src/config/feeds.rs
//! Feed list resolution for the RSS connector.
//!
//! Lookup order: `$RSS_FEEDS_PATH`, then `config/feeds.toml`, then
//! `config/feeds.json`, then `$RSS_FEEDS_CSV`, then the built-in feed.
//! Entries must be absolute http(s) URLs; anything else is dropped with a warning.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::DEFAULT_RSS_FEED;

pub const ENV_PATH: &str = "RSS_FEEDS_PATH";
pub const ENV_CSV: &str = "RSS_FEEDS_CSV";

const CANDIDATE_FILES: [&str; 2] = ["config/feeds.toml", "config/feeds.json"];

/// Where the active feed list came from; logged once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOrigin {
    File(PathBuf),
    Csv,
    BuiltIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedList {
    pub urls: Vec<String>,
    pub origin: FeedOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

#[derive(serde::Deserialize)]
struct FeedsFile {
    feeds: Vec<String>,
}

fn from_toml(body: &str) -> Result<Vec<String>> {
    Ok(toml::from_str::<FeedsFile>(body)?.feeds)
}

fn from_json(body: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str::<Vec<String>>(body)?)
}

/// Read a TOML (`feeds = [...]`) or JSON (`[...]`) feed file.
///
/// Without a recognizable extension JSON is tried first, then TOML.
pub fn load_feeds_from(path: &Path) -> Result<Vec<String>> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("reading feed list from {}", path.display()))?;
    let raw = match Format::from_path(path) {
        Some(Format::Toml) => from_toml(&body),
        Some(Format::Json) => from_json(&body),
        None => from_json(&body).or_else(|_| from_toml(&body)),
    }
    .with_context(|| format!("parsing feed list {}", path.display()))?;
    Ok(keep_valid_urls(raw))
}

/// Resolve the configured feeds. A dangling `$RSS_FEEDS_PATH` is an error.
pub fn resolve_feeds() -> Result<FeedList> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let path = PathBuf::from(p);
        if !path.exists() {
            bail!("{ENV_PATH} points to {}, which does not exist", path.display());
        }
        let urls = load_feeds_from(&path)?;
        return Ok(FeedList {
            urls,
            origin: FeedOrigin::File(path),
        });
    }

    if let Some(path) = CANDIDATE_FILES.iter().map(PathBuf::from).find(|p| p.exists()) {
        let urls = load_feeds_from(&path)?;
        return Ok(FeedList {
            urls,
            origin: FeedOrigin::File(path),
        });
    }

    match std::env::var(ENV_CSV) {
        Ok(csv) => Ok(FeedList {
            urls: keep_valid_urls(split_csv(&csv)),
            origin: FeedOrigin::Csv,
        }),
        Err(_) => Ok(FeedList {
            urls: vec![DEFAULT_RSS_FEED.to_string()],
            origin: FeedOrigin::BuiltIn,
        }),
    }
}

/// Comma-separated list → trimmed, non-empty, first-occurrence-unique entries.
pub fn split_csv(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .map(str::to_string)
        .collect()
}

// Order is preserved: the connector walks feeds in this order.
fn keep_valid_urls(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for entry in raw {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match url::Url::parse(entry) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {
                if seen.insert(entry.to_string()) {
                    out.push(entry.to_string());
                }
            }
            _ => tracing::warn!(feed = entry, "ignoring feed entry that is not an http(s) URL"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn invalid_and_duplicate_entries_are_dropped_in_order() {
        let raw = vec![
            " https://b.example/rss ".to_string(),
            "".to_string(),
            "ftp://files.example/feed".to_string(),
            "not a url".to_string(),
            "https://a.example/atom".to_string(),
            "https://b.example/rss".to_string(),
        ];
        assert_eq!(
            keep_valid_urls(raw),
            vec![
                "https://b.example/rss".to_string(),
                "https://a.example/atom".to_string()
            ]
        );
    }

    #[test]
    fn csv_split_keeps_first_occurrence() {
        assert_eq!(split_csv(" *, a ,,a,b"), vec!["*", "a", "b"]);
    }

    #[test]
    fn file_format_follows_extension_or_content() {
        let tmp = tempfile::tempdir().unwrap();

        let toml_p = tmp.path().join("f.toml");
        fs::write(&toml_p, r#"feeds = ["https://t.example/rss"]"#).unwrap();
        assert_eq!(load_feeds_from(&toml_p).unwrap(), vec!["https://t.example/rss"]);

        let odd_p = tmp.path().join("feeds.list");
        fs::write(&odd_p, r#"["https://j.example/rss"]"#).unwrap();
        assert_eq!(load_feeds_from(&odd_p).unwrap(), vec!["https://j.example/rss"]);

        let bad_p = tmp.path().join("bad.json");
        fs::write(&bad_p, "feeds: nope").unwrap();
        assert!(load_feeds_from(&bad_p).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn resolution_order_env_path_files_csv_builtin() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);
        env::remove_var(ENV_CSV);

        let v = resolve_feeds().unwrap();
        assert_eq!(v.urls, vec![DEFAULT_RSS_FEED.to_string()]);
        assert_eq!(v.origin, FeedOrigin::BuiltIn);

        env::set_var(ENV_CSV, "https://one.example/rss,https://two.example/rss");
        let v = resolve_feeds().unwrap();
        assert_eq!(v.urls.len(), 2);
        assert_eq!(v.origin, FeedOrigin::Csv);

        // config/feeds.json beats CSV; config/feeds.toml beats json
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join("config/feeds.json"),
            r#"["https://json.example/rss"]"#,
        )
        .unwrap();
        assert_eq!(resolve_feeds().unwrap().urls, vec!["https://json.example/rss"]);
        fs::write(
            tmp.path().join("config/feeds.toml"),
            r#"feeds = ["https://toml.example/rss"]"#,
        )
        .unwrap();
        let v = resolve_feeds().unwrap();
        assert_eq!(v.urls, vec!["https://toml.example/rss"]);
        assert_eq!(v.origin, FeedOrigin::File(PathBuf::from("config/feeds.toml")));

        // Explicit path beats everything
        let p_json = tmp.path().join("mine.json");
        fs::write(&p_json, r#"["https://env.example/rss"]"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        assert_eq!(resolve_feeds().unwrap().urls, vec!["https://env.example/rss"]);

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(resolve_feeds().is_err());

        env::remove_var(ENV_PATH);
        env::remove_var(ENV_CSV);
        env::set_current_dir(&old).unwrap();
    }
}
