//! Bounded in-memory log of search requests.
//!
//! Writing is a best-effort step after the response is built: a failing sink is
//! reported and counted, never surfaced to the caller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::types::{SourceError, SourceName};

/// Immutable summary handed to the sink after a search completes.
#[derive(Debug, Clone)]
pub struct SearchSummary {
    pub request_id: String,
    pub path: String,
    pub q: String,
    pub sources: Vec<SourceName>,
    pub limit: usize,
    pub took_ms: u64,
    pub items_count: usize,
    pub errors: Vec<SourceError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: u64,
    pub ts: DateTime<Utc>,
    pub request_id: String,
    pub path: String,
    pub q: String,
    pub sources: Vec<SourceName>,
    pub limit: usize,
    pub took_ms: u64,
    pub items_count: usize,
    pub errors_count: usize,
    pub errors: Vec<SourceError>,
}

/// Destination for search summaries; `/v1/logs` reads back through `recent`.
pub trait RequestLogSink: Send + Sync {
    fn write(&self, summary: SearchSummary) -> Result<()>;

    /// Up to `n` entries, newest first.
    fn recent(&self, n: usize) -> Vec<LogEntry>;
}

pub type DynRequestLog = Arc<dyn RequestLogSink>;

/// Hand `summary` to `sink`, swallowing and reporting any failure.
pub fn record_best_effort(sink: &dyn RequestLogSink, summary: SearchSummary) {
    let request_id = summary.request_id.clone();
    if let Err(e) = sink.write(summary) {
        counter!("request_log_failures_total").increment(1);
        tracing::warn!(error = %e, %request_id, "request log write failed");
    }
}

#[derive(Debug)]
struct Inner {
    rows: VecDeque<LogEntry>,
    next_id: u64,
}

/// Ring buffer keeping the newest `cap` entries.
#[derive(Debug)]
pub struct InMemoryRequestLog {
    inner: Mutex<Inner>,
    cap: usize,
}

impl InMemoryRequestLog {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 100_000);
        Self {
            inner: Mutex::new(Inner {
                rows: VecDeque::with_capacity(cap.min(10_000)),
                next_id: 1,
            }),
            cap,
        }
    }
}

impl RequestLogSink for InMemoryRequestLog {
    fn write(&self, s: SearchSummary) -> Result<()> {
        let mut g = self
            .inner
            .lock()
            .map_err(|_| anyhow!("request log mutex poisoned"))?;
        let id = g.next_id;
        g.next_id += 1;
        g.rows.push_back(LogEntry {
            id,
            ts: Utc::now(),
            request_id: s.request_id,
            path: s.path,
            q: s.q,
            sources: s.sources,
            limit: s.limit,
            took_ms: s.took_ms,
            items_count: s.items_count,
            errors_count: s.errors.len(),
            errors: s.errors,
        });
        while g.rows.len() > self.cap {
            g.rows.pop_front();
        }
        Ok(())
    }

    fn recent(&self, n: usize) -> Vec<LogEntry> {
        let g = match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        g.rows.iter().rev().take(n).cloned().collect()
    }
}
