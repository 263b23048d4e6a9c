//! Concurrent fan-out search with per-source failure isolation.
//!
//! One `aggregate` call builds its own HTTP client, starts every requested
//! connector at once, waits for all of them, and merges the survivors into a
//! single ranked list. A failing connector contributes one [`SourceError`] and
//! no items; it never aborts or delays the others.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};

use crate::connectors::{ConnectorRegistry, MAX_PAGE_SIZE};
use crate::error::ConnectorError;
use crate::http::make_client;
use crate::types::{AggregationResult, ResultItem, SourceError, SourceName};

#[derive(Clone)]
pub struct Aggregator {
    registry: ConnectorRegistry,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(registry: ConnectorRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Search every requested source concurrently and merge the results.
    ///
    /// Sources without a registered connector are skipped. Errors come back in
    /// request order (first occurrence), not completion order.
    pub async fn aggregate(
        &self,
        query: &str,
        requested: &[SourceName],
        limit: usize,
    ) -> AggregationResult {
        crate::metrics::ensure_described();
        let t0 = Instant::now();
        let limit = limit.min(MAX_PAGE_SIZE);

        let sources = distinct_in_order(requested);
        let connectors: Vec<_> = sources
            .iter()
            .filter_map(|s| self.registry.get(*s).map(|c| (*s, c.clone())))
            .collect();

        let mut items: Vec<ResultItem> = Vec::new();
        let mut errors: Vec<SourceError> = Vec::new();

        if connectors.is_empty() || limit == 0 {
            return AggregationResult { items, errors };
        }

        // Client lives only for this call; dropped on every return path.
        let client = match make_client(self.timeout) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "http client construction failed");
                errors.extend(
                    connectors
                        .iter()
                        .map(|(s, _)| ConnectorError::Unknown(e.to_string()).into_source_error(*s)),
                );
                return AggregationResult { items, errors };
            }
        };

        let calls = connectors.iter().map(|(source, connector)| {
            let client = &client;
            async move {
                let started = Instant::now();
                let outcome = connector.fetch(client, query, limit).await;
                (*source, outcome, started.elapsed())
            }
        });

        // join_all keeps input order, so errors are already in request order.
        let outcomes = futures::future::join_all(calls).await;

        for (source, outcome, elapsed) in outcomes {
            match outcome {
                Ok(mut found) => {
                    found.retain(|it| it.source == source);
                    found.truncate(limit);
                    tracing::debug!(
                        %source,
                        count = found.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "connector returned results"
                    );
                    items.extend(found);
                }
                Err(err) => {
                    let kind = err.kind();
                    tracing::warn!(
                        %source,
                        kind = kind.as_str(),
                        error = %err,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "connector failed"
                    );
                    counter!(
                        "search_source_errors_total",
                        "source" => source.as_str(),
                        "type" => kind.as_str()
                    )
                    .increment(1);
                    errors.push(err.into_source_error(source));
                }
            }
        }

        merge_ranked(&mut items, limit);

        counter!("search_items_returned_total").increment(items.len() as u64);
        histogram!("search_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        AggregationResult { items, errors }
    }
}

fn distinct_in_order(requested: &[SourceName]) -> Vec<SourceName> {
    let mut out: Vec<SourceName> = Vec::with_capacity(requested.len());
    for s in requested {
        if !out.contains(s) {
            out.push(*s);
        }
    }
    out
}

/// Ranking key: score desc (absent = 0), then timestamp desc (absent = lowest).
pub fn rank_order(a: &ResultItem, b: &ResultItem) -> Ordering {
    let sa = a.score.unwrap_or(0);
    let sb = b.score.unwrap_or(0);
    // Option orders None below every Some, which is the "absent = lowest" rule.
    sb.cmp(&sa).then_with(|| b.timestamp.cmp(&a.timestamp))
}

/// Stable sort by [`rank_order`], then truncate to `limit`.
pub fn merge_ranked(items: &mut Vec<ResultItem>, limit: usize) {
    items.sort_by(rank_order);
    items.truncate(limit);
}
