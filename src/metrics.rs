use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_requests_total", "Search requests served.");
        describe_counter!(
            "search_items_returned_total",
            "Items returned after merge and truncation."
        );
        describe_counter!(
            "search_source_errors_total",
            "Connector failures by source and type."
        );
        describe_histogram!("search_duration_ms", "Aggregation wall time in milliseconds.");
        describe_counter!("status_refresh_total", "Provider status refresh passes.");
        describe_counter!(
            "status_cache_hits_total",
            "Status reads served without a refresh."
        );
        describe_gauge!("status_cache_ttl_ms", "Status cache TTL in milliseconds.");
        describe_counter!(
            "request_log_failures_total",
            "Request log writes that failed."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (first call wins) and publish the status TTL.
    ///
    /// Returns `None` when another recorder already owns the process.
    pub fn init(status_ttl_ms: u64) -> Option<Self> {
        let handle = HANDLE
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(h) => Some(h),
                Err(e) => {
                    tracing::warn!(error = %e, "prometheus recorder not installed");
                    None
                }
            })
            .clone()?;

        ensure_described();
        gauge!("status_cache_ttl_ms").set(status_ttl_ms as f64);

        Some(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S: Clone + Send + Sync + 'static>(&self) -> Router<S> {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
