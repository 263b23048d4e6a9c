use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{RawQuery, Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Extension, Json, Router,
};
use metrics::counter;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::aggregator::Aggregator;
use crate::config::Settings;
use crate::connectors::ConnectorRegistry;
use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::probe::default_probes;
use crate::request_log::{record_best_effort, DynRequestLog, InMemoryRequestLog, SearchSummary};
use crate::status::StatusCache;
use crate::text::anon_hash;
use crate::types::{ProviderHealth, ResultItem, SourceError, SourceName};

pub const QUERY_MAX_CHARS: usize = 200;
pub const LIMIT_MAX: usize = 50;
pub const LIMIT_DEFAULT: usize = 20;
pub const LOGS_LIMIT_MAX: usize = 200;
pub const LOGS_LIMIT_DEFAULT: usize = 50;

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
static X_TOOK_MS: HeaderName = HeaderName::from_static("x-took-ms");

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub aggregator: Arc<Aggregator>,
    pub status: Arc<StatusCache>,
    pub request_log: DynRequestLog,
}

impl AppState {
    /// Wire connectors, probes, status cache and request log from settings.
    pub fn from_settings(settings: Settings) -> Self {
        let registry = ConnectorRegistry::from_settings(&settings);
        tracing::info!(
            connectors = ?registry.sources().collect::<Vec<_>>(),
            "connectors registered"
        );
        let aggregator = Aggregator::new(registry, settings.http_timeout);
        let status = StatusCache::new(default_probes(&settings), settings.status_ttl);
        let request_log = InMemoryRequestLog::with_capacity(settings.request_log_capacity);
        Self {
            settings: Arc::new(settings),
            aggregator: Arc::new(aggregator),
            status: Arc::new(status),
            request_log: Arc::new(request_log),
        }
    }

    /// Replace the default in-memory request log.
    pub fn with_request_log(mut self, log: DynRequestLog) -> Self {
        self.request_log = log;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let ttl_ms = state.status.ttl().as_millis() as u64;
    let cors = cors_layer(&state.settings.cors_allow_origins);

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/v1/search", get(search))
        .route("/v1/sources", get(sources))
        .route("/v1/logs", get(logs));

    if let Some(m) = Metrics::init(ttl_ms) {
        app = app.merge(m.router());
    }

    app.layer(middleware::from_fn(request_meta))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::very_permissive();
    }
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([X_REQUEST_ID.clone(), X_TOOK_MS.clone()])
}

// ---- request meta middleware ----

/// Per-request id and start instant, set before any handler runs.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    pub started: Instant,
}

impl RequestMeta {
    pub fn took_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

async fn request_meta(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 64)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    let meta = RequestMeta {
        request_id: request_id.clone(),
        started: Instant::now(),
    };
    req.extensions_mut().insert(meta.clone());

    let mut resp = next.run(req).await;

    let headers = resp.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        headers.insert(X_REQUEST_ID.clone(), v);
    }
    headers.insert(X_TOOK_MS.clone(), HeaderValue::from(meta.took_ms()));
    resp
}

// ---- /health ----

#[derive(Serialize)]
struct HealthOut {
    status: &'static str,
    app: String,
    env: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "ok",
        app: state.settings.app_name.clone(),
        env: state.settings.environment.clone(),
    })
}

// ---- /v1/search ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub q: String,
    pub sources: Vec<SourceName>,
    pub limit: usize,
}

impl SearchParams {
    /// Parse `q`, repeatable `sources`, and `limit` from a raw query string.
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let mut q: Option<String> = None;
        let mut sources: Vec<SourceName> = Vec::new();
        let mut limit: Option<usize> = None;

        for (k, v) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match k.as_ref() {
                "q" => q = Some(v.into_owned()),
                "sources" => {
                    let s = v
                        .parse::<SourceName>()
                        .map_err(|e| ApiError::Validation(e.to_string()))?;
                    if !sources.contains(&s) {
                        sources.push(s);
                    }
                }
                "limit" => {
                    let n = v.trim().parse::<usize>().map_err(|_| {
                        ApiError::Validation(format!("limit must be an integer, got '{v}'"))
                    })?;
                    limit = Some(n);
                }
                _ => {}
            }
        }

        let q = q.ok_or_else(|| ApiError::Validation("q is required".into()))?;
        let len = q.chars().count();
        if q.trim().is_empty() || len > QUERY_MAX_CHARS {
            return Err(ApiError::Validation(format!(
                "q must be 1..{QUERY_MAX_CHARS} characters"
            )));
        }

        let limit = limit.unwrap_or(LIMIT_DEFAULT);
        if !(1..=LIMIT_MAX).contains(&limit) {
            return Err(ApiError::Validation(format!(
                "limit must be within 1..{LIMIT_MAX}"
            )));
        }

        if sources.is_empty() {
            sources = SourceName::default_search_set();
        }

        Ok(Self { q, sources, limit })
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub sources: Vec<SourceName>,
    pub items: Vec<ResultItem>,
    pub errors: Vec<SourceError>,
    pub took_ms: u64,
}

async fn search(
    State(state): State<AppState>,
    Extension(meta): Extension<RequestMeta>,
    RawQuery(raw): RawQuery,
) -> Result<Json<SearchResponse>, ApiError> {
    let params = SearchParams::parse(raw.as_deref())?;
    counter!("search_requests_total").increment(1);

    let result = state
        .aggregator
        .aggregate(&params.q, &params.sources, params.limit)
        .await;

    let resp = SearchResponse {
        query: params.q,
        sources: params.sources,
        items: result.items,
        errors: result.errors,
        took_ms: meta.took_ms(),
    };

    tracing::info!(
        request_id = %meta.request_id,
        query_id = %anon_hash(&resp.query),
        sources = ?resp.sources,
        limit = params.limit,
        items = resp.items.len(),
        errors = resp.errors.len(),
        took_ms = resp.took_ms,
        "search served"
    );

    // Response is final; logging must not change it.
    record_best_effort(
        state.request_log.as_ref(),
        SearchSummary {
            request_id: meta.request_id.clone(),
            path: "/v1/search".to_string(),
            q: resp.query.clone(),
            sources: resp.sources.clone(),
            limit: params.limit,
            took_ms: resp.took_ms,
            items_count: resp.items.len(),
            errors: resp.errors.clone(),
        },
    );

    Ok(Json(resp))
}

// ---- /v1/sources ----

/// Boolean flag from a raw query string: absent is `false`; `true/1/yes/on` and
/// `false/0/no/off` are accepted in any case, as is a bare `?force`.
pub fn parse_flag(raw: Option<&str>, name: &str) -> Result<bool, ApiError> {
    let mut out = false;
    for (k, v) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        if k != name {
            continue;
        }
        out = match v.trim().to_ascii_lowercase().as_str() {
            "" | "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            other => {
                return Err(ApiError::Validation(format!(
                    "{name} must be a boolean, got '{other}'"
                )))
            }
        };
    }
    Ok(out)
}

async fn sources(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<ProviderHealth>>, ApiError> {
    let force = parse_flag(raw.as_deref(), "force")?;
    let snap = state.status.get_status(force).await;
    Ok(Json(snap.providers.clone()))
}

// ---- /v1/logs ----

#[derive(Debug, Serialize)]
struct LogRow {
    id: u64,
    ts: chrono::DateTime<chrono::Utc>,
    request_id: String,
    q: String,
    sources: Vec<SourceName>,
    took_ms: u64,
    items_count: usize,
    errors_count: usize,
}

async fn logs(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<LogRow>>, ApiError> {
    let limit = url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
        .find(|(k, _)| k == "limit")
        .map(|(_, v)| {
            v.trim().parse::<usize>().map_err(|_| {
                ApiError::Validation(format!("limit must be an integer, got '{v}'"))
            })
        })
        .transpose()?;
    let n = limit.unwrap_or(LOGS_LIMIT_DEFAULT);
    if !(1..=LOGS_LIMIT_MAX).contains(&n) {
        return Err(ApiError::Validation(format!(
            "limit must be within 1..{LOGS_LIMIT_MAX}"
        )));
    }
    let rows = state
        .request_log
        .recent(n)
        .into_iter()
        .map(|e| LogRow {
            id: e.id,
            ts: e.ts,
            request_id: e.request_id,
            q: e.q,
            sources: e.sources,
            took_ms: e.took_ms,
            items_count: e.items_count,
            errors_count: e.errors_count,
        })
        .collect();
    Ok(Json(rows))
}
