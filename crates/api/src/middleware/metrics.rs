//! Prometheus metrics.
//!
//! HTTP request metrics, the provisioning and translation counters, and the
//! `/metrics` export handler.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

use crate::services::ProvisionError;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Request latencies. Provisioning runs for minutes, everything else is fast.
const HTTP_BUCKETS: &[f64] = &[
    0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];

/// Entries per uploaded catalog.
const IMPORT_SIZE_BUCKETS: &[f64] = &[1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0];

/// Label for requests that matched no route, so probes for random paths
/// cannot blow up label cardinality.
const UNMATCHED_PATH: &str = "unmatched";

/// Records `http_requests_total` and `http_request_duration_seconds`,
/// labelled by method and route template.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_label(req.method());
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());

    let response = next.run(req).await;

    counter!(
        "http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path)
        .record(start.elapsed().as_secs_f64());

    response
}

/// Only the methods the router serves get their own label.
fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// How a provisioning request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Success,
    DatabaseNotReady,
    Conflict,
    Error,
}

impl ProvisionOutcome {
    pub fn of<T>(result: &Result<T, ProvisionError>) -> Self {
        match result {
            Ok(_) => ProvisionOutcome::Success,
            Err(ProvisionError::DatabaseNotReady { .. }) => ProvisionOutcome::DatabaseNotReady,
            Err(ProvisionError::SlugTaken(_)) => ProvisionOutcome::Conflict,
            Err(ProvisionError::Runtime(_)) => ProvisionOutcome::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionOutcome::Success => "success",
            ProvisionOutcome::DatabaseNotReady => "db_not_ready",
            ProvisionOutcome::Conflict => "conflict",
            ProvisionOutcome::Error => "error",
        }
    }
}

/// Records `shops_provisioned_total{outcome}` and the time the run took.
pub fn record_shop_provisioned(outcome: ProvisionOutcome, elapsed: Duration) {
    counter!("shops_provisioned_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("shop_provision_duration_seconds", "outcome" => outcome.as_str())
        .record(elapsed.as_secs_f64());
}

/// Records which template source served an export.
pub fn record_translation_export(source: &'static str) {
    counter!("translation_exports_total", "source" => source).increment(1);
}

/// Records a deployed translation upload.
pub fn record_translation_import(entries: usize) {
    counter!("translation_imports_total").increment(1);
    histogram!("translation_import_entries").record(entries as f64);
}

/// GET /metrics in Prometheus text format.
pub async fn metrics_handler() -> Response {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized").into_response(),
    }
}

/// Installs the global Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() -> Result<(), BuildError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), HTTP_BUCKETS)?
        .set_buckets_for_metric(
            Matcher::Full("translation_import_entries".to_string()),
            IMPORT_SIZE_BUCKETS,
        )?
        .install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle);
    Ok(())
}
