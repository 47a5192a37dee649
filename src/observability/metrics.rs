//! Metrics collection and exposition.
//!
//! # Metrics
//! - `portfolio_requests_total` (counter): requests by method, status
//! - `portfolio_request_duration_seconds` (histogram): latency distribution
//! - `portfolio_rejections_total` (counter): error responses by reason
//! - `portfolio_rate_limited_total` (counter): 429s by route identifier
//! - `portfolio_rate_limit_entries` (gauge): live rate-limit windows
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter, so
//! tests and metrics-disabled deployments pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(
        "portfolio_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("portfolio_request_duration_seconds", "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    counter!("portfolio_rejections_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited(identifier: &str) {
    counter!("portfolio_rate_limited_total", "identifier" => identifier.to_string()).increment(1);
}

pub fn record_rate_limit_entries(count: usize) {
    gauge!("portfolio_rate_limit_entries").set(count as f64);
}

/// Middleware counting every response and timing it.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), started);
    response
}
