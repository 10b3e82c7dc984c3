use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::{Duration, Instant};
use tracing::info;

/// Install the Prometheus recorder and serve `/metrics` on `port`
pub fn init_metrics_with_port(
    port: u16,
) -> Result<PrometheusHandle, Box<dyn std::error::Error + Send + Sync>> {
    let builder = PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .add_global_label("service", "subscription_tracker");

    let handle = builder.install_recorder()?;

    info!("Metrics server started on :{}/metrics", port);
    Ok(handle)
}

/// Middleware to collect HTTP request metrics
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    gauge!("http_requests_active").increment(1.0);
    let response = next.run(req).await;
    gauge!("http_requests_active").decrement(1.0);

    let status = response.status();
    let labels = [
        ("method", method.as_str().to_string()),
        ("path", path),
        ("status", status.as_str().to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());

    if status.is_server_error() {
        counter!("http_errors_total", &labels[..2]).increment(1);
    }

    response
}

/// Track a create/read/update/delete on a subscription
pub fn track_subscription_operation(operation: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("subscription_operations_total",
        "operation" => operation,
        "result" => result
    )
    .increment(1);
}

/// Track an aggregate total query and how many subscriptions it scanned
pub fn track_aggregate_query(scanned: usize, duration: Duration) {
    counter!("aggregate_queries_total").increment(1);
    histogram!("aggregate_query_duration_seconds").record(duration.as_secs_f64());
    histogram!("aggregate_subscriptions_scanned").record(scanned as f64);
}
