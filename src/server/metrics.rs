use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter,
    Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all MinstrelMuse metrics
const PREFIX: &str = "minstrelmuse";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Authentication Metrics
    pub static ref AUTH_LOGIN_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_auth_login_attempts_total"), "Total login attempts"),
        &["status"]
    ).expect("Failed to create auth_login_attempts_total metric");

    pub static ref AUTH_LOGIN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_auth_login_duration_seconds"),
            "Login request duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0])
    ).expect("Failed to create auth_login_duration_seconds metric");

    // Video API Metrics
    pub static ref VIDEO_KEY_ROTATIONS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_video_api_key_rotations_total"),
        "Video API keys rotated after a quota or permission refusal"
    ).expect("Failed to create video_api_key_rotations_total metric");

    pub static ref VIDEO_FALLBACKS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_video_search_fallbacks_total"),
        "Searches answered with offline content"
    ).expect("Failed to create video_search_fallbacks_total metric");

    // Playback Metrics
    pub static ref PLAYBACK_OPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_playback_ops_total"), "Playback operations applied"),
        &["op", "outcome"]
    ).expect("Failed to create playback_ops_total metric");

    pub static ref WS_CONNECTIONS: Gauge = Gauge::new(
        format!("{PREFIX}_websocket_connections"),
        "Open realtime connections"
    ).expect("Failed to create websocket_connections metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type"),
        &["error_type"]
    ).expect("Failed to create errors_total metric");

    pub static ref PRUNED_HISTORY_ENTRIES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_pruned_history_entries_total"),
        "Listening history entries removed by the retention task"
    ).expect("Failed to create pruned_history_entries_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Already registered is fine (tests call this repeatedly)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(VIDEO_KEY_ROTATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(VIDEO_FALLBACKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAYBACK_OPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(WS_CONNECTIONS.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PRUNED_HISTORY_ENTRIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Groups request paths so ids do not explode label cardinality.
pub fn categorize_endpoint(path: &str) -> &'static str {
    let path = path.strip_prefix("/v1").unwrap_or(path);
    if path.starts_with("/auth") {
        "auth"
    } else if path.starts_with("/admin") {
        "admin"
    } else if path.starts_with("/user") {
        "user"
    } else if path.starts_with("/feed") {
        "feed"
    } else if path.starts_with("/playback") {
        "playback"
    } else if path.starts_with("/content/download") {
        "download"
    } else if path.starts_with("/content") || path.starts_with("/offline") {
        "content"
    } else if path.starts_with("/ws") {
        "websocket"
    } else {
        "other"
    }
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let endpoint = categorize_endpoint(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration.as_secs_f64());
}

pub fn record_login_attempt(status: &str, duration: Duration) {
    AUTH_LOGIN_ATTEMPTS_TOTAL.with_label_values(&[status]).inc();
    AUTH_LOGIN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_video_key_rotation() {
    VIDEO_KEY_ROTATIONS_TOTAL.inc();
}

pub fn record_video_fallback() {
    VIDEO_FALLBACKS_TOTAL.inc();
}

pub fn record_playback_op(op: &str, succeeded: bool) {
    let outcome = if succeeded { "ok" } else { "rejected" };
    PLAYBACK_OPS_TOTAL.with_label_values(&[op, outcome]).inc();
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

pub fn record_pruned_history(count: usize) {
    PRUNED_HISTORY_ENTRIES_TOTAL.inc_by(count as f64);
}

pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            // VmRSS is reported in kB
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
