//! Prometheus metrics and health endpoints for the dating bot.
//!
//! Exposes:
//! - `dating_bot_update_duration_seconds` (histogram)
//! - `dating_bot_update_total` (counter with status)
//! - `dating_bot_update_inflight` (gauge)
//! - `dating_bot_matches_total` (counter)
//! - `dating_bot_relay_total` (counter by channel and outcome)
//! - `dating_bot_participants` (gauge by pairing state)
//! - process metrics via `process` collector
//!
//! Routes: `/metrics`, `/stats` (directory counts as JSON) and `/` (liveness).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, Encoder, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
    TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::pairing::{DirectoryStats, PairingDirectory};

pub const LIVENESS_BODY: &str = "Bot is live";

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static UPDATE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 5ms up to ~40 seconds.
    let buckets =
        prometheus::exponential_buckets(0.005, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "dating_bot_update_duration_seconds",
        "Update handling duration in seconds",
        &["handler"],
        buckets
    )
    .expect("failed to register update duration histogram")
});

static UPDATE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dating_bot_update_total",
        "Total handled updates by status",
        &["handler", "status"]
    )
    .expect("failed to register update counter")
});

static UPDATE_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "dating_bot_update_inflight",
        "Number of in-flight updates",
        &["handler"]
    )
    .expect("failed to register inflight gauge")
});

static MATCHES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("dating_bot_matches_total", "Pairings formed")
        .expect("failed to register match counter")
});

static RELAY_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dating_bot_relay_total",
        "Relay attempts by channel and outcome",
        &["channel", "outcome"]
    )
    .expect("failed to register relay counter")
});

static PARTICIPANTS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "dating_bot_participants",
        "Known participants by pairing state",
        &["state"]
    )
    .expect("failed to register participants gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&UPDATE_DURATION);
    Lazy::force(&UPDATE_TOTAL);
    Lazy::force(&UPDATE_INFLIGHT);
    Lazy::force(&MATCHES_TOTAL);
    Lazy::force(&RELAY_TOTAL);
    Lazy::force(&PARTICIPANTS);
}

/// Increment inflight gauge for a handler.
pub fn record_update_start(handler: &'static str) {
    init_collectors();
    UPDATE_INFLIGHT.with_label_values(&[handler]).inc();
}

/// Record update completion with duration and status.
pub fn record_update_result(handler: &'static str, duration: Duration, success: bool) {
    init_collectors();
    UPDATE_INFLIGHT.with_label_values(&[handler]).dec();
    UPDATE_DURATION
        .with_label_values(&[handler])
        .observe(duration.as_secs_f64());
    UPDATE_TOTAL
        .with_label_values(&[handler, if success { "ok" } else { "error" }])
        .inc();
}

pub fn record_match() {
    MATCHES_TOTAL.inc();
}

pub fn record_relay(channel: &'static str, outcome: &'static str) {
    RELAY_TOTAL.with_label_values(&[channel, outcome]).inc();
}

pub fn record_directory_stats(stats: &DirectoryStats) {
    PARTICIPANTS.with_label_values(&["idle"]).set(stats.idle as i64);
    PARTICIPANTS
        .with_label_values(&["searching"])
        .set(stats.searching as i64);
    PARTICIPANTS.with_label_values(&["paired"]).set(stats.paired as i64);
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "encode error",
        ));
    }

    let mut response = text_response(StatusCode::OK, buffer);
    if let Ok(content_type) = encoder.format_type().parse::<hyper::header::HeaderValue>() {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

async fn stats_response(directory: &PairingDirectory) -> Result<Response<Full<Bytes>>, Infallible> {
    let stats = directory.stats().await;
    record_directory_stats(&stats);

    match serde_json::to_vec(&stats) {
        Ok(body) => {
            let mut response = text_response(StatusCode::OK, body);
            response.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("application/json"),
            );
            Ok(response)
        }
        Err(err) => {
            error!("Failed to encode stats: {}", err);
            Ok(text_response(StatusCode::INTERNAL_SERVER_ERROR, "encode error"))
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    directory: Arc<PairingDirectory>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    route(req.uri().path(), &directory).await
}

async fn route(path: &str, directory: &PairingDirectory) -> Result<Response<Full<Bytes>>, Infallible> {
    match path {
        "/metrics" => {
            record_directory_stats(&directory.stats().await);
            metrics_response().await
        }
        "/stats" => stats_response(directory).await,
        "/" | "/healthz" => Ok(text_response(StatusCode::OK, LIVENESS_BODY)),
        _ => Ok(text_response(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn serve(addr: SocketAddr, directory: Arc<PairingDirectory>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let directory = directory.clone();
        let service = service_fn(move |req| handle_request(req, directory.clone()));
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr, directory: Arc<PairingDirectory>) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr, directory).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
