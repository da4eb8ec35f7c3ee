use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    database: &'static str,
    #[serde(rename = "latencyMs", skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    store: &'static str,
    inference_policy: &'static str,
    review_offsets: Vec<u32>,
    start_time: String,
    uptime: u64,
}

async fn root(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let check = tokio::time::timeout(Duration::from_secs(2), state.store().ping()).await;

    let (database, latency_ms) = match check {
        Ok(Ok(())) => ("connected", Some(started.elapsed().as_millis() as u64)),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "store health check failed");
            ("disconnected", None)
        }
        Err(_) => ("timeout", None),
    };
    let ok = database == "connected";

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        store: state.store().kind(),
        database,
        latency_ms,
        timestamp: now_iso(),
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let config = state.config();
    Json(HealthInfoResponse {
        service: "ebbinghaus-backend",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store().kind(),
        inference_policy: config.inference_policy.as_str(),
        review_offsets: config.review_offsets.as_slice().to_vec(),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

fn system_time_iso(time: std::time::SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
