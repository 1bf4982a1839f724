//! JSON HTTP API over the dream service.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dream_core::{DreamError, DreamRecord};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::service::{DreamService, ServiceError};

const MIN_DREAM_CHARS: usize = 10;
const DEFAULT_USER: &str = "anonymous";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = match &e {
            ServiceError::Dream(DreamError::InvalidInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Dream(DreamError::Conflict { .. }) => StatusCode::CONFLICT,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {e}");
        }
        Self::new(status, e.to_string())
    }
}

/// Malformed or mistyped bodies keep axum's status but use the `detail` shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
struct DreamInput {
    dream_text: String,
    #[serde(default = "default_user")]
    user_id: String,
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

pub fn router(service: DreamService) -> Router {
    Router::new()
        .route("/analyze-dream", post(analyze_dream))
        .route("/generate-symbol/{user_id}", get(generate_symbol))
        .route("/user-stats/{user_id}", get(user_stats))
        .route("/dream/{dream_id}", get(get_dream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(
    service: DreamService,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Cancel `token` on Ctrl-C, or SIGTERM on unix.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("SIGTERM handler unavailable: {e}");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("shutdown requested");
        token.cancel();
    });
}

fn record_json(record: &DreamRecord) -> Value {
    let c = &record.classified;
    json!({
        "id": record.id,
        "dream_text": record.text,
        "user_id": record.user_id,
        "sequence": record.sequence,
        "analysis": {
            "upper_downer_score": c.axis_score.valence,
            "static_dynamic_score": c.axis_score.energy,
            "confidence": c.confidence,
            "keywords": c.matched_keywords,
            "quadrant": c.quadrant,
            "description": c.quadrant.describe(),
        },
        "timestamp": record.created_at,
    })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

async fn analyze_dream(
    State(service): State<DreamService>,
    payload: Result<Json<DreamInput>, JsonRejection>,
) -> ApiResult {
    let Json(input) = payload?;
    if input.dream_text.trim().chars().count() < MIN_DREAM_CHARS {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("dream_text must be at least {MIN_DREAM_CHARS} characters"),
        ));
    }
    let submission = service
        .run(move |s| s.submit(&input.user_id, &input.dream_text, &[]))
        .await?;

    let mut body = record_json(&submission.record);
    body["symbol"] = json!(submission.params);
    Ok(Json(body))
}

async fn generate_symbol(
    State(service): State<DreamService>,
    Path(user_id): Path<String>,
) -> ApiResult {
    let view = service.run(move |s| s.symbol(&user_id, true)).await?;
    Ok(Json(json!({
        "user_id": view.user_id,
        "symbol_svg": view.svg,
        "dream_count": view.dream_count,
        "coordinates": [view.coordinates.0, view.coordinates.1],
        "params": view.params,
    })))
}

async fn user_stats(
    State(service): State<DreamService>,
    Path(user_id): Path<String>,
) -> ApiResult {
    let stats = service.run(move |s| s.stats(&user_id)).await?;
    if stats.total_dreams == 0 {
        return Ok(Json(json!({ "total_dreams": 0 })));
    }
    Ok(Json(json!({
        "total_dreams": stats.total_dreams,
        "average_emotional_score": round2(stats.average_valence),
        "average_dynamic_score": round2(stats.average_energy),
        "average_confidence": round2(stats.average_confidence),
        "dominant_quadrant": stats.dominant_quadrant.describe(),
        "quadrant_counts": stats.quadrant_counts,
    })))
}

async fn get_dream(
    State(service): State<DreamService>,
    Path(dream_id): Path<String>,
) -> ApiResult {
    let id = Uuid::parse_str(&dream_id)
        .map_err(|_| ApiError::new(StatusCode::NOT_FOUND, "Dream not found"))?;
    let record = service.run(move |s| s.dream(id)).await?;
    Ok(Json(record_json(&record)))
}
