use crate::engine::EngineHandle;
use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use facereg_core::Encoding;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

const UNKNOWN_NAME: &str = "Unknown";

/// Build the HTTP router around a running engine.
pub fn router(engine: EngineHandle, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/recognize", post(recognize))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub image: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecognizeRequest {
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub message: String,
    pub encoding: Encoding,
}

#[derive(Debug, Serialize)]
pub struct MatchItem {
    pub name: String,
    /// Euclidean distance to the nearest registered face; lower is closer.
    pub confidence: Option<f32>,
    pub encoding: Encoding,
}

#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub status: &'static str,
    pub matches: Vec<MatchItem>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub encoder: String,
    pub threshold: f32,
    pub records: Option<usize>,
}

/// Absent, null and empty strings all count as missing.
fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

async fn register(
    State(engine): State<EngineHandle>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(req) = payload?;
    let (Some(image), Some(name)) = (non_empty(req.image), non_empty(req.name)) else {
        return Err(ApiError::MissingNameOrImage);
    };

    let registered = engine.register(image, name).await?;

    Ok(Json(RegisterResponse {
        status: "success",
        message: format!("Face registered for {}", registered.name),
        encoding: registered.encoding,
    }))
}

async fn recognize(
    State(engine): State<EngineHandle>,
    payload: Result<Json<RecognizeRequest>, JsonRejection>,
) -> Result<Json<RecognizeResponse>, ApiError> {
    let Json(req) = payload?;
    let image = non_empty(req.image).ok_or(ApiError::MissingImage)?;

    let matches = engine
        .recognize(image)
        .await?
        .into_iter()
        .map(|m| MatchItem {
            name: m.name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            confidence: m.distance,
            encoding: m.encoding,
        })
        .collect();

    Ok(Json(RecognizeResponse {
        status: "success",
        matches,
    }))
}

async fn status(State(engine): State<EngineHandle>) -> Result<Json<StatusResponse>, ApiError> {
    let status = engine.status().await?;
    Ok(Json(StatusResponse {
        status: "success",
        version: env!("CARGO_PKG_VERSION"),
        encoder: status.encoder,
        threshold: status.threshold,
        records: status.records,
    }))
}
