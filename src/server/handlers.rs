//! HTTP request handlers

use super::state::AppState;
use super::{ErrorResponse, HealthResponse};
use crate::inference::{GenerateRequest, ModelVariant};
use crate::Error;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

/// Query string of `POST /generate`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateQuery {
    pub model_type: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

/// Status code for a failed generation
fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Image(_) | Error::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        models: state.variants().iter().map(ToString::to_string).collect(),
    };

    (StatusCode::OK, Json(health))
}

/// Translate the uploaded image with the requested variant
pub async fn generate(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
    body: Bytes,
) -> Response {
    let variant = match query.model_type.parse::<ModelVariant>() {
        Ok(variant) => variant,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    if !state.variants().contains(&variant) {
        return error_response(StatusCode::NOT_FOUND, format!("model type '{variant}' is not loaded"));
    }
    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty upload");
    }

    match state.submit(GenerateRequest::new(body.to_vec(), variant)).await {
        Ok(Ok(png)) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Ok(Err(e)) => error_response(status_for(&e), e.to_string()),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}
