//! HTTP surface: liveness, favicon and the `/predict` endpoint.
//!
//! Every failure on `/predict` (non-JSON content type, unreadable body,
//! invalid JSON, bad field, model error) is answered with
//! `500 {"error": "<message>"}`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::application::InferenceService;
use crate::domain::DiagnosisLabel;
use crate::ports::{ClassPredictor, ProbabilityScorer};
use crate::GlycosenseError;

/// Liveness text returned by `GET /`.
pub const LIVENESS_TEXT: &str = "Glycosense prediction service is running!";

/// Successful `/predict` body.
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: DiagnosisLabel,
}

/// Failed `/predict` body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the axum [`Router`] with all routes.
pub fn router<C, S>(service: Arc<InferenceService<C, S>>, body_limit_bytes: usize) -> Router
where
    C: ClassPredictor + 'static,
    S: ProbabilityScorer + 'static,
{
    Router::new()
        .route("/", get(index_handler))
        .route("/favicon.ico", get(favicon_handler))
        .route("/predict", post(predict_handler::<C, S>))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .with_state(service)
}

async fn index_handler() -> &'static str {
    LIVENESS_TEXT
}

async fn favicon_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn predict_handler<C, S>(
    State(service): State<Arc<InferenceService<C, S>>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    C: ClassPredictor + 'static,
    S: ProbabilityScorer + 'static,
{
    if !is_json_content_type(&headers) {
        tracing::warn!("Rejected request without a JSON content type");
        return error_response("Expected request Content-Type to be 'application/json'".to_string());
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(status = %rejection.status(), "Failed to read request body");
            return error_response(rejection.body_text());
        }
    };

    // Scoring is CPU-bound; keep it off the reactor threads.
    let outcome = tokio::task::spawn_blocking(move || {
        let record: Value = serde_json::from_slice(&body)?;
        service.predict_record(&record)
    })
    .await
    .unwrap_or_else(|e| Err(GlycosenseError::Task(e.to_string())));

    match outcome {
        Ok(outcome) => Json(PredictionResponse {
            prediction: outcome.label,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error_kind = e.kind(), "Prediction request failed");
            error_response(e.to_string())
        }
    }
}

/// `application/json` or `application/<suffix>+json`, parameters ignored.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn error_response(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: message }),
    )
        .into_response()
}
