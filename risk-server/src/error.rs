//! Error handling
//!
//! Every failure reaches the client as a short, non-technical message.
//! Internal detail goes to the log only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use albumin_risk_core::ScoringError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Body could not be read as an assessment request
    #[error("bad request: {0}")]
    BadRequest(String),

    /// One or more values outside their clinical domain
    #[error("validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "The request could not be read. Please check the submitted values.".to_string(),
                vec![msg.clone()],
            ),
            AppError::Validation(problems) => (
                StatusCode::BAD_REQUEST,
                "Some values are outside their accepted clinical range.".to_string(),
                problems.clone(),
            ),
            AppError::Scoring(ScoringError::InvalidFeature { field, .. }) => (
                StatusCode::BAD_REQUEST,
                format!("Please provide a valid value for {}.", field),
                vec![self.to_string()],
            ),
            AppError::Scoring(ScoringError::ClassifierContract { .. }) => {
                tracing::error!("Classifier contract violation: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The risk model returned an invalid result. Please contact support.".to_string(),
                    vec![],
                )
            }
            AppError::Scoring(ScoringError::Prediction(_)) => {
                tracing::error!("Prediction error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The risk model could not evaluate this patient. Please try again later or contact support.".to_string(),
                    vec![],
                )
            }
            AppError::Scoring(_) => {
                tracing::error!("Configuration error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The risk calculator is misconfigured. Please contact support.".to_string(),
                    vec![],
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "details": details,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
