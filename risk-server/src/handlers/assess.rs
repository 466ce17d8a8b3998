//! Assessment handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use validator::Validate;

use albumin_risk_core::features::{clamp_to_domain, BoundsPolicy};
use albumin_risk_core::RiskReport;

use crate::models::assessment::validation_messages;
use crate::models::{AssessRequest, AssessResponse};
use crate::{AppError, AppResult, AppState};

/// Score one patient
pub async fn assess(
    State(state): State<AppState>,
    payload: Result<Json<AssessRequest>, JsonRejection>,
) -> AppResult<Json<AssessResponse>> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let inputs = match state.config.bounds_policy {
        BoundsPolicy::Reject => {
            req.validate()
                .map_err(|e| AppError::Validation(validation_messages(&e)))?;
            req.to_inputs()
        }
        BoundsPolicy::Clamp => clamp_to_domain(&req.to_inputs()),
    };

    let record = inputs.assemble()?;
    let assessment = state.scorer.score(&record)?;

    tracing::info!(
        raw = assessment.raw_probability,
        display = assessment.display_probability,
        high_risk = assessment.is_high_risk,
        "Assessment completed"
    );

    Ok(Json(AssessResponse {
        report: RiskReport::render(&assessment, state.config.report_locale),
        assessment,
        inputs,
        bounds_policy: state.config.bounds_policy,
        model: state.scorer.classifier_name().to_string(),
        assessed_at: chrono::Utc::now().timestamp(),
    }))
}
