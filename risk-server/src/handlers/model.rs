//! Model information handlers

use axum::{extract::State, Json};

use albumin_risk_core::constants;
use albumin_risk_core::features::LayoutInfo;
use albumin_risk_core::ClinicalInputs;

use crate::models::ModelInfoResponse;
use crate::AppState;

/// Loaded artifact, feature layout and operating threshold
pub async fn info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    Json(ModelInfoResponse {
        name: constants::APP_NAME,
        population: constants::TARGET_POPULATION,
        metadata: (*state.model).clone(),
        layout: LayoutInfo::current(),
        threshold: state.scorer.threshold().value(),
        bounds_policy: state.config.bounds_policy,
    })
}

/// Values pre-filled on the input form
pub async fn defaults() -> Json<ClinicalInputs> {
    Json(ClinicalInputs::form_defaults())
}
