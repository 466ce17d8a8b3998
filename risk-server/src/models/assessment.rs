//! Assessment request/response model
//!
//! The request struct is the input boundary: field ranges here mirror the
//! domains in `FEATURE_SPECS` and are enforced when the bounds policy is
//! `reject`.

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationErrors};

use albumin_risk_core::features::{BoundsPolicy, LayoutInfo, FEATURE_LAYOUT};
use albumin_risk_core::model::ModelMetadata;
use albumin_risk_core::{ClinicalInputs, RiskAssessment, RiskReport};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AssessRequest {
    #[serde(rename = "Mg")]
    #[validate(range(min = 0.0, max = 5.0, message = "Mg must be between 0 and 5 mmol/L"))]
    pub mg: Option<f64>,

    #[serde(rename = "ALT")]
    #[validate(range(min = 0.0, max = 500.0, message = "ALT must be between 0 and 500 U/L"))]
    pub alt: Option<f64>,

    #[serde(rename = "AG")]
    #[validate(range(min = 0.0, max = 50.0, message = "AG must be between 0 and 50 mmol/L"))]
    pub ag: Option<f64>,

    #[serde(rename = "CHE")]
    #[validate(range(min = 100.0, max = 20000.0, message = "CHE must be between 100 and 20000 U/L"))]
    pub che: Option<f64>,

    #[serde(rename = "HCT")]
    #[validate(range(min = 10.0, max = 70.0, message = "HCT must be between 10 and 70 %"))]
    pub hct: Option<f64>,

    #[serde(rename = "INR")]
    #[validate(range(min = 0.0, max = 10.0, message = "INR must be between 0 and 10"))]
    pub inr: Option<f64>,

    #[serde(rename = "hs_CRP")]
    #[validate(range(min = 0.0, max = 300.0, message = "hs_CRP must be between 0 and 300 mg/L"))]
    pub hs_crp: Option<f64>,

    /// Whole years; `75` and `75.0` are both accepted
    #[serde(rename = "Age", default, deserialize_with = "whole_years")]
    #[validate(range(min = 18, max = 110, message = "Age must be between 18 and 110 years"))]
    pub age: Option<u32>,
}

impl AssessRequest {
    pub fn to_inputs(&self) -> ClinicalInputs {
        ClinicalInputs {
            mg: self.mg,
            alt: self.alt,
            ag: self.ag,
            che: self.che,
            hct: self.hct,
            inr: self.inr,
            hs_crp: self.hs_crp,
            age: self.age.map(f64::from),
        }
    }
}

/// `Age` as sent by number inputs and by `/api/v1/defaults` is a JSON float.
/// Integral values are accepted, fractional or negative ones are not.
fn whole_years<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|years| {
            if years.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&years) {
                Ok(years as u32)
            } else {
                Err(serde::de::Error::custom(format!(
                    "Age must be a whole number of years, got {}",
                    years
                )))
            }
        })
        .transpose()
}

/// Flatten validator output into one message per offending field, in
/// feature-layout order
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let field_errors = errors.field_errors();
    let mut entries: Vec<(usize, String)> = Vec::new();

    for (field, list) in field_errors.iter() {
        let field = field.to_string();
        let position = FEATURE_LAYOUT
            .iter()
            .position(|name| name.eq_ignore_ascii_case(&field))
            .unwrap_or(usize::MAX);

        for error in list.iter() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is out of range", field));
            entries.push((position, message));
        }
    }

    entries.sort();
    entries.into_iter().map(|(_, message)| message).collect()
}

#[derive(Debug, Serialize)]
pub struct AssessResponse {
    pub assessment: RiskAssessment,
    pub report: RiskReport,
    /// Values actually scored (after clamping, if enabled)
    pub inputs: ClinicalInputs,
    pub bounds_policy: BoundsPolicy,
    pub model: String,
    pub assessed_at: i64,
}

#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub name: &'static str,
    pub population: &'static str,
    pub metadata: ModelMetadata,
    pub layout: LayoutInfo,
    pub threshold: f64,
    pub bounds_policy: BoundsPolicy,
}
