//! Error types for assembling, scoring and loading.

use std::path::PathBuf;

use crate::features::LayoutMismatchError;

/// Failure reported by a classifier backend itself
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("InferenceError: {0}")]
pub struct InferenceError(pub String);

/// Everything that can go wrong between raw inputs and a `RiskAssessment`
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// A field is missing, unknown, duplicated or not a finite number
    #[error("invalid feature `{field}`: {reason}")]
    InvalidFeature { field: String, reason: String },

    /// The record was built against a different feature layout
    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    /// The classifier returned something that is not a probability
    #[error("classifier returned {value}, expected a probability in [0, 1]")]
    ClassifierContract { value: f64 },

    /// Operating threshold must lie strictly inside (0, 1)
    #[error("invalid operating threshold {value}: must lie strictly between 0 and 1")]
    InvalidThreshold { value: f64 },

    /// The classifier failed to produce a prediction
    #[error("prediction failed: {0}")]
    Prediction(#[from] InferenceError),
}

impl ScoringError {
    pub(crate) fn invalid_feature(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ScoringError::InvalidFeature {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to turn an artifact on disk into a usable classifier.
///
/// Always fatal to startup; the host reports it and exits.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),

    /// Artifact was a container that does not hold exactly one model
    #[error("expected a model or a single-element container, found a container of {0} elements")]
    ContainerShape(usize),

    #[error("malformed model document: {0}")]
    Parse(String),

    #[error("model features {found:?} do not match the expected layout")]
    SchemaMismatch { found: Vec<String> },

    #[error("unsupported objective `{0}`, expected binary:logistic")]
    UnsupportedObjective(String),

    #[error("ONNX runtime error: {0}")]
    Onnx(String),
}

impl From<serde_json::Error> for ModelLoadError {
    fn from(err: serde_json::Error) -> Self {
        ModelLoadError::Parse(err.to_string())
    }
}
