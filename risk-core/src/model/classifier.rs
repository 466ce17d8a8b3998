//! Classifier capability
//!
//! The scorer only needs one thing from a trained model: the two-class
//! probability vector for a single record. Backends (tree ensemble, ONNX)
//! implement this trait; the loader hands one out as `Arc<dyn Classifier>`.

use crate::error::InferenceError;
use crate::features::FeatureRecord;

/// Index of the positive ("hypoalbuminemia") class
pub const POSITIVE_CLASS: usize = 1;

/// Trait for inference backends (tree ensemble, ONNX, test doubles)
///
/// Implementations are loaded once and then used read-only, possibly from
/// several request handlers at the same time.
pub trait Classifier: Send + Sync {
    /// `[p_negative, p_positive]` for `record`
    fn predict_proba(&self, record: &FeatureRecord) -> Result<[f64; 2], InferenceError>;

    /// Short backend description for logs and metadata
    fn name(&self) -> &str;

    /// Probability of the positive class
    fn predict_probability(&self, record: &FeatureRecord) -> Result<f64, InferenceError> {
        self.predict_proba(record).map(|p| p[POSITIVE_CLASS])
    }
}
