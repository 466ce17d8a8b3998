//! Risk Scorer
//!
//! Turns a `FeatureRecord` into a `RiskAssessment`: one classifier call,
//! then the display recalibration around the operating threshold. Pure per
//! call; the classifier is injected once and only read afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::features::FeatureRecord;
use crate::model::{Classifier, Threshold};


// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Output of one scoring pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Positive-class probability straight from the classifier
    pub raw_probability: f64,
    /// Recalibrated score, 0.5 at the operating threshold
    pub display_probability: f64,
    /// `display_probability > 0.5`
    pub is_high_risk: bool,
    /// Operating threshold the score was centered on
    pub threshold: f64,
}

// ============================================================================
// SCORER
// ============================================================================

/// Scores feature records with an injected classifier
#[derive(Clone)]
pub struct RiskScorer {
    classifier: Arc<dyn Classifier>,
    threshold: Threshold,
}

impl std::fmt::Debug for RiskScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskScorer")
            .field("classifier", &self.classifier.name())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl RiskScorer {
    /// The threshold is already validated by `Threshold`, so a scorer can
    /// never be built around a degenerate operating point.
    pub fn new(classifier: Arc<dyn Classifier>, threshold: Threshold) -> Self {
        log::info!(
            "Risk scorer ready (classifier: {}, threshold: {})",
            classifier.name(),
            threshold
        );
        Self {
            classifier,
            threshold,
        }
    }

    /// Scorer using the Youden-index operating point
    pub fn with_default_threshold(classifier: Arc<dyn Classifier>) -> Self {
        Self::new(classifier, Threshold::default())
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Score one record.
    ///
    /// No retries: the call is deterministic, so a second attempt with the
    /// same record cannot change the outcome.
    pub fn score(&self, record: &FeatureRecord) -> Result<RiskAssessment, ScoringError> {
        record.validate()?;

        let raw = self.classifier.predict_probability(record)?;

        if !(0.0..=1.0).contains(&raw) {
            log::warn!(
                "Classifier {} broke its contract: returned {}",
                self.classifier.name(),
                raw
            );
            return Err(ScoringError::ClassifierContract { value: raw });
        }

        let assessment = RiskAssessment {
            raw_probability: raw,
            display_probability: self.threshold.recalibrate(raw),
            is_high_risk: self.threshold.is_high_risk(raw),
            threshold: self.threshold.value(),
        };

        log::debug!(
            "Scored record {}: raw={:.4} display={:.4} high_risk={}",
            record.to_log_entry(),
            assessment.raw_probability,
            assessment.display_probability,
            assessment.is_high_risk
        );

        Ok(assessment)
    }
}
