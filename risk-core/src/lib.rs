//! AECOPD Hypoalbuminemia Risk - Core Library
//!
//! Scores the risk of hypoalbuminemia for an elderly patient with an acute
//! exacerbation of COPD from eight laboratory/demographic values.
//!
//! ```text
//! ClinicalInputs ──assemble──▶ FeatureRecord ──RiskScorer──▶ RiskAssessment ──▶ RiskReport
//!                                                  │
//!                                        Arc<dyn Classifier>  (ModelLoader, once)
//! ```
//!
//! ## Modules
//! - `features/` - feature layout and the assembler
//! - `model/` - classifier capability, backends, loader, threshold
//! - `scoring/` - the scorer and `RiskAssessment`
//! - `report` - presentation of an assessment

pub mod constants;
pub mod error;
pub mod features;
pub mod model;
pub mod report;
pub mod scoring;

pub use error::{InferenceError, ModelLoadError, ScoringError};
pub use features::{assemble, ClinicalInputs, FeatureRecord, FeatureRecordBuilder};
pub use model::{Classifier, LoadedModel, ModelLoader, Threshold, DEFAULT_THRESHOLD};
pub use report::{ReportLocale, RiskLevel, RiskReport};
pub use scoring::{RiskAssessment, RiskScorer};
