//! Features Module - Feature Assembler
//!
//! Turns the eight collected clinical values into the fixed-schema record the
//! classifier was trained on.
//! - `layout` - column names, order, units and domains
//! - `record` - `FeatureRecord`, `ClinicalInputs` and the assembler
//! - `bounds` - input-boundary helpers (reject or clamp out-of-domain values)

pub mod bounds;
pub mod layout;
pub mod record;

// Re-export common types
pub use bounds::{clamp_to_domain, BoundsPolicy};
pub use layout::{
    feature_index, layout_hash, FeatureKind, FeatureSpec, LayoutInfo, LayoutMismatchError,
    FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_SPECS, FEATURE_VERSION,
};
pub use record::{assemble, ClinicalInputs, FeatureRecord, FeatureRecordBuilder};
