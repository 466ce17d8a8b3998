//! Feature Layout - Centralized Feature Definition
//!
//! **CRITICAL: This file controls the feature schema**
//!
//! The classifier was trained on exactly these eight columns in exactly this
//! order. It performs no schema validation of its own, so a reordered or
//! renamed column silently produces a meaningless probability.
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Total number of features
pub const FEATURE_COUNT: usize = 8;

/// Feature names in exact order they appear in the record
pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    "Mg",     // 0: Serum magnesium
    "ALT",    // 1: Alanine aminotransferase
    "AG",     // 2: Anion gap
    "CHE",    // 3: Cholinesterase
    "HCT",    // 4: Hematocrit
    "INR",    // 5: International normalized ratio
    "hs_CRP", // 6: High-sensitivity C-reactive protein
    "Age",    // 7: Age in whole years
];

/// Value kind of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Float,
    Integer,
}

/// Unit, kind and accepted domain of one feature column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub unit: &'static str,
    pub kind: FeatureKind,
    pub min: f64,
    pub max: f64,
    /// Value pre-filled on the input form
    pub default: f64,
}

impl FeatureSpec {
    /// Whether `value` lies inside the closed domain `[min, max]`
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    const fn float(
        name: &'static str,
        unit: &'static str,
        min: f64,
        max: f64,
        default: f64,
    ) -> Self {
        Self {
            name,
            unit,
            kind: FeatureKind::Float,
            min,
            max,
            default,
        }
    }

    const fn integer(
        name: &'static str,
        unit: &'static str,
        min: f64,
        max: f64,
        default: f64,
    ) -> Self {
        Self {
            kind: FeatureKind::Integer,
            ..Self::float(name, unit, min, max, default)
        }
    }
}

/// Domain of every feature, indexed like FEATURE_LAYOUT
pub const FEATURE_SPECS: [FeatureSpec; FEATURE_COUNT] = [
    // name, unit, min, max, form default
    FeatureSpec::float("Mg", "mmol/L", 0.0, 5.0, 0.85),
    FeatureSpec::float("ALT", "U/L", 0.0, 500.0, 25.0),
    FeatureSpec::float("AG", "mmol/L", 0.0, 50.0, 12.0),
    FeatureSpec::float("CHE", "U/L", 100.0, 20000.0, 5000.0),
    FeatureSpec::float("HCT", "%", 10.0, 70.0, 40.0),
    FeatureSpec::float("INR", "", 0.0, 10.0, 1.1),
    FeatureSpec::float("hs_CRP", "mg/L", 0.0, 300.0, 10.0),
    FeatureSpec::integer("Age", "years", 18.0, 110.0, 75.0),
];

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
/// Used to detect layout mismatches at runtime
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

/// Get layout hash
pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub features: Vec<FeatureSpec>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            features: FEATURE_SPECS.to_vec(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when feature layout doesn't match expected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), \
     got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Validate that incoming data matches current layout
pub fn validate_layout(
    incoming_version: u8,
    incoming_hash: u32,
) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

/// Check that a list of column names is exactly FEATURE_LAYOUT, in order
pub fn matches_layout<S: AsRef<str>>(names: &[S]) -> bool {
    names.len() == FEATURE_COUNT
        && names
            .iter()
            .zip(FEATURE_LAYOUT.iter())
            .all(|(a, b)| a.as_ref() == *b)
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

/// Get feature spec by name
pub fn feature_spec(name: &str) -> Option<&'static FeatureSpec> {
    feature_index(name).map(|i| &FEATURE_SPECS[i])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specs_follow_layout() {
        for (spec, name) in FEATURE_SPECS.iter().zip(FEATURE_LAYOUT.iter()) {
            assert_eq!(spec.name, *name);
            assert!(spec.min < spec.max);
            assert!(spec.contains(spec.default), "default of {} out of domain", spec.name);
        }
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(compute_layout_hash(), compute_layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
        assert!(validate_layout(FEATURE_VERSION + 1, layout_hash()).is_err());

        let err = validate_layout(FEATURE_VERSION, layout_hash() ^ 1).unwrap_err();
        assert_eq!(err.expected_hash, layout_hash());
    }

    #[test]
    fn test_matches_layout() {
        assert!(matches_layout(&FEATURE_LAYOUT));

        let mut swapped = FEATURE_LAYOUT;
        swapped.swap(0, 1);
        assert!(!matches_layout(&swapped));
        assert!(!matches_layout(&FEATURE_LAYOUT[..7]));
    }

    #[test]
    fn test_feature_index() {
        assert_eq!(feature_index("Mg"), Some(0));
        assert_eq!(feature_index("INR"), Some(5));
        assert_eq!(feature_index("Age"), Some(7));
        assert_eq!(feature_index("hs-CRP"), None);
        assert_eq!(feature_name(6), Some("hs_CRP"));
        assert_eq!(feature_name(8), None);
    }

    #[test]
    fn test_age_is_integer() {
        assert_eq!(feature_spec("Age").map(|s| s.kind), Some(FeatureKind::Integer));
        assert_eq!(feature_spec("CHE").map(|s| s.min), Some(100.0));
    }
}
