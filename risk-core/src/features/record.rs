//! Feature Record - the classifier's input row
//!
//! **Versioned record with layout validation**
//!
//! A `FeatureRecord` can only be obtained through the assembler (or the
//! builder / `from_named` / `from_parts`, which run the same checks), so every
//! record in circulation holds eight finite values in layout order.

use serde::{Deserialize, Serialize};

use super::layout::{
    feature_index, layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT,
    FEATURE_LAYOUT, FEATURE_SPECS, FEATURE_VERSION,
};
use crate::error::ScoringError;

// ============================================================================
// CLINICAL INPUTS
// ============================================================================

/// The eight named values as collected from the caller.
///
/// Every field is optional so that an absent value reaches the assembler and
/// is rejected there instead of being silently defaulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalInputs {
    #[serde(rename = "Mg")]
    pub mg: Option<f64>,
    #[serde(rename = "ALT")]
    pub alt: Option<f64>,
    #[serde(rename = "AG")]
    pub ag: Option<f64>,
    #[serde(rename = "CHE")]
    pub che: Option<f64>,
    #[serde(rename = "HCT")]
    pub hct: Option<f64>,
    #[serde(rename = "INR")]
    pub inr: Option<f64>,
    #[serde(rename = "hs_CRP")]
    pub hs_crp: Option<f64>,
    #[serde(rename = "Age")]
    pub age: Option<f64>,
}

impl ClinicalInputs {
    /// Values pre-filled on the input form
    pub fn form_defaults() -> Self {
        let mut inputs = Self::default();
        for (i, spec) in FEATURE_SPECS.iter().enumerate() {
            *inputs.slot_mut(i) = Some(spec.default);
        }
        inputs
    }

    /// Values in layout order
    pub fn slots(&self) -> [Option<f64>; FEATURE_COUNT] {
        [
            self.mg, self.alt, self.ag, self.che, self.hct, self.inr, self.hs_crp, self.age,
        ]
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Option<f64> {
        match index {
            0 => &mut self.mg,
            1 => &mut self.alt,
            2 => &mut self.ag,
            3 => &mut self.che,
            4 => &mut self.hct,
            5 => &mut self.inr,
            6 => &mut self.hs_crp,
            _ => &mut self.age,
        }
    }

    /// Package these inputs into a `FeatureRecord`
    pub fn assemble(&self) -> Result<FeatureRecord, ScoringError> {
        assemble(self)
    }
}

// ============================================================================
// ASSEMBLER
// ============================================================================

/// Build a `FeatureRecord` from the collected inputs.
///
/// Fails with `InvalidFeature` on the first missing or non-finite field.
/// Domain bounds are not checked here.
pub fn assemble(inputs: &ClinicalInputs) -> Result<FeatureRecord, ScoringError> {
    let mut values = [0.0f64; FEATURE_COUNT];

    for (i, slot) in inputs.slots().into_iter().enumerate() {
        let name = FEATURE_LAYOUT[i];
        let value = slot.ok_or_else(|| ScoringError::invalid_feature(name, "missing value"))?;
        values[i] = check_finite(name, value)?;
    }

    log::debug!("Assembled feature record: {:?}", values);

    Ok(FeatureRecord::from_checked(values))
}

fn check_finite(name: &str, value: f64) -> Result<f64, ScoringError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScoringError::invalid_feature(
            name,
            format!("value {} is not a finite number", value),
        ))
    }
}

// ============================================================================
// VERSIONED FEATURE RECORD
// ============================================================================

/// Fixed-schema ordered record consumed by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRecord {
    version: u8,
    layout_hash: u32,
    values: [f64; FEATURE_COUNT],
}

impl FeatureRecord {
    fn from_checked(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Build from name/value pairs, e.g. a decoded JSON object.
    ///
    /// Unknown names, duplicates, missing names and non-finite values are
    /// all `InvalidFeature`.
    pub fn from_named<'a, I>(pairs: I) -> Result<Self, ScoringError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut inputs = ClinicalInputs::default();

        for (name, value) in pairs {
            let index = feature_index(name)
                .ok_or_else(|| ScoringError::invalid_feature(name, "unknown feature"))?;
            let slot = inputs.slot_mut(index);
            if slot.is_some() {
                return Err(ScoringError::invalid_feature(name, "duplicate value"));
            }
            *slot = Some(value);
        }

        assemble(&inputs)
    }

    /// Rebuild a record received from elsewhere, keeping its layout stamp.
    ///
    /// Values are checked for finiteness; the stamp is checked by `validate`.
    pub fn from_parts(
        version: u8,
        layout_hash: u32,
        values: [f64; FEATURE_COUNT],
    ) -> Result<Self, ScoringError> {
        for (name, value) in FEATURE_LAYOUT.iter().zip(values) {
            check_finite(name, value)?;
        }
        Ok(Self {
            version,
            layout_hash,
            values,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn layout_hash(&self) -> u32 {
        self.layout_hash
    }

    /// Get values in layout order
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Values narrowed to f32, the precision tree models and ONNX graphs use
    pub fn to_f32(&self) -> [f32; FEATURE_COUNT] {
        self.values.map(|v| v as f32)
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        feature_index(name).and_then(|i| self.get(i))
    }

    /// Validate that this record is compatible with current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "values": self.values,
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

// ============================================================================
// BUILDER PATTERN
// ============================================================================

/// Builder for creating a FeatureRecord with named setters
#[derive(Debug, Clone, Default)]
pub struct FeatureRecordBuilder {
    inputs: ClinicalInputs,
}

impl FeatureRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the form defaults
    pub fn from_defaults() -> Self {
        Self {
            inputs: ClinicalInputs::form_defaults(),
        }
    }

    pub fn mg(mut self, value: f64) -> Self {
        self.inputs.mg = Some(value);
        self
    }

    pub fn alt(mut self, value: f64) -> Self {
        self.inputs.alt = Some(value);
        self
    }

    pub fn ag(mut self, value: f64) -> Self {
        self.inputs.ag = Some(value);
        self
    }

    pub fn che(mut self, value: f64) -> Self {
        self.inputs.che = Some(value);
        self
    }

    pub fn hct(mut self, value: f64) -> Self {
        self.inputs.hct = Some(value);
        self
    }

    pub fn inr(mut self, value: f64) -> Self {
        self.inputs.inr = Some(value);
        self
    }

    pub fn hs_crp(mut self, value: f64) -> Self {
        self.inputs.hs_crp = Some(value);
        self
    }

    pub fn age(mut self, years: u32) -> Self {
        self.inputs.age = Some(f64::from(years));
        self
    }

    /// Set feature by name; unknown names are ignored
    pub fn set(mut self, name: &str, value: f64) -> Self {
        if let Some(index) = feature_index(name) {
            *self.inputs.slot_mut(index) = Some(value);
        }
        self
    }

    /// Remove a value so it reaches the assembler as missing
    pub fn clear(mut self, name: &str) -> Self {
        if let Some(index) = feature_index(name) {
            *self.inputs.slot_mut(index) = None;
        }
        self
    }

    pub fn inputs(&self) -> &ClinicalInputs {
        &self.inputs
    }

    pub fn build(self) -> Result<FeatureRecord, ScoringError> {
        assemble(&self.inputs)
    }
}

// ============================================================================
// TESTS
// ============================================================================
