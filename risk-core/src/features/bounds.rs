//! Input boundary helpers
//!
//! Domain enforcement lives in front of the assembler. Hosts pick a policy:
//! reject out-of-domain values (the HTTP host does this with `validator`
//! rules mirroring `FEATURE_SPECS`), or clamp them into the domain the way a
//! bounded number input would.

use serde::{Deserialize, Serialize};

use super::layout::{FeatureKind, FEATURE_LAYOUT, FEATURE_SPECS};
use super::record::ClinicalInputs;

/// What the input boundary does with a value outside its domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
    #[default]
    Reject,
    Clamp,
}

impl std::str::FromStr for BoundsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(BoundsPolicy::Reject),
            "clamp" => Ok(BoundsPolicy::Clamp),
            other => Err(format!("unknown bounds policy `{}`", other)),
        }
    }
}

/// Clamp every present, finite value into its domain.
///
/// Integer columns are rounded to the nearest whole number first.
pub fn clamp_to_domain(inputs: &ClinicalInputs) -> ClinicalInputs {
    let mut clamped = *inputs;

    for (i, spec) in FEATURE_SPECS.iter().enumerate() {
        let slot = clamped.slot_mut(i);
        if let Some(value) = slot.filter(|v| v.is_finite()) {
            let value = match spec.kind {
                FeatureKind::Integer => value.round(),
                FeatureKind::Float => value,
            };
            let bounded = value.clamp(spec.min, spec.max);
            if bounded != value {
                log::debug!("Clamped {} from {} to {}", FEATURE_LAYOUT[i], value, bounded);
            }
            *slot = Some(bounded);
        }
    }

    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_bounds() {
        let defaults = ClinicalInputs::form_defaults();
        assert_eq!(clamp_to_domain(&defaults), defaults);
    }

    #[test]
    fn test_clamp() {
        let inputs = ClinicalInputs {
            mg: Some(-1.0),
            hct: Some(95.0),
            age: Some(17.6),
            inr: None,
            ..ClinicalInputs::form_defaults()
        };

        let clamped = clamp_to_domain(&inputs);
        assert_eq!(clamped.mg, Some(0.0));
        assert_eq!(clamped.hct, Some(70.0));
        assert_eq!(clamped.age, Some(18.0));
        assert_eq!(clamped.inr, None);
        assert_eq!(clamped.alt, Some(25.0));
    }

    #[test]
    fn test_clamp_leaves_non_finite_values_for_the_assembler() {
        let inputs = ClinicalInputs {
            che: Some(f64::NAN),
            ..ClinicalInputs::form_defaults()
        };
        assert!(clamp_to_domain(&inputs).che.is_some_and(f64::is_nan));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Clamp".parse::<BoundsPolicy>(), Ok(BoundsPolicy::Clamp));
        assert_eq!(" reject ".parse::<BoundsPolicy>(), Ok(BoundsPolicy::Reject));
        assert!("ignore".parse::<BoundsPolicy>().is_err());
    }
}
