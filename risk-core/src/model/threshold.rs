//! Operating Threshold & Display Recalibration
//!
//! The classifier's operating point (a Youden-index cut) sits at 0.3396 in
//! raw-probability space. For display, raw probabilities are rescaled with a
//! two-segment linear map so that the operating point lands on exactly 0.5:
//!
//! ```text
//!   raw:      0 ─────────── t ─────────────────── 1
//!   display:  0 ─────────── 0.5 ───────────────── 1
//! ```
//!
//! The result is an interpretive score, not a calibrated probability. The
//! raw probability stays the statistically meaningful number.

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

/// Youden-index operating point of the trained classifier
pub const DEFAULT_THRESHOLD: f64 = 0.3396;

/// Display score the operating point maps to
pub const DISPLAY_MIDPOINT: f64 = 0.5;

/// Validated operating threshold, strictly inside (0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    /// Fails with `InvalidThreshold` unless `0 < value < 1`.
    ///
    /// Either segment of the recalibration divides by `t` or `1 - t`, so the
    /// check happens once here instead of on every call.
    pub fn new(value: f64) -> Result<Self, ScoringError> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Ok(Self(value))
        } else {
            Err(ScoringError::InvalidThreshold { value })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Map a raw probability onto the display scale.
    ///
    /// `raw` is expected in [0, 1]; the scorer rejects anything else before
    /// calling this.
    pub fn recalibrate(self, raw: f64) -> f64 {
        let t = self.0;
        if raw < t {
            (raw / t) * DISPLAY_MIDPOINT
        } else {
            DISPLAY_MIDPOINT + ((raw - t) / (1.0 - t)) * DISPLAY_MIDPOINT
        }
    }

    /// High risk iff the display score is strictly above 0.5.
    ///
    /// Evaluated in raw space: `raw > t` is the same predicate, and it does
    /// not lose a raw value a few ulps above `t` to rounding in the rescale.
    /// `raw == t` is low risk.
    pub fn is_high_risk(self, raw: f64) -> bool {
        raw > self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = ScoringError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(t: Threshold) -> Self {
        t.0
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_default_is_youden_cut() {
        assert_eq!(Threshold::default().value(), 0.3396);
    }

    #[test]
    fn test_degenerate_thresholds_rejected() {
        for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(Threshold::new(bad), Err(ScoringError::InvalidThreshold { .. })),
                "{} should be rejected",
                bad
            );
        }
        assert!(Threshold::new(0.01).is_ok());
        assert!(Threshold::new(0.99).is_ok());
    }

    #[test]
    fn test_endpoints_and_center() {
        let t = Threshold::default();
        assert_eq!(t.recalibrate(0.0), 0.0);
        assert_eq!(t.recalibrate(1.0), 1.0);
        assert!((t.recalibrate(0.3396) - 0.5).abs() < TOL);
    }

    #[test]
    fn test_continuous_at_threshold() {
        let t = Threshold::default();
        let below = t.recalibrate(0.3396 - 1e-12);
        let above = t.recalibrate(0.3396 + 1e-12);
        assert!((below - 0.5).abs() < 1e-9);
        assert!((above - 0.5).abs() < 1e-9);
        assert!(below < 0.5 && above > 0.5);
    }

    #[test]
    fn test_monotonic_and_in_range() {
        let t = Threshold::default();
        let mut previous = -1.0;
        for i in 0..=10_000 {
            let raw = i as f64 / 10_000.0;
            let display = t.recalibrate(raw);
            assert!((0.0..=1.0).contains(&display), "display({}) = {}", raw, display);
            assert!(display >= previous, "not monotonic at raw = {}", raw);
            previous = display;
        }
    }

    #[test]
    fn test_other_thresholds_still_centered() {
        for value in [0.05, 0.25, 0.5, 0.8, 0.95] {
            let t = Threshold::new(value).unwrap();
            assert!((t.recalibrate(value) - 0.5).abs() < TOL);
            assert_eq!(t.recalibrate(0.0), 0.0);
            assert!((t.recalibrate(1.0) - 1.0).abs() < TOL);
        }
    }

    #[test]
    fn test_strict_tie_break() {
        let t = Threshold::default();
        assert!(!t.is_high_risk(0.3396));
        assert!(t.is_high_risk(0.3396 + f64::EPSILON));
        assert!(!t.is_high_risk(0.0));
        assert!(t.is_high_risk(1.0));
    }

    #[test]
    fn test_one_ulp_above_threshold_is_high_at_rounded_midpoint() {
        let t = Threshold::default();
        let raw = f64::from_bits(DEFAULT_THRESHOLD.to_bits() + 1);
        assert!(raw > DEFAULT_THRESHOLD);

        // The rescale rounds back to the midpoint; the verdict follows raw
        assert_eq!(t.recalibrate(raw), 0.5);
        assert!(t.is_high_risk(raw));
    }

    #[test]
    fn test_serde_validates() {
        let t: Threshold = serde_json::from_str("0.42").unwrap();
        assert_eq!(t.value(), 0.42);
        assert!(serde_json::from_str::<Threshold>("1.0").is_err());
        assert_eq!(serde_json::to_string(&Threshold::default()).unwrap(), "0.3396");
    }
}
