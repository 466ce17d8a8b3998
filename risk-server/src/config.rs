//! Configuration module

use std::env;
use std::str::FromStr;

use albumin_risk_core::constants;
use albumin_risk_core::features::BoundsPolicy;
use albumin_risk_core::ReportLocale;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Classifier artifact (`.json` or `.onnx`)
    pub model_path: String,

    /// Expected SHA-256 of the artifact; unchecked when absent
    pub model_sha256: Option<String>,

    /// Server port
    pub port: u16,

    /// What the input boundary does with out-of-domain values
    pub bounds_policy: BoundsPolicy,

    /// Label language of rendered reports
    pub report_locale: ReportLocale,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            model_path: env::var("MODEL_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(constants::get_model_path),

            model_sha256: env::var("MODEL_SHA256")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .or_else(constants::get_model_sha256),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            bounds_policy: parse_or_default("BOUNDS_POLICY"),

            report_locale: parse_or_default("REPORT_LOCALE"),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: constants::DEFAULT_MODEL_PATH.to_string(),
            model_sha256: None,
            port: 8080,
            bounds_policy: BoundsPolicy::default(),
            report_locale: ReportLocale::default(),
            environment: "development".to_string(),
        }
    }
}

fn parse_or_default<T>(key: &str) -> T
where
    T: FromStr<Err = String> + Default,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Ignoring {}: {}", key, e);
            T::default()
        }),
        Err(_) => T::default(),
    }
}
