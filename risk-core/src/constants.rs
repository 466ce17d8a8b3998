//! Central Configuration Constants
//!
//! Single source of truth for defaults. The operating threshold is not
//! configurable at runtime; see `model::threshold`.

/// Default model artifact path, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "xgb_model.json";

/// Library version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Product name
pub const APP_NAME: &str = "AECOPD Hypoalbuminemia Risk Calculator";

/// Target population shown alongside results
pub const TARGET_POPULATION: &str = "Elderly Patients with AECOPD";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get model artifact path from environment or use default
pub fn get_model_path() -> String {
    std::env::var("ALBUMIN_MODEL_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string())
}

/// Get the expected artifact SHA-256 from environment, if pinned
pub fn get_model_sha256() -> Option<String> {
    std::env::var("ALBUMIN_MODEL_SHA256")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
