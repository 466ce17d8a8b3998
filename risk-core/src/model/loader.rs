//! Model Loader - artifact discovery, integrity and normalization
//!
//! Loads the classifier artifact exactly once at process start. Any failure
//! here is fatal to startup: the caller reports it and exits, it never
//! retries.
//!
//! ## Container contract
//! The training pipeline sometimes persisted the model inside a one-element
//! list. JSON artifacts are therefore accepted either as a bare model
//! document or as a single-element array holding one; any other array length
//! is `ContainerShape`. ONNX artifacts are always bare.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::classifier::Classifier;
use super::trees::TreeEnsemble;
use crate::error::ModelLoadError;
use crate::features::{layout_hash, FEATURE_VERSION};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Artifact encoding, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// XGBoost `save_model` JSON
    XgboostJson,
    /// ONNX graph
    Onnx,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Result<Self, ModelLoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "json" => Ok(ModelFormat::XgboostJson),
            "onnx" => Ok(ModelFormat::Onnx),
            other => Err(ModelLoadError::UnsupportedFormat(format!(
                "unrecognized extension `{}` ({})",
                other,
                path.display()
            ))),
        }
    }
}

/// Model metadata
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub format: ModelFormat,
    pub backend: String,
    pub sha256: String,
    /// Number of trees, for tree ensembles
    pub tree_count: Option<usize>,
    /// Trees used for prediction; below `tree_count` for early-stopped models
    pub active_tree_count: Option<usize>,
    /// True when the artifact was a single-element container
    pub unwrapped_container: bool,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub loaded_at: DateTime<Utc>,
}

/// A ready-to-use classifier plus what is known about where it came from
#[derive(Clone)]
pub struct LoadedModel {
    pub classifier: Arc<dyn Classifier>,
    pub metadata: ModelMetadata,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("classifier", &self.classifier.name())
            .field("metadata", &self.metadata)
            .finish()
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Loads a classifier artifact from disk
#[derive(Debug, Clone)]
pub struct ModelLoader {
    path: PathBuf,
    expected_sha256: Option<String>,
}

impl ModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected_sha256: None,
        }
    }

    /// Require the artifact's SHA-256 to equal `hex_digest` (case-insensitive)
    pub fn expect_sha256(mut self, hex_digest: impl Into<String>) -> Self {
        self.expected_sha256 = Some(hex_digest.into().trim().to_ascii_lowercase());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LoadedModel, ModelLoadError> {
        log::info!("Loading model from: {}", self.path.display());

        if !self.path.exists() {
            return Err(ModelLoadError::NotFound(self.path.clone()));
        }

        let format = ModelFormat::from_path(&self.path)?;

        let bytes = std::fs::read(&self.path).map_err(|source| ModelLoadError::Io {
            path: self.path.clone(),
            source,
        })?;

        let sha256 = verify_checksum(&bytes, self.expected_sha256.as_deref())?;

        let (classifier, trees, unwrapped_container) = match format {
            ModelFormat::XgboostJson => {
                let (document, unwrapped) =
                    normalize_container(serde_json::from_slice(&bytes)?)?;
                let ensemble = TreeEnsemble::from_document(document)?;
                let trees = (ensemble.tree_count(), ensemble.active_tree_count());
                let classifier: Arc<dyn Classifier> = Arc::new(ensemble);
                (classifier, Some(trees), unwrapped)
            }
            ModelFormat::Onnx => (load_onnx(&bytes)?, None, false),
        };

        if let Some((stored, active)) = trees.filter(|(stored, active)| active < stored) {
            log::info!("Early-stopped model: using {} of {} trees", active, stored);
        }

        let metadata = ModelMetadata {
            model_path: self.path.display().to_string(),
            format,
            backend: classifier.name().to_string(),
            sha256,
            tree_count: trees.map(|(stored, _)| stored),
            active_tree_count: trees.map(|(_, active)| active),
            unwrapped_container,
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            loaded_at: Utc::now(),
        };

        log::info!(
            "Model loaded successfully ({}, sha256 {})",
            metadata.backend,
            metadata.sha256
        );

        Ok(LoadedModel {
            classifier,
            metadata,
        })
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(bytes: &[u8]) -> Result<Arc<dyn Classifier>, ModelLoadError> {
    Ok(Arc::new(super::onnx::OnnxClassifier::from_bytes(bytes)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(_bytes: &[u8]) -> Result<Arc<dyn Classifier>, ModelLoadError> {
    Err(ModelLoadError::UnsupportedFormat(
        "ONNX support not compiled in (enable the `onnx` feature)".to_string(),
    ))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compute the artifact digest and compare it with the expected one, if any
pub fn verify_checksum(bytes: &[u8], expected: Option<&str>) -> Result<String, ModelLoadError> {
    let actual = sha256_hex(bytes);

    if let Some(expected) = expected {
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(ModelLoadError::ChecksumMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
        log::debug!("Model checksum verified");
    }

    Ok(actual)
}

/// Accept a bare document or a single-element array holding one.
///
/// Returns the document and whether it had to be unwrapped.
pub fn normalize_container(
    value: serde_json::Value,
) -> Result<(serde_json::Value, bool), ModelLoadError> {
    match value {
        serde_json::Value::Array(mut items) => {
            if items.len() != 1 {
                return Err(ModelLoadError::ContainerShape(items.len()));
            }
            log::debug!("Unwrapping single-element model container");
            Ok((items.remove(0), true))
        }
        document @ serde_json::Value::Object(_) => Ok((document, false)),
        other => Err(ModelLoadError::Parse(format!(
            "expected a model object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::trees::tests::stump_model;
    use std::io::Write;

    fn write_artifact(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_bare_document() {
        let (_dir, path) = write_artifact("xgb_model.json", &stump_model().to_string());

        let loaded = ModelLoader::new(&path).load().unwrap();
        assert_eq!(loaded.metadata.format, ModelFormat::XgboostJson);
        assert_eq!(loaded.metadata.tree_count, Some(2));
        assert_eq!(loaded.metadata.active_tree_count, Some(2));
        assert!(!loaded.metadata.unwrapped_container);
        assert_eq!(loaded.classifier.name(), "xgboost-json");
    }

    #[test]
    fn test_load_single_element_container() {
        let wrapped = serde_json::Value::Array(vec![stump_model()]);
        let (_dir, path) = write_artifact("xgb_model.json", &wrapped.to_string());

        let loaded = ModelLoader::new(&path).load().unwrap();
        assert!(loaded.metadata.unwrapped_container);
    }

    #[test]
    fn test_other_container_shapes_fail() {
        for items in [vec![], vec![stump_model(), stump_model()]] {
            let len = items.len();
            let body = serde_json::Value::Array(items).to_string();
            let (_dir, path) = write_artifact("xgb_model.json", &body);
            match ModelLoader::new(&path).load() {
                Err(ModelLoadError::ContainerShape(n)) => assert_eq!(n, len),
                other => panic!("expected ContainerShape, got {:?}", other),
            }
        }

        let (_dir, path) = write_artifact("xgb_model.json", "\"model\"");
        assert!(matches!(ModelLoader::new(&path).load(), Err(ModelLoadError::Parse(_))));
    }

    #[test]
    fn test_early_stopped_model_metadata() {
        let mut doc = stump_model();
        doc["learner"]["attributes"] = serde_json::json!({ "best_iteration": "0" });
        let (_dir, path) = write_artifact("xgb_model.json", &doc.to_string());

        let loaded = ModelLoader::new(&path).load().unwrap();
        assert_eq!(loaded.metadata.tree_count, Some(2));
        assert_eq!(loaded.metadata.active_tree_count, Some(1));
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn test_corrupt_onnx_artifact() {
        let (_dir, path) = write_artifact("xgb_model.onnx", "definitely not a protobuf graph");
        assert!(matches!(
            ModelLoader::new(&path).load(),
            Err(ModelLoadError::Onnx(_))
        ));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_needs_feature() {
        let (_dir, path) = write_artifact("xgb_model.onnx", "graph");
        assert!(matches!(
            ModelLoader::new(&path).load(),
            Err(ModelLoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelLoader::new(dir.path().join("xgb_model.json")).load();
        assert!(matches!(result, Err(ModelLoadError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_artifact() {
        let (_dir, path) = write_artifact("xgb_model.json", "{\"learner\": ");
        assert!(matches!(ModelLoader::new(&path).load(), Err(ModelLoadError::Parse(_))));
    }

    #[test]
    fn test_unknown_extension() {
        let (_dir, path) = write_artifact("xgb_model.pkl", "not a pickle");
        assert!(matches!(
            ModelLoader::new(&path).load(),
            Err(ModelLoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_checksum() {
        let body = stump_model().to_string();
        let digest = sha256_hex(body.as_bytes());
        let (_dir, path) = write_artifact("xgb_model.json", &body);

        let loaded = ModelLoader::new(&path)
            .expect_sha256(digest.to_uppercase())
            .load()
            .unwrap();
        assert_eq!(loaded.metadata.sha256, digest);

        let result = ModelLoader::new(&path).expect_sha256("00".repeat(32)).load();
        assert!(matches!(result, Err(ModelLoadError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
