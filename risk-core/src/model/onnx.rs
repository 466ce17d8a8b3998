//! ONNX Backend - ONNX Runtime Integration
//!
//! Runs a classifier exported to ONNX (e.g. XGBoost via onnxmltools).
//! Expected graph: one float32 input of shape `[N, 8]`, and a float32
//! `probabilities` output of shape `[N, 2]`. When no output carries that
//! name, the last output is used.

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::classifier::Classifier;
use crate::error::{InferenceError, ModelLoadError};
use crate::features::{FeatureRecord, FEATURE_COUNT};

/// Output name onnxmltools / skl2onnx give the class-probability tensor
const PROBABILITY_OUTPUT: &str = "probabilities";

/// ONNX classifier session
///
/// The runtime needs exclusive access for a run, so the session sits behind
/// a mutex. Nothing about the model changes after loading.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_name: String,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self, ModelLoadError> {
        log::info!("Loading ONNX model from memory ({} bytes)", model_bytes.len());

        let session = Session::builder()
            .map_err(|e| ModelLoadError::Onnx(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelLoadError::Onnx(format!("Failed to set optimization: {}", e)))?
            .commit_from_memory(model_bytes)
            .map_err(|e| ModelLoadError::Onnx(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == PROBABILITY_OUTPUT)
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelLoadError::Onnx("No output defined".to_string()))?;

        log::info!("ONNX model loaded, reading output `{}`", output_name);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, record: &FeatureRecord) -> Result<[f64; 2], InferenceError> {
        let input_array =
            Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), record.to_f32().to_vec())
                .map_err(|e| InferenceError(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError(format!("Missing output `{}`", self.output_name)))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        match data {
            [negative, positive, ..] => Ok([f64::from(*negative), f64::from(*positive)]),
            _ => Err(InferenceError(format!(
                "expected two class probabilities, got {} values",
                data.len()
            ))),
        }
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
