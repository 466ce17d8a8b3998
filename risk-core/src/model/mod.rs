//! Model Module - classifier capability, backends and loading
//!
//! Keeps inference apart from scoring: the scorer only sees `Classifier`.
//! - `classifier` - the capability trait
//! - `trees` - XGBoost JSON tree ensemble backend
//! - `onnx` - ONNX Runtime backend (feature `onnx`)
//! - `loader` - artifact loading, checksum, container normalization
//! - `threshold` - operating threshold and display recalibration

pub mod classifier;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod threshold;
pub mod trees;

// Re-export common types
pub use classifier::{Classifier, POSITIVE_CLASS};
pub use loader::{LoadedModel, ModelFormat, ModelLoader, ModelMetadata};
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
pub use threshold::{Threshold, DEFAULT_THRESHOLD};
pub use trees::TreeEnsemble;
