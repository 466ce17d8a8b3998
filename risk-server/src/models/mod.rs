//! Request / response models

pub mod assessment;

pub use assessment::{AssessRequest, AssessResponse, ModelInfoResponse};
