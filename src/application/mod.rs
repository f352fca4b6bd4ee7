//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the prediction pipeline.

pub mod encoder;
mod inference;
mod predictor;

pub use encoder::{encode, encode_vector};
pub use inference::InferenceService;
pub use predictor::EnsemblePredictor;
