//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! The feature order shared by the encoder and the model artifacts is
//! defined exactly once, in `patient`.

mod diagnosis;
mod encoding;
mod patient;

pub use diagnosis::{DiagnosisLabel, EnsembleOutcome, TieBreak};
pub use encoding::{encode_gender, encode_yes_no, EncodeError, Ethnicity};
pub use patient::{Feature, FeatureVector, PatientFeatures, FEATURE_COUNT, FEATURE_NAMES};
