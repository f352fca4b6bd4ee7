//! # Glycosense
//!
//! Diabetes risk prediction served over HTTP.
//!
//! A request record is encoded into a fixed-order feature vector, scored by a
//! random forest and a feed-forward network, and the two outputs are averaged
//! into a single `Diabetes` / `No Diabetes` label.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (patient features, encodings, labels)
//! - `ports`: Trait definitions for the two classifiers
//! - `adapters`: Concrete implementations (model artifacts, HTTP, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Layered runtime configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{DiagnosisLabel, EnsembleOutcome, FeatureVector, PatientFeatures, TieBreak};

/// Result type for Glycosense operations
pub type Result<T> = std::result::Result<T, GlycosenseError>;

/// Main error type for Glycosense
#[derive(Debug, thiserror::Error)]
pub enum GlycosenseError {
    #[error("Invalid input: {0}")]
    Encode(#[from] domain::EncodeError),

    #[error("Model error: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Inference task failed: {0}")]
    Task(String),
}

impl GlycosenseError {
    /// Short category name, safe to log without echoing request content.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Encode(_) => "encode",
            Self::Model(_) => "model",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Task(_) => "task",
        }
    }
}
