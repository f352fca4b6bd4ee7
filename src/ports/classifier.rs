//! Classifier ports: Traits for the two pre-trained models.
//!
//! The tree ensemble votes a class, the network produces a probability.
//! Both are loaded once at startup and only read afterwards, so every
//! implementation must be `Send + Sync` and free of interior mutation.

use crate::domain::FeatureVector;

/// Errors raised while loading or running a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model artifact {path} could not be read: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact {path} is not valid JSON: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("incompatible model: {0}")]
    Incompatible(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// A classifier that votes a hard class label (0 or 1).
pub trait ClassPredictor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Predict the class of a single sample.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` if the model cannot score the sample.
    fn predict_class(&self, features: &FeatureVector) -> Result<u8, ModelError>;
}

/// A classifier that outputs the probability of the positive class.
pub trait ProbabilityScorer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Score a single sample. Implementations return the first output unit.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` if the model cannot score the sample.
    fn score(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}
