//! Inference service: request record in, diagnosis label out.
//!
//! This service coordinates:
//! - Feature encoding of the raw record
//! - Ensemble scoring over the shared models
//! - Outcome logging (label and model outputs only, never raw features)

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use super::encoder;
use super::predictor::EnsemblePredictor;
use crate::domain::{EnsembleOutcome, TieBreak};
use crate::ports::{ClassPredictor, ProbabilityScorer};
use crate::GlycosenseError;

/// Service running the full prediction pipeline for one record.
///
/// Holds only immutable, shared state. Cloning an `Arc<InferenceService>` is
/// how request handlers share it.
pub struct InferenceService<C, S>
where
    C: ClassPredictor,
    S: ProbabilityScorer,
{
    predictor: EnsemblePredictor<C, S>,
}

impl<C, S> InferenceService<C, S>
where
    C: ClassPredictor,
    S: ProbabilityScorer,
{
    /// Create a new inference service.
    pub fn new(forest: Arc<C>, network: Arc<S>, tie_break: TieBreak) -> Self {
        Self {
            predictor: EnsemblePredictor::new(forest, network, tie_break),
        }
    }

    #[must_use]
    pub fn tie_break(&self) -> TieBreak {
        self.predictor.tie_break()
    }

    /// Run the pipeline on a decoded JSON body.
    ///
    /// Performs:
    /// 1. Encode the record into the fixed-order feature vector
    /// 2. Score it with both models
    /// 3. Round the ensemble mean into a label
    ///
    /// # Errors
    /// Returns `GlycosenseError::Encode` for a bad record and
    /// `GlycosenseError::Model` if scoring fails.
    pub fn predict_record(&self, record: &Value) -> Result<EnsembleOutcome, GlycosenseError> {
        let started = Instant::now();

        tracing::debug!("Encoding request record...");
        let features = encoder::encode_vector(record)?;

        tracing::debug!("Scoring feature vector...");
        let outcome = self.predictor.predict(&features)?;

        tracing::info!(
            label = %outcome.label,
            forest_class = outcome.forest_class,
            network_score = outcome.network_score,
            mean = outcome.mean,
            latency_us = started.elapsed().as_micros() as u64,
            "Prediction complete"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::predictor::tests::{FailingScore, FixedClass, FixedScore};
    use crate::domain::DiagnosisLabel;
    use serde_json::json;

    fn service(class: u8, score: f64) -> InferenceService<FixedClass, FixedScore> {
        InferenceService::new(
            Arc::new(FixedClass(class)),
            Arc::new(FixedScore(score)),
            TieBreak::HalfToEven,
        )
    }

    #[test]
    fn test_inference_pipeline() {
        let outcome = service(1, 0.8)
            .predict_record(&json!({"glucose": 148, "bmi": 33.6, "age": 50}))
            .expect("Should run inference");
        assert_eq!(outcome.label, DiagnosisLabel::Diabetes);
        assert!((outcome.mean - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_encoding_error_is_reported() {
        let err = service(1, 0.8)
            .predict_record(&json!({"diabetes_pedigree_function": "abc"}))
            .expect_err("bad record");
        assert!(matches!(err, GlycosenseError::Encode(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_model_error_is_reported() {
        let service = InferenceService::new(
            Arc::new(FixedClass(0)),
            Arc::new(FailingScore),
            TieBreak::HalfToEven,
        );
        let err = service.predict_record(&json!({})).expect_err("model fails");
        assert!(matches!(err, GlycosenseError::Model(_)));
    }
}
