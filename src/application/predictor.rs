//! Ensemble predictor: two classifiers, one label.

use std::sync::Arc;

use crate::domain::{EnsembleOutcome, FeatureVector, TieBreak};
use crate::ports::{ClassPredictor, ModelError, ProbabilityScorer};

/// Averages a tree ensemble's class vote with a network's probability.
///
/// Stateless apart from the shared, read-only models; safe to call from any
/// number of threads at once.
pub struct EnsemblePredictor<C, S>
where
    C: ClassPredictor,
    S: ProbabilityScorer,
{
    forest: Arc<C>,
    network: Arc<S>,
    tie_break: TieBreak,
}

impl<C, S> EnsemblePredictor<C, S>
where
    C: ClassPredictor,
    S: ProbabilityScorer,
{
    /// Create a new predictor over already-loaded models.
    pub fn new(forest: Arc<C>, network: Arc<S>, tie_break: TieBreak) -> Self {
        Self {
            forest,
            network,
            tie_break,
        }
    }

    #[must_use]
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Score `features` with both models and combine the outputs.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` if either model fails or returns a
    /// value outside its documented range.
    pub fn predict(&self, features: &FeatureVector) -> Result<EnsembleOutcome, ModelError> {
        let class = self.forest.predict_class(features)?;
        if class > 1 {
            return Err(ModelError::Inference(format!(
                "{} returned class {class}, expected 0 or 1",
                self.forest.name()
            )));
        }

        let score = self.network.score(features)?;
        if !(0.0..=1.0).contains(&score) {
            return Err(ModelError::Inference(format!(
                "{} returned score {score}, expected a probability",
                self.network.name()
            )));
        }

        Ok(EnsembleOutcome::combine(class, score, self.tie_break))
    }
}
