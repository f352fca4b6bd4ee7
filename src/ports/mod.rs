//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the ensemble logic and the trained models.

mod classifier;

pub use classifier::{ClassPredictor, ModelError, ProbabilityScorer};
