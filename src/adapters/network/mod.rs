//! Feed-forward network adapter: Implementation of `ProbabilityScorer`.
//!
//! Artifacts are JSON exports of a stack of Dense layers. Kernels use the
//! `[input][unit]` layout, so a layer computes
//! `out[j] = act(sum_i x[i] * weights[i][j] + bias[j])`.
//! An optional standard scaler (`(x - mean) / scale`) is applied to the raw
//! feature vector first, matching the preprocessing used during training.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapters::artifact::{check_feature_layout, parse_artifact, read_artifact};
use crate::domain::{FeatureVector, FEATURE_COUNT};
use crate::ports::{ModelError, ProbabilityScorer};

/// Layer activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Linear,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Relu => x.max(0.0),
            Self::Sigmoid => sigmoid(x),
            Self::Tanh => x.tanh(),
            Self::Linear => x,
        }
    }
}

/// Numerically stable logistic function.
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// One Dense layer as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

/// Standard scaler fitted on the training split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Network parameters exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedNetwork {
    pub input_dim: usize,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub scaler: Option<ExportedScaler>,
    pub layers: Vec<ExportedLayer>,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    /// Row-major `[input][unit]`
    weights: Vec<f64>,
    bias: Vec<f64>,
    units: usize,
    activation: Activation,
}

impl DenseLayer {
    fn compile(index: usize, inputs: usize, layer: &ExportedLayer) -> Result<Self, ModelError> {
        let units = layer.bias.len();
        if units == 0 {
            return Err(ModelError::Incompatible(format!("layer {index} has no units")));
        }
        if layer.weights.len() != inputs {
            return Err(ModelError::Incompatible(format!(
                "layer {index}: kernel has {} input rows, expected {inputs}",
                layer.weights.len()
            )));
        }
        if let Some(row) = layer.weights.iter().position(|r| r.len() != units) {
            return Err(ModelError::Incompatible(format!(
                "layer {index}: kernel row {row} has {} units, expected {units}",
                layer.weights[row].len()
            )));
        }

        let weights: Vec<f64> = layer.weights.iter().flatten().copied().collect();
        if weights.iter().chain(&layer.bias).any(|w| !w.is_finite()) {
            return Err(ModelError::Incompatible(format!(
                "layer {index}: weights must be finite"
            )));
        }

        Ok(Self {
            weights,
            bias: layer.bias.clone(),
            units,
            activation: layer.activation,
        })
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (row, x) in self.weights.chunks_exact(self.units).zip(input) {
            for (acc, w) in out.iter_mut().zip(row) {
                *acc += x * w;
            }
        }
        for v in &mut out {
            *v = self.activation.apply(*v);
        }
        out
    }
}

#[derive(Debug, Clone)]
struct Scaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl Scaler {
    fn compile(scaler: &ExportedScaler) -> Result<Self, ModelError> {
        let mean: [f64; FEATURE_COUNT] = scaler.mean.as_slice().try_into().map_err(|_| {
            ModelError::Incompatible(format!(
                "scaler mean has {} entries, expected {FEATURE_COUNT}",
                scaler.mean.len()
            ))
        })?;
        let scale: [f64; FEATURE_COUNT] = scaler.scale.as_slice().try_into().map_err(|_| {
            ModelError::Incompatible(format!(
                "scaler scale has {} entries, expected {FEATURE_COUNT}",
                scaler.scale.len()
            ))
        })?;
        if mean.iter().any(|m| !m.is_finite())
            || scale.iter().any(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(ModelError::Incompatible(
                "scaler values must be finite with non-zero scale".into(),
            ));
        }
        Ok(Self { mean, scale })
    }

    fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// Feed-forward network adapter producing a sigmoid probability.
#[derive(Debug, Clone)]
pub struct NeuralNetworkAdapter {
    scaler: Option<Scaler>,
    layers: Vec<DenseLayer>,
}

impl NeuralNetworkAdapter {
    /// Load and validate a network artifact from disk.
    ///
    /// # Errors
    /// Returns error if the file is missing, malformed or incompatible.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = read_artifact(path)?;
        Self::from_bytes(path, &bytes)
    }

    /// Parse and validate an already-read artifact.
    ///
    /// # Errors
    /// Returns error if the bytes are malformed or describe an incompatible network.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, ModelError> {
        let export: ExportedNetwork = parse_artifact(path, bytes)?;
        let adapter = Self::from_export(&export)?;
        tracing::info!(
            "Loaded neural network from {:?} (layers={}, scaled_inputs={})",
            path,
            adapter.layers.len(),
            adapter.scaler.is_some()
        );
        Ok(adapter)
    }

    /// Validate exported parameters and compile them for scoring.
    ///
    /// # Errors
    /// Returns `ModelError::Incompatible` on any structural problem.
    pub fn from_export(export: &ExportedNetwork) -> Result<Self, ModelError> {
        check_feature_layout(export.input_dim, export.feature_names.as_deref())?;

        let last = export
            .layers
            .last()
            .ok_or_else(|| ModelError::Incompatible("network has no layers".into()))?;
        if last.activation != Activation::Sigmoid {
            return Err(ModelError::Incompatible(format!(
                "output layer must use sigmoid activation, got {:?}",
                last.activation
            )));
        }

        let mut inputs = export.input_dim;
        let mut layers = Vec::with_capacity(export.layers.len());
        for (i, layer) in export.layers.iter().enumerate() {
            let dense = DenseLayer::compile(i, inputs, layer)?;
            inputs = dense.units;
            layers.push(dense);
        }

        let scaler = export.scaler.as_ref().map(Scaler::compile).transpose()?;
        Ok(Self { scaler, layers })
    }

    /// Run the full forward pass and return every output unit.
    #[must_use]
    pub fn forward(&self, features: &FeatureVector) -> Vec<f64> {
        let mut current = match &self.scaler {
            Some(scaler) => scaler.transform(features.as_slice()),
            None => features.as_slice().to_vec(),
        };
        for layer in &self.layers {
            current = layer.forward(&current);
        }
        current
    }
}

impl ProbabilityScorer for NeuralNetworkAdapter {
    fn name(&self) -> &str {
        "neural_network"
    }

    fn score(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let output = self.forward(features);
        let score = output
            .first()
            .copied()
            .ok_or_else(|| ModelError::Inference("network produced no output".into()))?;
        if !score.is_finite() {
            return Err(ModelError::Inference(format!(
                "network produced a non-finite score ({score})"
            )));
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Feature, PatientFeatures};
    use tempfile::tempdir;

    /// Single sigmoid unit reading only glucose: sigmoid(w * glucose + b).
    fn logistic_on_glucose(w: f64, b: f64) -> ExportedNetwork {
        let mut kernel = vec![vec![0.0]; FEATURE_COUNT];
        kernel[Feature::Glucose.index()][0] = w;
        ExportedNetwork {
            input_dim: FEATURE_COUNT,
            feature_names: None,
            scaler: None,
            layers: vec![ExportedLayer {
                weights: kernel,
                bias: vec![b],
                activation: Activation::Sigmoid,
            }],
        }
    }

    fn with_glucose(glucose: f64) -> FeatureVector {
        PatientFeatures {
            glucose,
            ..Default::default()
        }
        .to_vector()
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_unit_logistic() {
        let net = NeuralNetworkAdapter::from_export(&logistic_on_glucose(0.1, -14.0))
            .expect("valid network");
        // 0.1 * 140 - 14 = 0
        let score = net.score(&with_glucose(140.0)).expect("score");
        assert!((score - 0.5).abs() < 1e-12);

        let high = net.score(&with_glucose(200.0)).expect("score");
        let low = net.score(&with_glucose(80.0)).expect("score");
        assert!(high > 0.99);
        assert!(low < 0.01);
    }

    #[test]
    fn test_hidden_relu_layer() {
        // hidden = relu(glucose - 100); out = sigmoid(hidden - 20)
        let mut hidden = vec![vec![0.0]; FEATURE_COUNT];
        hidden[Feature::Glucose.index()][0] = 1.0;
        let export = ExportedNetwork {
            input_dim: FEATURE_COUNT,
            feature_names: None,
            scaler: None,
            layers: vec![
                ExportedLayer {
                    weights: hidden,
                    bias: vec![-100.0],
                    activation: Activation::Relu,
                },
                ExportedLayer {
                    weights: vec![vec![1.0]],
                    bias: vec![-20.0],
                    activation: Activation::Sigmoid,
                },
            ],
        };
        let net = NeuralNetworkAdapter::from_export(&export).expect("valid network");

        // relu clamps to 0 -> sigmoid(-20)
        let below = net.score(&with_glucose(50.0)).expect("score");
        assert!((below - sigmoid(-20.0)).abs() < 1e-12);

        let at_boundary = net.score(&with_glucose(120.0)).expect("score");
        assert!((at_boundary - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_is_applied_before_layers() {
        let mut export = logistic_on_glucose(1.0, 0.0);
        let mut mean = vec![0.0; FEATURE_COUNT];
        let mut scale = vec![1.0; FEATURE_COUNT];
        mean[Feature::Glucose.index()] = 120.0;
        scale[Feature::Glucose.index()] = 30.0;
        export.scaler = Some(ExportedScaler { mean, scale });

        let net = NeuralNetworkAdapter::from_export(&export).expect("valid network");
        // (150 - 120) / 30 = 1
        let score = net.score(&with_glucose(150.0)).expect("score");
        assert!((score - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_sigmoid_output() {
        let mut export = logistic_on_glucose(1.0, 0.0);
        export.layers[0].activation = Activation::Linear;
        let err = NeuralNetworkAdapter::from_export(&export).expect_err("must fail");
        assert!(err.to_string().contains("sigmoid"));
    }

    #[test]
    fn test_rejects_broken_shape_chain() {
        let mut export = logistic_on_glucose(1.0, 0.0);
        export.layers.push(ExportedLayer {
            weights: vec![vec![1.0], vec![1.0]],
            bias: vec![0.0],
            activation: Activation::Sigmoid,
        });
        let err = NeuralNetworkAdapter::from_export(&export).expect_err("must fail");
        assert!(err.to_string().contains("expected 1"));
    }

    #[test]
    fn test_rejects_wrong_input_dim() {
        let mut export = logistic_on_glucose(1.0, 0.0);
        export.input_dim = 11;
        assert!(NeuralNetworkAdapter::from_export(&export).is_err());
    }

    #[test]
    fn test_rejects_zero_scale() {
        let mut export = logistic_on_glucose(1.0, 0.0);
        export.scaler = Some(ExportedScaler {
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![0.0; FEATURE_COUNT],
        });
        assert!(NeuralNetworkAdapter::from_export(&export).is_err());
    }

    #[test]
    fn test_rejects_empty_network() {
        let mut export = logistic_on_glucose(1.0, 0.0);
        export.layers.clear();
        let err = NeuralNetworkAdapter::from_export(&export).expect_err("must fail");
        assert!(err.to_string().contains("no layers"));
    }

    #[test]
    fn test_activation_serde_names() {
        let json = r#"{"weights": [[1.0]], "bias": [0.0], "activation": "relu"}"#;
        let layer: ExportedLayer = serde_json::from_str(json).expect("parse layer");
        assert_eq!(layer.activation, Activation::Relu);
    }

    #[test]
    fn test_load_from_disk() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("neural_network_model.json");
        let json = serde_json::to_vec(&logistic_on_glucose(0.05, -7.0)).expect("serialize");
        std::fs::write(&path, json).expect("write network");

        let net = NeuralNetworkAdapter::load(&path).expect("load network");
        assert_eq!(net.name(), "neural_network");
        let score = net.score(&with_glucose(140.0)).expect("score");
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_load_malformed_json_fails() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("neural_network_model.json");
        std::fs::write(&path, b"not json").expect("write");
        let err = NeuralNetworkAdapter::load(&path).expect_err("malformed");
        assert!(matches!(err, ModelError::Malformed { .. }));
    }
}
