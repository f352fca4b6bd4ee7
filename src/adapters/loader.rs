//! Startup model loading.
//!
//! Both artifacts are read once, checked against `manifest.json` when one is
//! present, and compiled. Any failure here is fatal for the process.

use std::path::Path;
use std::sync::Arc;

use super::artifact::{read_artifact, ModelManifest, MANIFEST_FILE};
use super::forest::RandomForestAdapter;
use super::network::NeuralNetworkAdapter;
use crate::config::Config;
use crate::ports::ModelError;

/// The two pre-trained models, shared read-only for the process lifetime.
#[derive(Debug, Clone)]
pub struct LoadedModels {
    pub forest: Arc<RandomForestAdapter>,
    pub network: Arc<NeuralNetworkAdapter>,
}

impl LoadedModels {
    /// Load both artifacts named by `config`.
    ///
    /// # Errors
    /// Returns error if the manifest is required but missing, an artifact is
    /// not bound by the manifest, or either model fails to load.
    pub fn load(config: &Config) -> Result<Self, ModelError> {
        let manifest = ModelManifest::load(&config.model_dir)?;
        match &manifest {
            Some(m) => tracing::info!(
                "Verifying model artifacts against {:?} ({} entries)",
                config.model_dir.join(MANIFEST_FILE),
                m.files.len()
            ),
            None if config.require_manifest => {
                tracing::error!(
                    "Model manifest not found at {:?}",
                    config.model_dir.join(MANIFEST_FILE)
                );
                return Err(ModelError::Integrity(format!(
                    "{MANIFEST_FILE} is required but missing from {}",
                    config.model_dir.display()
                )));
            }
            None => tracing::warn!(
                "No {MANIFEST_FILE} in {:?}; loading unverified model artifacts",
                config.model_dir
            ),
        }

        let forest_path = config.forest_path();
        let forest_bytes = read_verified(&forest_path, &config.forest_model, manifest.as_ref())?;
        let forest = RandomForestAdapter::from_bytes(&forest_path, &forest_bytes)?;

        let network_path = config.network_path();
        let network_bytes =
            read_verified(&network_path, &config.network_model, manifest.as_ref())?;
        let network = NeuralNetworkAdapter::from_bytes(&network_path, &network_bytes)?;

        Ok(Self {
            forest: Arc::new(forest),
            network: Arc::new(network),
        })
    }
}

/// Read an artifact and, if a manifest is given, check its digest.
///
/// The bytes that are verified are the bytes that get parsed.
fn read_verified(
    path: &Path,
    name: &str,
    manifest: Option<&ModelManifest>,
) -> Result<Vec<u8>, ModelError> {
    let bytes = read_artifact(path)?;
    if let Some(manifest) = manifest {
        manifest.verify(name, &bytes)?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::forest::{ExportedForest, ExportedTree};
    use crate::adapters::network::{Activation, ExportedLayer, ExportedNetwork};
    use crate::domain::{Feature, FEATURE_COUNT};
    use tempfile::{tempdir, TempDir};

    fn forest_json() -> Vec<u8> {
        let export = ExportedForest {
            n_features: FEATURE_COUNT,
            classes: vec![0, 1],
            feature_names: None,
            trees: vec![ExportedTree {
                children_left: vec![1, -1, -1],
                children_right: vec![2, -1, -1],
                feature: vec![Feature::Glucose.index() as i64, -2, -2],
                threshold: vec![127.5, -2.0, -2.0],
                value: vec![vec![10.0, 10.0], vec![9.0, 1.0], vec![1.0, 9.0]],
            }],
        };
        serde_json::to_vec(&export).expect("serialize forest")
    }

    fn network_json() -> Vec<u8> {
        let export = ExportedNetwork {
            input_dim: FEATURE_COUNT,
            feature_names: None,
            scaler: None,
            layers: vec![ExportedLayer {
                weights: vec![vec![0.01]; FEATURE_COUNT],
                bias: vec![-1.0],
                activation: Activation::Sigmoid,
            }],
        };
        serde_json::to_vec(&export).expect("serialize network")
    }

    fn model_dir() -> (TempDir, Config) {
        let temp = tempdir().expect("tempdir");
        let config = Config {
            model_dir: temp.path().to_path_buf(),
            ..Config::default()
        };
        std::fs::write(config.forest_path(), forest_json()).expect("write forest");
        std::fs::write(config.network_path(), network_json()).expect("write network");
        (temp, config)
    }

    fn write_manifest(config: &Config) {
        ModelManifest::from_files(
            &config.model_dir,
            &[config.forest_model.as_str(), config.network_model.as_str()],
        )
        .expect("hash artifacts")
        .write(&config.model_dir)
        .expect("write manifest");
    }

    #[test]
    fn test_load_without_manifest() {
        let (_temp, config) = model_dir();
        let models = LoadedModels::load(&config).expect("load models");
        assert_eq!(models.forest.n_trees(), 1);
    }

    #[test]
    fn test_require_manifest_fails_closed() {
        let (_temp, mut config) = model_dir();
        config.require_manifest = true;
        let err = LoadedModels::load(&config).expect_err("manifest missing");
        assert!(matches!(err, ModelError::Integrity(_)));
    }

    #[test]
    fn test_load_with_matching_manifest() {
        let (_temp, mut config) = model_dir();
        write_manifest(&config);
        config.require_manifest = true;
        assert!(LoadedModels::load(&config).is_ok());
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let (_temp, config) = model_dir();
        write_manifest(&config);

        let mut tampered = network_json();
        tampered.push(b'\n');
        std::fs::write(config.network_path(), tampered).expect("rewrite network");

        let err = LoadedModels::load(&config).expect_err("digest mismatch");
        assert!(matches!(err, ModelError::Integrity(_)));
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let (_temp, config) = model_dir();
        std::fs::remove_file(config.forest_path()).expect("remove forest");
        let err = LoadedModels::load(&config).expect_err("missing forest");
        assert!(matches!(err, ModelError::Unreadable { .. }));
    }

    #[test]
    fn test_bundled_models_score_reference_patients() {
        use crate::domain::{DiagnosisLabel, PatientFeatures, TieBreak};
        use crate::ports::{ClassPredictor, ProbabilityScorer};

        let config = Config {
            require_manifest: true,
            ..Config::default()
        };
        let models = LoadedModels::load(&config).expect("bundled models load");

        let high = PatientFeatures {
            pregnancies: 6.0,
            glucose: 168.0,
            blood_pressure: 72.0,
            skin_thickness: 35.0,
            bmi: 43.1,
            age: 50.0,
            has_pcos: true,
            ethnicity: crate::domain::Ethnicity::Hispanic,
            diabetes_pedigree_function: 0.627,
            ..Default::default()
        }
        .to_vector();
        let class = models.forest.predict_class(&high).expect("forest");
        let score = models.network.score(&high).expect("network");
        assert_eq!(class, 1);
        assert!(score > 0.99);
        assert_eq!(
            crate::EnsembleOutcome::combine(class, score, TieBreak::default()).label,
            DiagnosisLabel::Diabetes
        );

        let low = PatientFeatures {
            pregnancies: 1.0,
            glucose: 85.0,
            blood_pressure: 66.0,
            skin_thickness: 29.0,
            bmi: 22.6,
            age: 24.0,
            exercises: true,
            ethnicity: crate::domain::Ethnicity::Caucasian,
            diabetes_pedigree_function: 0.151,
            ..Default::default()
        }
        .to_vector();
        let class = models.forest.predict_class(&low).expect("forest");
        let score = models.network.score(&low).expect("network");
        assert_eq!(class, 0);
        assert!((score - 0.1978).abs() < 1e-3);
    }
}
