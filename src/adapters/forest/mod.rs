//! Random forest adapter: Implementation of `ClassPredictor`.
//!
//! Artifacts are JSON exports of the fitted tree arrays of a binary random
//! forest (`children_left`, `children_right`, `feature`, `threshold`,
//! `value` per tree). Scoring follows the usual forest rule: every tree
//! routes the sample to a leaf (`f32(x[feature]) <= threshold` goes left), the
//! normalized leaf class distributions are averaged, and the most probable
//! class wins. On an exact tie the first class (0) wins.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapters::artifact::{check_feature_layout, parse_artifact, read_artifact};
use crate::domain::{FeatureVector, FEATURE_COUNT};
use crate::ports::{ClassPredictor, ModelError};

/// Marker used by the exporter for "no child".
const LEAF: i64 = -1;

/// Class labels a binary forest must have been trained with.
const BINARY_CLASSES: [i64; 2] = [0, 1];

/// A single fitted tree as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions), one entry per class.
    pub value: Vec<Vec<f64>>,
}

/// Forest parameters exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedForest {
    pub n_features: usize,
    pub classes: Vec<i64>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub trees: Vec<ExportedTree>,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: [f64; 2],
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a validated tree. Children must point forward, which rules out
    /// cycles and bounds every traversal by the node count.
    fn compile(index: usize, tree: &ExportedTree) -> Result<Self, ModelError> {
        let n = tree.children_left.len();
        if n == 0 {
            return Err(ModelError::Incompatible(format!("tree {index} has no nodes")));
        }
        if tree.children_right.len() != n
            || tree.feature.len() != n
            || tree.threshold.len() != n
            || tree.value.len() != n
        {
            return Err(ModelError::Incompatible(format!(
                "tree {index}: node array lengths differ"
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = tree.children_left[i];
            let right = tree.children_right[i];

            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(ModelError::Incompatible(format!(
                        "tree {index} node {i}: only one child is a leaf marker"
                    )));
                }
                nodes.push(Node::Leaf {
                    proba: leaf_distribution(index, i, &tree.value[i])?,
                });
                continue;
            }

            let child = |c: i64| -> Result<usize, ModelError> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| {
                        ModelError::Incompatible(format!(
                            "tree {index} node {i}: child index {c} out of range"
                        ))
                    })
            };
            let feature = usize::try_from(tree.feature[i])
                .ok()
                .filter(|&f| f < FEATURE_COUNT)
                .ok_or_else(|| {
                    ModelError::Incompatible(format!(
                        "tree {index} node {i}: feature index {} out of range",
                        tree.feature[i]
                    ))
                })?;
            let threshold = tree.threshold[i];
            if !threshold.is_finite() {
                return Err(ModelError::Incompatible(format!(
                    "tree {index} node {i}: threshold is not finite"
                )));
            }

            nodes.push(Node::Split {
                feature,
                threshold,
                left: child(left)?,
                right: child(right)?,
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_proba(&self, x: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn leaf_distribution(tree: usize, node: usize, value: &[f64]) -> Result<[f64; 2], ModelError> {
    if value.len() != BINARY_CLASSES.len() {
        return Err(ModelError::Incompatible(format!(
            "tree {tree} node {node}: expected 2 class weights, got {}",
            value.len()
        )));
    }
    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ModelError::Incompatible(format!(
            "tree {tree} node {node}: class weights must be finite and non-negative"
        )));
    }
    let total = value[0] + value[1];
    if total <= 0.0 {
        return Err(ModelError::Incompatible(format!(
            "tree {tree} node {node}: leaf has no class weight"
        )));
    }
    Ok([value[0] / total, value[1] / total])
}

/// Random forest adapter for hard class votes.
#[derive(Debug, Clone)]
pub struct RandomForestAdapter {
    trees: Vec<Tree>,
}

impl RandomForestAdapter {
    /// Load and validate a forest artifact from disk.
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
    /// Returns error if the bytes are malformed or describe an incompatible forest.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, ModelError> {
        let export: ExportedForest = parse_artifact(path, bytes)?;
        let adapter = Self::from_export(&export)?;
        tracing::info!(
            "Loaded random forest from {:?} (n_trees={}, n_features={})",
            path,
            adapter.n_trees(),
            export.n_features
        );
        Ok(adapter)
    }

    /// Validate exported parameters and compile them for scoring.
    ///
    /// # Errors
    /// Returns `ModelError::Incompatible` on any structural problem.
    pub fn from_export(export: &ExportedForest) -> Result<Self, ModelError> {
        check_feature_layout(export.n_features, export.feature_names.as_deref())?;
        if export.classes != BINARY_CLASSES {
            return Err(ModelError::Incompatible(format!(
                "forest must be binary with classes [0, 1], got {:?}",
                export.classes
            )));
        }
        if export.trees.is_empty() {
            return Err(ModelError::Incompatible("forest has no trees".into()));
        }

        let trees = export
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| Tree::compile(i, t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { trees })
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean class probabilities across all trees.
    ///
    /// Inputs are rounded to `f32` before routing, as the trainer did; its
    /// thresholds are midpoints between `f32` training values.
    #[must_use]
    pub fn predict_proba(&self, features: &FeatureVector) -> [f64; 2] {
        let x = features.into_inner().map(|v| f64::from(v as f32));
        let mut totals = [0.0; 2];
        for tree in &self.trees {
            let p = tree.leaf_proba(&x);
            totals[0] += p[0];
            totals[1] += p[1];
        }
        let n = self.trees.len() as f64;
        [totals[0] / n, totals[1] / n]
    }
}

impl ClassPredictor for RandomForestAdapter {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn predict_class(&self, features: &FeatureVector) -> Result<u8, ModelError> {
        let proba = self.predict_proba(features);
        Ok(u8::from(proba[1] > proba[0]))
    }
}
