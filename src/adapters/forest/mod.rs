//! Forest adapter: Implementation of `BinaryClassifier` for exported
//! random-forest models.
//!
//! Artifacts are JSON exports of a scikit-learn style forest. Each tree uses
//! the `tree_` array layout:
//!
//! - `children_left[i]` / `children_right[i]`: child node indices, `-1` on leaves
//! - `feature[i]` / `threshold[i]`: split rule, go left when `x[feature] <= threshold`
//! - `value[i]`: per-class sample counts (or fractions) at the node
//!
//! The forest probability is the mean over trees of the normalised class-1
//! share at the reached leaf, which is what `predict_proba` computes for a
//! fitted random forest.
//!
//! # Integrity
//!
//! Structural validation happens at load time so evaluation never indexes out
//! of bounds or loops: child indices must be strictly greater than their
//! parent. File-level integrity (hashes, signature) lives in [`manifest`].

pub mod manifest;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::domain::{FEATURE_NAMES, N_FEATURES};
use crate::ports::{BinaryClassifier, ModelError};

pub use manifest::{verify_model_dir, IntegrityStatus, ModelManifest, VerifiedDir};

/// Only supported artifact version.
const FORMAT_VERSION: u32 = 1;

/// Leaf marker in the children arrays.
const TREE_LEAF: i64 = -1;

/// Forest as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedForest {
    pub format_version: u32,
    pub name: String,
    pub n_classes: usize,
    pub feature_names: Vec<String>,
    pub trees: Vec<ExportedTree>,
}

/// One tree in `tree_` array layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Normalised class-1 share
        positive: f64,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn compile(index: usize, tree: &ExportedTree) -> Result<Self, ModelError> {
        let n = tree.children_left.len();
        if n == 0 {
            return Err(ModelError::Format(format!("tree {index} has no nodes")));
        }
        if tree.children_right.len() != n
            || tree.feature.len() != n
            || tree.threshold.len() != n
            || tree.value.len() != n
        {
            return Err(ModelError::Format(format!(
                "tree {index}: node arrays have different lengths"
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (tree.children_left[i], tree.children_right[i]);

            if left == TREE_LEAF && right == TREE_LEAF {
                let value = &tree.value[i];
                if value.len() != 2 {
                    return Err(ModelError::Format(format!(
                        "tree {index} node {i}: leaf value must have 2 classes, got {}",
                        value.len()
                    )));
                }
                if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(ModelError::Format(format!(
                        "tree {index} node {i}: leaf value must be finite and non-negative"
                    )));
                }
                let total = value[0] + value[1];
                if total <= 0.0 {
                    return Err(ModelError::Format(format!(
                        "tree {index} node {i}: leaf value sums to zero"
                    )));
                }
                nodes.push(Node::Leaf {
                    positive: value[1] / total,
                });
                continue;
            }

            let child = |c: i64| -> Result<usize, ModelError> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| {
                        ModelError::Format(format!(
                            "tree {index} node {i}: child index {c} out of order or range"
                        ))
                    })
            };
            let feature = usize::try_from(tree.feature[i])
                .ok()
                .filter(|&f| f < N_FEATURES)
                .ok_or_else(|| {
                    ModelError::Format(format!(
                        "tree {index} node {i}: feature index {} out of range",
                        tree.feature[i]
                    ))
                })?;
            let threshold = tree.threshold[i];
            if !threshold.is_finite() {
                return Err(ModelError::Format(format!(
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

    fn positive_share(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { positive } => return positive,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// A validated random-forest binary classifier.
#[derive(Debug, Clone)]
pub struct RandomForestModel {
    name: String,
    trees: Vec<Tree>,
    fingerprint: String,
}

impl RandomForestModel {
    /// Load and validate a forest artifact from disk.
    ///
    /// # Errors
    /// Returns `ModelError::Read` if the file cannot be read, or
    /// `ModelError::Format` if it is not a valid forest export.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let model = Self::from_slice(&bytes)?;

        tracing::info!(
            "Loaded model {} from {:?} (trees={}, fingerprint={})",
            model.name,
            path,
            model.trees.len(),
            model.short_fingerprint()
        );
        Ok(model)
    }

    /// Parse and validate a forest artifact from raw JSON bytes.
    ///
    /// # Errors
    /// Returns `ModelError::Format` if the bytes are not a valid forest export.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let exported: ExportedForest =
            serde_json::from_slice(bytes).map_err(|e| ModelError::Format(e.to_string()))?;
        Self::from_exported(&exported, manifest::sha256_hex(bytes))
    }

    /// Validate an in-memory export.
    ///
    /// # Errors
    /// Returns `ModelError::Format` on any structural problem.
    pub fn from_exported(exported: &ExportedForest, fingerprint: String) -> Result<Self, ModelError> {
        if exported.format_version != FORMAT_VERSION {
            return Err(ModelError::Format(format!(
                "unsupported format_version {} (expected {FORMAT_VERSION})",
                exported.format_version
            )));
        }
        if exported.n_classes != 2 {
            return Err(ModelError::Format(format!(
                "expected a binary classifier, got n_classes={}",
                exported.n_classes
            )));
        }
        if exported.feature_names.len() != N_FEATURES
            || exported
                .feature_names
                .iter()
                .zip(FEATURE_NAMES.iter())
                .any(|(got, want)| got != want)
        {
            return Err(ModelError::Format(format!(
                "feature_names must be {FEATURE_NAMES:?}, got {:?}",
                exported.feature_names
            )));
        }
        if exported.trees.is_empty() {
            return Err(ModelError::Format("forest has no trees".into()));
        }

        let trees = exported
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| Tree::compile(i, t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: exported.name.clone(),
            trees,
            fingerprint,
        })
    }

    /// Number of trees in the forest.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// SHA-256 of the artifact bytes (hex).
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// First 16 hex characters of the fingerprint.
    #[must_use]
    pub fn short_fingerprint(&self) -> &str {
        let end = self.fingerprint.len().min(16);
        &self.fingerprint[..end]
    }
}

impl BinaryClassifier for RandomForestModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        N_FEATURES
    }

    fn fingerprint(&self) -> Option<&str> {
        Some(self.short_fingerprint())
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != N_FEATURES {
            return Err(ModelError::FeatureCount {
                expected: N_FEATURES,
                actual: features.len(),
            });
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Evaluation(
                "input contains non-finite values".into(),
            ));
        }

        let sum: f64 = self.trees.iter().map(|t| t.positive_share(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}

/// Both models, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub ckd: RandomForestModel,
    pub dialysis: RandomForestModel,
    pub integrity: IntegrityStatus,
}

/// Load one artifact and check its bytes against the verified manifest.
///
/// # Errors
/// Returns `ModelError::Integrity` when the file read here differs from the
/// one hashed during verification, or any error from [`RandomForestModel::load`].
pub fn load_verified(
    path: &Path,
    file: &str,
    verified: &VerifiedDir,
) -> Result<RandomForestModel, ModelError> {
    let model = RandomForestModel::load(path)?;
    verified.check_loaded(file, model.fingerprint())?;
    Ok(model)
}

/// Verify the model directory and load both artifacts.
///
/// # Errors
/// Any failure here is fatal for the application: missing or corrupt
/// artifacts, or a failed integrity check.
pub fn load_models(config: &AppConfig) -> Result<ModelBundle, ModelError> {
    let verified = verify_model_dir(
        &config.model_dir,
        &[config.ckd_model.as_str(), config.dialysis_model.as_str()],
        config.require_signed_models,
        config.model_pubkey_b64.as_deref(),
    )?;

    let ckd = load_verified(&config.ckd_model_path(), &config.ckd_model, &verified)?;
    let dialysis = load_verified(
        &config.dialysis_model_path(),
        &config.dialysis_model,
        &verified,
    )?;

    Ok(ModelBundle {
        ckd,
        dialysis,
        integrity: verified.status,
    })
}
