//! Classifier port: Trait for pre-trained binary classifiers.
//!
//! This trait abstracts the model format (exported random forests) from the
//! assessment logic.

use crate::domain::Prediction;

/// Error type for model loading and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read model artifact {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Format(String),

    #[error("Model integrity check failed: {0}")]
    Integrity(String),

    #[error("Expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Model evaluation failed: {0}")]
    Evaluation(String),
}

/// A loaded binary classifier.
///
/// Implementations are read-only after loading and safe to share.
pub trait BinaryClassifier: Send + Sync {
    /// Model name (for status display and logs).
    fn name(&self) -> &str;

    /// Number of input features the model expects.
    fn n_features(&self) -> usize;

    /// Short content fingerprint of the loaded artifact, if known.
    fn fingerprint(&self) -> Option<&str> {
        None
    }

    /// Probability of the positive class for one feature vector.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureCount` on a wrong-length input, or
    /// `ModelError::Evaluation` if the model cannot produce a probability.
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Class label and positive-class probability.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureCount` when `features` does not match
    /// [`BinaryClassifier::n_features`]; otherwise propagates errors from
    /// `predict_proba`.
    fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        if features.len() != self.n_features() {
            return Err(ModelError::FeatureCount {
                expected: self.n_features(),
                actual: features.len(),
            });
        }
        let probability = self.predict_proba(features)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ModelError::Evaluation(format!(
                "{} returned probability {probability} outside [0, 1]",
                self.name()
            )));
        }
        Ok(Prediction::from_probability(probability))
    }
}
