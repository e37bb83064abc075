//! Ports layer: Trait definitions for external collaborators.
//!
//! The only external collaborator is the pair of pre-trained models, seen
//! through `BinaryClassifier`.

mod classifier;

pub use classifier::{BinaryClassifier, ModelError};
