//! Domain layer: Core types for kidney risk assessment.
//!
//! Pure Rust types with no I/O. Records normalise themselves into their
//! clinical domains; predictions know how they are labelled and badged.

mod patient;
mod prediction;

pub use patient::{FieldKind, FieldSpec, PatientRecord, FEATURE_NAMES, FIELD_SPECS, N_FEATURES};
pub use prediction::{format_probability, Assessment, Badge, Prediction, RiskTarget};
