//! Application layer: Use cases.
//!
//! Orchestrates domain types with the classifier port.

mod assessment;

pub use assessment::{AssessmentService, ModelSummary};
