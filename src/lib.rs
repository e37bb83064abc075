//! # Nephrocheck
//!
//! Kidney health risk assessment in the terminal.
//!
//! This crate provides:
//! - A seven-field patient form (age, creatinine, BUN, diabetes,
//!   hypertension, GFR, urine output)
//! - Two pre-trained random-forest classifiers: CKD status and dialysis need
//! - Risk badges and formatted probabilities for each model
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientRecord, Prediction, Assessment)
//! - `ports`: The `BinaryClassifier` trait
//! - `adapters`: Forest model loading, manifest verification, log sanitizing
//! - `application`: The assessment use case
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{Assessment, Badge, PatientRecord, Prediction, RiskTarget};

/// Result type for Nephrocheck operations
pub type Result<T> = std::result::Result<T, NephrocheckError>;

/// Main error type for Nephrocheck
#[derive(Debug, thiserror::Error)]
pub enum NephrocheckError {
    #[error("Model error: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Configuration error: {0}")]
    Config(String),
}
