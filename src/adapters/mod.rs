//! Adapters layer: Concrete implementations of ports.
//!
//! - `forest`: exported random-forest models and model directory integrity
//! - `sanitize`: identifier filtering for logs

pub mod forest;
pub mod sanitize;

pub use forest::{load_models, ModelBundle, RandomForestModel};
