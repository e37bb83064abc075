//! TUI module: Terminal User Interface using Ratatui.
//!
//! Screens:
//! - Dashboard with model status
//! - Patient data input
//! - Prediction results

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::ClinicalTheme;
