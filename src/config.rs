//! Runtime configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `NEPHROCHECK_MODEL_DIR` | `models` |
//! | `NEPHROCHECK_CKD_MODEL` | `rf_model_ckd_status.json` |
//! | `NEPHROCHECK_DIALYSIS_MODEL` | `rf_model_dialysis_needed.json` |
//! | `NEPHROCHECK_REQUIRE_SIGNED_MODELS` | `false` |
//! | `NEPHROCHECK_MODEL_PUBKEY_B64` / `NEPHROCHECK_MODEL_PUBKEY_B64_FILE` | unset |
//! | `NEPHROCHECK_LOG_MODE` | `auto` |
//! | `NEPHROCHECK_LOG_FILE` | `nephrocheck.log` |

use std::path::PathBuf;

use crate::{NephrocheckError, Result};

pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_CKD_MODEL: &str = "rf_model_ckd_status.json";
pub const DEFAULT_DIALYSIS_MODEL: &str = "rf_model_dialysis_needed.json";
pub const DEFAULT_LOG_FILE: &str = "nephrocheck.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when attached to a terminal, stdout otherwise
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "file" => Ok(Self::File),
            "stdout" => Ok(Self::Stdout),
            other => Err(NephrocheckError::Config(format!(
                "NEPHROCHECK_LOG_MODE must be auto, file or stdout (got {other:?})"
            ))),
        }
    }

    /// Resolve `Auto` against whether stdout is a terminal.
    #[must_use]
    pub fn use_file(&self, interactive: bool) -> bool {
        match self {
            Self::Auto => interactive,
            Self::File => true,
            Self::Stdout => false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding both model artifacts (and the optional manifest)
    pub model_dir: PathBuf,
    /// CKD status model filename inside `model_dir`
    pub ckd_model: String,
    /// Dialysis need model filename inside `model_dir`
    pub dialysis_model: String,
    /// Refuse to start unless the manifest carries a valid signature
    pub require_signed_models: bool,
    /// Base64 Ed25519 verifying key for model signatures
    pub model_pubkey_b64: Option<String>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            ckd_model: DEFAULT_CKD_MODEL.to_string(),
            dialysis_model: DEFAULT_DIALYSIS_MODEL.to_string(),
            require_signed_models: false,
            model_pubkey_b64: None,
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `NephrocheckError::Config` on an invalid value or an unreadable
    /// public key file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let model_pubkey_b64 = match lookup("NEPHROCHECK_MODEL_PUBKEY_B64") {
            Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
            _ => match lookup("NEPHROCHECK_MODEL_PUBKEY_B64_FILE") {
                Some(path) => {
                    let content = std::fs::read_to_string(path.trim()).map_err(|e| {
                        NephrocheckError::Config(format!(
                            "Failed to read model public key file {path:?}: {e}"
                        ))
                    })?;
                    Some(content.trim().to_string())
                }
                None => None,
            },
        };

        let log_mode = match lookup("NEPHROCHECK_LOG_MODE") {
            Some(v) => LogMode::parse(&v)?,
            None => defaults.log_mode,
        };

        Ok(Self {
            model_dir: lookup("NEPHROCHECK_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            ckd_model: lookup("NEPHROCHECK_CKD_MODEL").unwrap_or(defaults.ckd_model),
            dialysis_model: lookup("NEPHROCHECK_DIALYSIS_MODEL")
                .unwrap_or(defaults.dialysis_model),
            require_signed_models: lookup("NEPHROCHECK_REQUIRE_SIGNED_MODELS")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.require_signed_models),
            model_pubkey_b64,
            log_mode,
            log_file: lookup("NEPHROCHECK_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        })
    }

    /// Full path of the CKD status artifact.
    #[must_use]
    pub fn ckd_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.ckd_model)
    }

    /// Full path of the dialysis need artifact.
    #[must_use]
    pub fn dialysis_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.dialysis_model)
    }
}
