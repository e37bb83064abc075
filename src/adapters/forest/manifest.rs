//! Model directory integrity: SHA-256 manifest and Ed25519 signature.
//!
//! Layout inside the model directory:
//!
//! - `manifest.json`: `{ "version": 1, "created_at": <unix secs>, "files": { name: sha256_hex } }`
//! - `model.sig`: raw 64-byte Ed25519 signature over the manifest bytes
//!
//! Both are produced by the `sign_model` binary. Without a manifest the
//! artifacts load unverified unless signatures are required.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ports::ModelError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

/// Allowed clock skew for `created_at` (seconds).
const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Signed list of model files and their hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<i64>,
    pub files: BTreeMap<String, String>,
}

/// How far the model directory was verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// No manifest present
    Unverified,
    /// Manifest hashes match, no signature
    HashesVerified,
    /// Manifest signature and hashes verified
    Signed,
}

impl std::fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverified => write!(f, "unverified"),
            Self::HashesVerified => write!(f, "hashes verified"),
            Self::Signed => write!(f, "signed"),
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns `ModelError::Integrity` if the key is not 32 valid bytes.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ModelError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| ModelError::Integrity(format!("Invalid public key base64: {e}")))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| ModelError::Integrity("Public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| ModelError::Integrity("Invalid Ed25519 public key".into()))
}

fn verify_signature(
    manifest_bytes: &[u8],
    sig_path: &Path,
    pubkey_b64: Option<&str>,
) -> Result<(), ModelError> {
    let pubkey_b64 = pubkey_b64.ok_or_else(|| {
        ModelError::Integrity(
            "Model signature present but no verifying key configured (NEPHROCHECK_MODEL_PUBKEY_B64)"
                .into(),
        )
    })?;
    let public_key = verifying_key_from_b64(pubkey_b64)?;

    let sig_bytes = fs::read(sig_path)
        .map_err(|e| ModelError::Integrity(format!("Failed to read signature: {e}")))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| ModelError::Integrity("Invalid signature length (expected 64 bytes)".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    public_key
        .verify(manifest_bytes, &signature)
        .map_err(|_| ModelError::Integrity("Invalid model signature".into()))
}

/// Result of [`verify_model_dir`]: the status and the hashes that were checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedDir {
    pub status: IntegrityStatus,
    hashes: BTreeMap<String, String>,
}

impl VerifiedDir {
    fn unverified() -> Self {
        Self {
            status: IntegrityStatus::Unverified,
            hashes: BTreeMap::new(),
        }
    }

    /// Check that an artifact read after verification is the one that was hashed.
    ///
    /// Without a manifest there is nothing to compare against and any file passes.
    ///
    /// # Errors
    /// Returns `ModelError::Integrity` when `actual_hex` differs from the
    /// manifest entry for `file`, or the manifest does not list `file`.
    pub fn check_loaded(&self, file: &str, actual_hex: &str) -> Result<(), ModelError> {
        if self.status == IntegrityStatus::Unverified {
            return Ok(());
        }
        match self.hashes.get(file) {
            Some(expected) if constant_time_eq_str(actual_hex, expected.trim()) => Ok(()),
            Some(_) => Err(ModelError::Integrity(format!(
                "{file} changed after verification"
            ))),
            None => Err(ModelError::Integrity(format!(
                "{MANIFEST_FILE} does not bind {file}"
            ))),
        }
    }
}

/// Verify the model directory before any artifact is loaded.
///
/// `required_files` must all be bound by the manifest when one is present.
/// The returned [`VerifiedDir`] keeps the manifest hashes so loaded bytes can
/// be checked again with [`VerifiedDir::check_loaded`].
///
/// # Errors
/// Returns `ModelError::Integrity` when a required signature or manifest is
/// missing, the signature does not verify, or any listed file's hash differs.
pub fn verify_model_dir(
    model_dir: &Path,
    required_files: &[&str],
    require_signature: bool,
    pubkey_b64: Option<&str>,
) -> Result<VerifiedDir, ModelError> {
    let manifest_path = model_dir.join(MANIFEST_FILE);
    let sig_path = model_dir.join(SIGNATURE_FILE);

    if !manifest_path.exists() {
        if require_signature {
            tracing::error!("Model manifest not found at {:?}", manifest_path);
            return Err(ModelError::Integrity(format!(
                "Signed {MANIFEST_FILE} required in {model_dir:?}"
            )));
        }
        tracing::warn!(
            "No {MANIFEST_FILE} in {:?}; loading models without integrity check",
            model_dir
        );
        return Ok(VerifiedDir::unverified());
    }

    let manifest_bytes = fs::read(&manifest_path)
        .map_err(|e| ModelError::Integrity(format!("Failed to read manifest: {e}")))?;

    let signed = if sig_path.exists() {
        verify_signature(&manifest_bytes, &sig_path, pubkey_b64)?;
        true
    } else if require_signature {
        return Err(ModelError::Integrity(format!(
            "{SIGNATURE_FILE} required in {model_dir:?}"
        )));
    } else {
        false
    };

    let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| ModelError::Integrity(format!("Invalid {MANIFEST_FILE} format: {e}")))?;
    if manifest.version != 1 {
        return Err(ModelError::Integrity(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }
    if let Some(created_at) = manifest.created_at {
        if created_at > unix_now() + MAX_FUTURE_SKEW_SECS {
            return Err(ModelError::Integrity(
                "manifest created_at is in the future".into(),
            ));
        }
    }

    for required in required_files {
        if !manifest.files.contains_key(*required) {
            return Err(ModelError::Integrity(format!(
                "{MANIFEST_FILE} does not bind {required}"
            )));
        }
    }

    for (rel, expected_hex) in &manifest.files {
        let path = model_dir.join(rel);
        let bytes = fs::read(&path).map_err(|e| {
            ModelError::Integrity(format!(
                "Manifest references missing/unreadable file {path:?}: {e}"
            ))
        })?;
        if !constant_time_eq_str(&sha256_hex(&bytes), expected_hex.trim()) {
            return Err(ModelError::Integrity(format!("File hash mismatch for {rel}")));
        }
    }

    let status = if signed {
        IntegrityStatus::Signed
    } else {
        IntegrityStatus::HashesVerified
    };
    tracing::info!("Model directory verified ({status})");
    Ok(VerifiedDir {
        status,
        hashes: manifest.files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use tempfile::tempdir;

    const CKD: &str = "rf_model_ckd_status.json";
    const DIALYSIS: &str = "rf_model_dialysis_needed.json";

    fn copy_shipped_models(dir: &Path) {
        for name in [CKD, DIALYSIS] {
            fs::copy(Path::new("models").join(name), dir.join(name)).expect("copy model");
        }
    }

    fn write_manifest(dir: &Path, files: &[&str]) -> Vec<u8> {
        write_manifest_with(dir, files, 1, Some(unix_now()))
    }

    fn write_manifest_with(
        dir: &Path,
        files: &[&str],
        version: u32,
        created_at: Option<i64>,
    ) -> Vec<u8> {
        let files = files
            .iter()
            .map(|name| {
                let bytes = fs::read(dir.join(name)).unwrap_or_default();
                ((*name).to_string(), sha256_hex(&bytes))
            })
            .collect();
        let manifest = ModelManifest {
            version,
            created_at,
            files,
        };
        let bytes = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        bytes
    }

    fn signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    fn pubkey_b64(key: &SigningKey) -> String {
        base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes())
    }

    #[test]
    fn test_no_manifest_is_unverified() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());

        let verified =
            verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None).expect("Should pass");
        assert_eq!(verified.status, IntegrityStatus::Unverified);
    }

    #[test]
    fn test_no_manifest_fails_when_signature_required() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());

        let err = verify_model_dir(temp.path(), &[CKD, DIALYSIS], true, None)
            .expect_err("Should fail closed");
        assert!(matches!(err, ModelError::Integrity(_)));
    }

    #[test]
    fn test_manifest_hashes_verified() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        write_manifest(temp.path(), &[CKD, DIALYSIS]);

        let verified =
            verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None).expect("Should pass");
        assert_eq!(verified.status, IntegrityStatus::HashesVerified);
    }

    #[test]
    fn test_tampered_model_is_rejected() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        write_manifest(temp.path(), &[CKD, DIALYSIS]);

        let path = temp.path().join(CKD);
        let mut bytes = fs::read(&path).expect("read");
        bytes.push(b'\n');
        fs::write(&path, bytes).expect("write");

        let err = verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None)
            .expect_err("Should detect tampering");
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_manifest_must_bind_required_files() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        write_manifest(temp.path(), &[CKD]);

        let err = verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None)
            .expect_err("Should fail");
        assert!(err.to_string().contains(DIALYSIS));
    }

    #[test]
    fn test_signed_manifest_verified() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        let manifest = write_manifest(temp.path(), &[CKD, DIALYSIS]);

        let key = signing_key();
        let sig: Signature = key.sign(&manifest);
        fs::write(temp.path().join(SIGNATURE_FILE), sig.to_bytes()).expect("write sig");

        let verified = verify_model_dir(
            temp.path(),
            &[CKD, DIALYSIS],
            true,
            Some(pubkey_b64(&key).as_str()),
        )
        .expect("Should verify");
        assert_eq!(verified.status, IntegrityStatus::Signed);
    }

    #[test]
    fn test_signature_from_other_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        let manifest = write_manifest(temp.path(), &[CKD, DIALYSIS]);

        let sig: Signature = signing_key().sign(&manifest);
        fs::write(temp.path().join(SIGNATURE_FILE), sig.to_bytes()).expect("write sig");

        let other = pubkey_b64(&signing_key());
        let err = verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, Some(other.as_str()))
            .expect_err("Should reject");
        assert!(err.to_string().contains("Invalid model signature"));
    }

    #[test]
    fn test_signature_without_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        let manifest = write_manifest(temp.path(), &[CKD, DIALYSIS]);

        let sig: Signature = signing_key().sign(&manifest);
        fs::write(temp.path().join(SIGNATURE_FILE), sig.to_bytes()).expect("write sig");

        assert!(verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None).is_err());
    }

    #[test]
    fn test_future_created_at_is_rejected() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        write_manifest_with(temp.path(), &[CKD, DIALYSIS], 1, Some(unix_now() + 3600));

        let err = verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None)
            .expect_err("Should reject");
        assert!(err.to_string().contains("in the future"));

        // Small clock skew is tolerated.
        write_manifest_with(temp.path(), &[CKD, DIALYSIS], 1, Some(unix_now() + 60));
        assert!(verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None).is_ok());
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        write_manifest_with(temp.path(), &[CKD, DIALYSIS], 2, Some(unix_now()));

        let err = verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None)
            .expect_err("Should reject");
        assert!(err.to_string().contains("Unsupported manifest version: 2"));
    }

    #[test]
    fn test_missing_signature_fails_when_required() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        write_manifest(temp.path(), &[CKD, DIALYSIS]);

        let key = pubkey_b64(&signing_key());
        let err = verify_model_dir(temp.path(), &[CKD, DIALYSIS], true, Some(key.as_str()))
            .expect_err("Should fail closed");
        assert!(err.to_string().contains(SIGNATURE_FILE));
    }

    #[test]
    fn test_check_loaded_detects_swap_after_verification() {
        let temp = tempdir().expect("tempdir");
        copy_shipped_models(temp.path());
        write_manifest(temp.path(), &[CKD, DIALYSIS]);
        let verified =
            verify_model_dir(temp.path(), &[CKD, DIALYSIS], false, None).expect("Should pass");

        let original = fs::read(temp.path().join(CKD)).expect("read");
        assert!(verified.check_loaded(CKD, &sha256_hex(&original)).is_ok());

        // Another valid forest put in place once the hashes were checked.
        fs::copy(temp.path().join(DIALYSIS), temp.path().join(CKD)).expect("swap");
        let swapped = fs::read(temp.path().join(CKD)).expect("read");
        let err = verified
            .check_loaded(CKD, &sha256_hex(&swapped))
            .expect_err("Should detect swap");
        assert!(err.to_string().contains("changed after verification"));
        assert!(verified.check_loaded("other.json", &sha256_hex(&swapped)).is_err());
    }

    #[test]
    fn test_check_loaded_without_manifest_accepts_any_file() {
        let verified = VerifiedDir::unverified();
        assert!(verified.check_loaded(CKD, &sha256_hex(b"{}")).is_ok());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq_str("abc", "abc"));
        assert!(!constant_time_eq_str("abc", "abd"));
        assert!(!constant_time_eq_str("abc", "abcd"));
    }
}
