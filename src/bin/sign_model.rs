//! Model signing utility for Nephrocheck forests.
//!
//! Two subcommands:
//!
//! ```bash
//! sign_model keygen --out-seed <path> [--out-pub <path>] [--force]
//! sign_model sign <model_dir>
//! ```
//!
//! `keygen` writes a base64 Ed25519 seed (0600 on Unix) and optionally the
//! base64 public key. `sign` hashes every model JSON in `<model_dir>`, writes
//! `manifest.json` and signs it into `model.sig`.
//!
//! The signing seed is read from `NEPHROCHECK_MODEL_SIGNING_KEY_B64_FILE`, the
//! Docker secret `/run/secrets/nephrocheck_model_signing_key_b64`, or (debug
//! builds only) `NEPHROCHECK_MODEL_SIGNING_KEY_B64`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use nephrocheck::adapters::forest::manifest::{
    sha256_hex, verify_model_dir, ModelManifest, MANIFEST_FILE, SIGNATURE_FILE,
};

const KEY_FILE_ENV: &str = "NEPHROCHECK_MODEL_SIGNING_KEY_B64_FILE";
const DEV_KEY_ENV: &str = "NEPHROCHECK_MODEL_SIGNING_KEY_B64";
const DOCKER_SECRET_PATH: &str = "/run/secrets/nephrocheck_model_signing_key_b64";

const USAGE: &str = "Usage:\n  sign_model keygen --out-seed <path> [--out-pub <path>] [--force]\n  sign_model sign <model_dir>";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    Keygen {
        out_seed: PathBuf,
        out_pub: Option<PathBuf>,
        force: bool,
    },
    Sign {
        model_dir: PathBuf,
    },
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Command> {
    match args.next().as_deref() {
        Some("keygen") => {
            let mut out_seed = None;
            let mut out_pub = None;
            let mut force = false;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--out-seed" => out_seed = args.next().map(PathBuf::from),
                    "--out-pub" => {
                        let path = args.next().ok_or_else(|| anyhow!(USAGE))?;
                        out_pub = Some(PathBuf::from(path));
                    }
                    "--force" => force = true,
                    other => bail!("Unknown argument {other:?}\n{USAGE}"),
                }
            }
            Ok(Command::Keygen {
                out_seed: out_seed.ok_or_else(|| anyhow!(USAGE))?,
                out_pub,
                force,
            })
        }
        Some("sign") => {
            let model_dir = args.next().map(PathBuf::from).ok_or_else(|| anyhow!(USAGE))?;
            if let Some(extra) = args.next() {
                bail!("Unexpected argument {extra:?}\n{USAGE}");
            }
            Ok(Command::Sign { model_dir })
        }
        _ => bail!(USAGE),
    }
}

fn write_new_file(path: &Path, contents: &str, mode: u32, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Refusing to overwrite existing file {path:?}. Use --force.");
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {parent:?}"))?;
        }
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

fn keygen(out_seed: &Path, out_pub: Option<&Path>, force: bool) -> Result<()> {
    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);

    let verifying_key = SigningKey::from_bytes(&seed.0).verifying_key();
    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());

    write_new_file(out_seed, &seed_b64, 0o600, force)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    if let Some(pub_path) = out_pub {
        write_new_file(pub_path, &pub_b64, 0o644, force)?;
        println!("Wrote public key (base64) to {pub_path:?}");
    }

    // Non-secret material only.
    println!("NEPHROCHECK_MODEL_PUBKEY_B64={pub_b64}");
    Ok(())
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    let secret = if let Ok(path) = env::var(KEY_FILE_ENV) {
        Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        )
    } else if Path::new(DOCKER_SECRET_PATH).exists() {
        Zeroizing::new(
            fs::read_to_string(DOCKER_SECRET_PATH).context("Failed reading docker secret")?,
        )
    } else if cfg!(debug_assertions) && env::var(DEV_KEY_ENV).is_ok() {
        Zeroizing::new(env::var(DEV_KEY_ENV)?)
    } else {
        bail!(
            "Missing signing key. Provide {KEY_FILE_ENV} or {DOCKER_SECRET_PATH} ({DEV_KEY_ENV} is honoured in debug builds only)."
        );
    };

    let trimmed = Zeroizing::new(secret.trim().to_string());
    if trimmed.is_empty() {
        bail!("Empty signing key");
    }
    Ok(trimmed)
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.as_str())
            .context("Invalid base64 in signing key")?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

/// Model JSON files in `model_dir`, excluding the manifest itself.
fn model_files(model_dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(model_dir).with_context(|| format!("Failed to read {model_dir:?}"))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !path.is_file() || !name.ends_with(".json") || name == MANIFEST_FILE {
            continue;
        }
        let bytes = fs::read(&path).with_context(|| format!("Failed to read {path:?}"))?;
        files.insert(name.to_string(), sha256_hex(&bytes));
    }
    Ok(files)
}

fn sign(model_dir: &Path) -> Result<()> {
    let files = model_files(model_dir)?;
    if files.is_empty() {
        bail!("No model JSON found in {model_dir:?}");
    }

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes());

    let manifest = ModelManifest {
        version: 1,
        created_at: Some(chrono::Utc::now().timestamp()),
        files,
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes()).with_context(|| format!("Failed to write {sig_path:?}"))?;

    // Read back through the same check the application runs at startup.
    let bound: Vec<&str> = manifest.files.keys().map(String::as_str).collect();
    verify_model_dir(model_dir, &bound, true, Some(pub_b64.as_str()))
        .context("Written manifest failed verification")?;

    println!("Signed manifest: {manifest_path:?}");
    for name in &bound {
        println!("  {name}");
    }
    println!("Wrote signature: {sig_path:?}");
    println!("NEPHROCHECK_MODEL_PUBKEY_B64={pub_b64}");
    Ok(())
}

fn main() -> Result<()> {
    match parse_args(env::args().skip(1))? {
        Command::Keygen {
            out_seed,
            out_pub,
            force,
        } => keygen(&out_seed, out_pub.as_deref(), force),
        Command::Sign { model_dir } => sign(&model_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| (*s).to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_keygen() {
        let cmd = parse_args(args(&["keygen", "--out-seed", "k.b64", "--force"])).unwrap();
        assert!(matches!(
            cmd,
            Command::Keygen { ref out_seed, out_pub: None, force: true } if out_seed == Path::new("k.b64")
        ));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["keygen"])).is_err());
        assert!(parse_args(args(&["sign"])).is_err());
        assert!(parse_args(args(&["sign", "a", "b"])).is_err());
    }

    #[test]
    fn test_keygen_refuses_overwrite() {
        let temp = tempfile::tempdir().unwrap();
        let seed_path = temp.path().join("seed.b64");
        keygen(&seed_path, None, false).unwrap();

        let seed = fs::read_to_string(&seed_path).unwrap();
        assert_eq!(general_purpose::STANDARD.decode(seed.trim()).unwrap().len(), 32);
        assert!(keygen(&seed_path, None, false).is_err());
        assert!(keygen(&seed_path, None, true).is_ok());
    }

    #[test]
    fn test_model_files_skips_manifest() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("rf_model_a.json"), b"{}").unwrap();
        fs::write(temp.path().join(MANIFEST_FILE), b"{}").unwrap();
        fs::write(temp.path().join("notes.txt"), b"x").unwrap();

        let files = model_files(temp.path()).unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["rf_model_a.json"]);
    }
}
