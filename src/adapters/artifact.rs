//! Model artifact helpers: file reading, feature-order checks and the
//! SHA-256 manifest that binds artifacts on disk.
//!
//! The manifest is optional. When `manifest.json` sits next to the models,
//! every artifact the service loads must be listed in it with a matching
//! digest; a missing entry or a mismatch fails closed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{FEATURE_COUNT, FEATURE_NAMES};
use crate::ports::ModelError;

/// File name of the digest manifest inside the model directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Artifact file name -> lowercase SHA-256 hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

impl ModelManifest {
    /// Build a manifest by hashing `files` inside `dir`.
    ///
    /// # Errors
    /// Returns `ModelError::Unreadable` if any file cannot be read.
    pub fn from_files(dir: &Path, files: &[&str]) -> Result<Self, ModelError> {
        let mut digests = BTreeMap::new();
        for name in files {
            let bytes = read_artifact(&dir.join(name))?;
            digests.insert((*name).to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            files: digests,
        })
    }

    /// Load `manifest.json` from `dir`, or `None` when it does not exist.
    ///
    /// # Errors
    /// Returns an error if the manifest exists but is unreadable or malformed.
    pub fn load(dir: &Path) -> Result<Option<Self>, ModelError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = read_artifact(&path)?;
        let manifest: Self =
            serde_json::from_slice(&bytes).map_err(|source| ModelError::Malformed {
                path: path.display().to_string(),
                source,
            })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ModelError::Integrity(format!(
                "unsupported manifest version {} (expected {MANIFEST_VERSION})",
                manifest.version
            )));
        }
        Ok(Some(manifest))
    }

    /// Check that `bytes` are the artifact recorded under `name`.
    ///
    /// # Errors
    /// Returns `ModelError::Integrity` if the file is not listed or its digest differs.
    pub fn verify(&self, name: &str, bytes: &[u8]) -> Result<(), ModelError> {
        let expected = self.files.get(name).ok_or_else(|| {
            ModelError::Integrity(format!("{name} is not listed in {MANIFEST_FILE}"))
        })?;
        let actual = sha256_hex(bytes);
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(ModelError::Integrity(format!(
                "digest mismatch for {name}: manifest {expected}, file {actual}"
            )));
        }
        Ok(())
    }

    /// Write the manifest as pretty JSON into `dir`.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be written.
    pub fn write(&self, dir: &Path) -> std::io::Result<()> {
        let bytes = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(dir.join(MANIFEST_FILE), bytes)
    }
}

/// Lowercase hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Read an artifact file, attaching its path to any IO error.
///
/// # Errors
/// Returns `ModelError::Unreadable` if the file cannot be read.
pub fn read_artifact(path: &Path) -> Result<Vec<u8>, ModelError> {
    std::fs::read(path).map_err(|source| ModelError::Unreadable {
        path: path.display().to_string(),
        source,
    })
}

/// Parse artifact bytes as JSON.
///
/// # Errors
/// Returns `ModelError::Malformed` on invalid JSON or schema mismatch.
pub fn parse_artifact<T>(path: &Path, bytes: &[u8]) -> Result<T, ModelError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(bytes).map_err(|source| ModelError::Malformed {
        path: path.display().to_string(),
        source,
    })
}

/// Reject artifacts trained on a different input layout.
///
/// `declared` is the feature count stored in the artifact; `names`, when the
/// exporter recorded them, must equal the serving order exactly.
///
/// # Errors
/// Returns `ModelError::Incompatible` on any mismatch.
pub fn check_feature_layout(declared: usize, names: Option<&[String]>) -> Result<(), ModelError> {
    if declared != FEATURE_COUNT {
        return Err(ModelError::Incompatible(format!(
            "model expects {declared} features, service provides {FEATURE_COUNT}"
        )));
    }
    if let Some(names) = names {
        if names.len() != FEATURE_COUNT || names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b) {
            return Err(ModelError::Incompatible(format!(
                "feature order mismatch: model {names:?}, service {FEATURE_NAMES:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_manifest_roundtrip_and_verify() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        std::fs::write(dir.join("a.json"), b"{\"a\":1}").expect("write a");
        std::fs::write(dir.join("b.json"), b"{\"b\":2}").expect("write b");

        let manifest = ModelManifest::from_files(dir, &["a.json", "b.json"]).expect("hash");
        manifest.write(dir).expect("write manifest");

        let loaded = ModelManifest::load(dir)
            .expect("load manifest")
            .expect("manifest present");
        assert_eq!(loaded, manifest);
        loaded.verify("a.json", b"{\"a\":1}").expect("digest matches");

        let err = loaded.verify("a.json", b"{\"a\":2}").expect_err("tampered");
        assert!(err.to_string().contains("digest mismatch"));

        let err = loaded.verify("c.json", b"{}").expect_err("unlisted");
        assert!(err.to_string().contains("not listed"));
    }

    #[test]
    fn test_manifest_absent_is_none() {
        let temp = tempdir().expect("tempdir");
        assert!(ModelManifest::load(temp.path()).expect("no error").is_none());
    }

    #[test]
    fn test_manifest_rejects_unknown_version() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(
            temp.path().join(MANIFEST_FILE),
            br#"{"version": 7, "files": {}}"#,
        )
        .expect("write manifest");
        let err = ModelManifest::load(temp.path()).expect_err("must fail");
        assert!(matches!(err, ModelError::Integrity(_)));
    }

    #[test]
    fn test_feature_layout_checks() {
        assert!(check_feature_layout(FEATURE_COUNT, None).is_ok());
        assert!(check_feature_layout(9, None).is_err());

        let names: Vec<String> = FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect();
        assert!(check_feature_layout(FEATURE_COUNT, Some(&names)).is_ok());

        let mut swapped = names.clone();
        swapped.swap(0, 1);
        let err = check_feature_layout(FEATURE_COUNT, Some(&swapped)).expect_err("reordered");
        assert!(err.to_string().contains("feature order mismatch"));
    }

    #[test]
    fn test_read_artifact_missing_file() {
        let err = read_artifact(Path::new("/nonexistent/model.json")).expect_err("missing");
        assert!(matches!(err, ModelError::Unreadable { .. }));
    }
}
