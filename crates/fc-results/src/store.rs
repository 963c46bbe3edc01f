//! On-disk cache of downloaded result archives.

use crate::hash::archive_digest;
use crate::{ResultsError, ResultsResult};
use fc_core::RunKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const ARCHIVE_FILE: &str = "result.zip";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub owner: String,
    pub run_id: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub cached_at: String,
}

#[derive(Clone, Debug)]
pub struct ResultStore {
    root_dir: PathBuf,
}

impl ResultStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Owner and run ids are user input; each is percent-encoded into a single
    /// path component, so distinct keys get distinct directories and a key can
    /// never escape the cache directory.
    fn run_dir(&self, key: &RunKey) -> PathBuf {
        self.root_dir
            .join(encode_component(&key.owner))
            .join(encode_component(&key.run_id))
    }

    pub fn has_archive(&self, key: &RunKey) -> bool {
        let dir = self.run_dir(key);
        dir.join(MANIFEST_FILE).exists() && dir.join(ARCHIVE_FILE).exists()
    }

    pub fn save_archive(&self, key: &RunKey, bytes: &[u8]) -> ResultsResult<ArchiveManifest> {
        let dir = self.run_dir(key);
        fs::create_dir_all(&dir)?;

        fs::write(dir.join(ARCHIVE_FILE), bytes)?;

        let manifest = ArchiveManifest {
            owner: key.owner.clone(),
            run_id: key.run_id.clone(),
            sha256: archive_digest(bytes),
            size_bytes: bytes.len() as u64,
            cached_at: chrono::Utc::now().to_rfc3339(),
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        Ok(manifest)
    }

    pub fn load_manifest(&self, key: &RunKey) -> ResultsResult<ArchiveManifest> {
        let path = self.run_dir(key).join(MANIFEST_FILE);
        if !path.exists() {
            return Err(ResultsError::ArchiveNotFound { key: key.clone() });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read a cached archive, verifying it against the digest recorded at save time.
    pub fn load_archive(&self, key: &RunKey) -> ResultsResult<Vec<u8>> {
        let manifest = self.load_manifest(key)?;
        if manifest.owner != key.owner || manifest.run_id != key.run_id {
            let found = RunKey::new(manifest.owner, manifest.run_id);
            warn!(owner = %key.owner, run_id = %key.run_id, found = %found, "cached manifest names another run");
            return Err(ResultsError::ManifestMismatch {
                key: key.clone(),
                found,
            });
        }
        let path = self.run_dir(key).join(ARCHIVE_FILE);
        if !path.exists() {
            return Err(ResultsError::ArchiveNotFound { key: key.clone() });
        }
        let bytes = fs::read(path)?;
        let digest = archive_digest(&bytes);
        if digest != manifest.sha256 {
            warn!(owner = %key.owner, run_id = %key.run_id, "cached archive digest mismatch");
            return Err(ResultsError::InvalidHash(format!(
                "{key}: expected {}, found {digest}",
                manifest.sha256
            )));
        }
        Ok(bytes)
    }

    pub fn list_archives(&self) -> ResultsResult<Vec<ArchiveManifest>> {
        let mut manifests = Vec::new();
        if !self.root_dir.exists() {
            return Ok(manifests);
        }
        for owner_entry in fs::read_dir(&self.root_dir)? {
            let owner_entry = owner_entry?;
            if !owner_entry.path().is_dir() {
                continue;
            }
            for run_entry in fs::read_dir(owner_entry.path())? {
                let manifest_path = run_entry?.path().join(MANIFEST_FILE);
                if !manifest_path.exists() {
                    continue;
                }
                let content = fs::read_to_string(manifest_path)?;
                if let Ok(manifest) = serde_json::from_str::<ArchiveManifest>(&content) {
                    manifests.push(manifest);
                }
            }
        }
        manifests.sort_by(|a, b| (&a.owner, &a.run_id).cmp(&(&b.owner, &b.run_id)));
        Ok(manifests)
    }

    pub fn delete_archive(&self, key: &RunKey) -> ResultsResult<()> {
        let dir = self.run_dir(key);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}

/// `[A-Za-z0-9_-]` and non-leading dots pass through; every other byte,
/// `%` included, becomes `%XX`. The empty string maps to a lone `%`, which no
/// encoded value can produce.
fn encode_component(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(raw.len());
    for (i, b) in raw.bytes().enumerate() {
        let plain = b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || (b == b'.' && i > 0);
        if plain {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_blocks_traversal() {
        assert_eq!(encode_component(".."), "%2E.");
        assert_eq!(encode_component("a/b"), "a%2Fb");
        assert_eq!(encode_component(""), "%");
        assert_eq!(encode_component("run-01.v2"), "run-01.v2");
    }

    #[test]
    fn encoding_keeps_keys_apart() {
        assert_ne!(encode_component("a/b"), encode_component("a_b"));
        assert_ne!(encode_component("a%2Fb"), encode_component("a/b"));
        assert_ne!(encode_component("洪水"), encode_component("台风"));
        assert_eq!(encode_component("洪"), "%E6%B4%AA");
    }
}
