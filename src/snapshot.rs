//! Snapshot store: last normalized text seen for each resource.
//!
//! One plain-text file per resource under `<data_dir>/snapshots/`. The file
//! name is derived from the resource id by percent-escaping every character
//! that is unsafe in a file name (path separators included), so distinct ids
//! map to distinct files. Very long ids are truncated and suffixed with a
//! SHA-256 digest of the full id.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, WatchError};
use crate::types::ResourceId;
use crate::utils::fs::write_atomic;

/// Longest file name produced before falling back to prefix + digest.
const MAX_KEY_LEN: usize = 200;
/// Bytes of escaped id kept in front of the digest for long ids.
const LONG_KEY_PREFIX: usize = 128;

/// File-per-resource snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            WatchError::Storage(format!(
                "Failed to create snapshot directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Last stored text for `id`, or `None` if it was never stored.
    pub fn get(&self, id: &ResourceId) -> Result<Option<String>> {
        let path = self.path_for(id);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WatchError::Storage(format!(
                "Failed to read snapshot {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Overwrite the snapshot for `id`. Durable when this returns.
    pub fn put(&self, id: &ResourceId, text: &str) -> Result<()> {
        let path = self.path_for(id);
        write_atomic(&path, text.as_bytes())?;
        debug!("Stored snapshot for {} ({} bytes)", id, text.len());
        Ok(())
    }

    /// Remove the snapshot for `id`. Absent snapshots are not an error.
    pub fn delete(&self, id: &ResourceId) -> Result<()> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted snapshot for {}", id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WatchError::Storage(format!(
                "Failed to delete snapshot {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.path_for(id).is_file()
    }

    pub fn path_for(&self, id: &ResourceId) -> PathBuf {
        self.dir.join(snapshot_key(id))
    }
}

/// File name for a resource id.
pub fn snapshot_key(id: &ResourceId) -> String {
    let escaped = escape(id.as_str());
    if escaped.len() <= MAX_KEY_LEN {
        return escaped;
    }

    let mut cut = LONG_KEY_PREFIX;
    while !escaped.is_char_boundary(cut) {
        cut -= 1;
    }
    let digest = Sha256::digest(id.as_str().as_bytes());
    format!("{}~{}", &escaped[..cut], hex::encode(digest))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, ch) in raw.chars().enumerate() {
        let unsafe_char = matches!(
            ch,
            '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'
        ) || ch.is_control()
            || (i == 0 && ch == '.');

        if unsafe_char {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        } else {
            out.push(ch);
        }
    }
    out
}
