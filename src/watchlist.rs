//! Persistent, ordered list of watched resources.
//!
//! Stored as a single JSON array of URL strings (`<data_dir>/websites.json`)
//! and rewritten in full after every mutation. A missing or unparsable file
//! is treated as "no prior state": the list starts empty and the file is
//! rewritten immediately.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, WatchError};
use crate::types::ResourceId;
use crate::utils::fs::write_atomic;

/// Ordered watch list backed by a JSON file.
#[derive(Debug)]
pub struct WatchList {
    entries: Vec<ResourceId>,
    storage_path: PathBuf,
    allow_duplicates: bool,
}

impl WatchList {
    /// Load the list from `path`, self-healing a missing or corrupt file.
    ///
    /// Only I/O failures other than "not found" and failures to write the
    /// fresh empty file are returned as errors.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let storage_path = path.into();
        let (entries, needs_rewrite) = Self::read_or_reset(&storage_path)?;

        let list = Self {
            entries,
            storage_path,
            allow_duplicates: false,
        };
        if needs_rewrite {
            list.save()?;
        }
        Ok(list)
    }

    /// Replace the in-memory entries with what is on disk now, picking up
    /// edits made by another process. Healing follows the same rules as
    /// [`WatchList::load`]; on error the entries are left untouched.
    pub fn reload(&mut self) -> Result<()> {
        let (entries, needs_rewrite) = Self::read_or_reset(&self.storage_path)?;
        if needs_rewrite {
            let previous = std::mem::replace(&mut self.entries, entries);
            if let Err(e) = self.save() {
                self.entries = previous;
                return Err(e);
            }
        } else {
            self.entries = entries;
        }
        Ok(())
    }

    /// Permit the same id to be added more than once.
    pub fn with_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    /// Append `id` and persist. Returns `false` (and leaves the list alone)
    /// when duplicates are disallowed and `id` is already present.
    ///
    /// If persisting fails the in-memory list is rolled back.
    pub fn add(&mut self, id: ResourceId) -> Result<bool> {
        if !self.allow_duplicates && self.entries.contains(&id) {
            debug!("{} is already watched", id);
            return Ok(false);
        }

        self.entries.push(id);
        if let Err(e) = self.save() {
            self.entries.pop();
            return Err(e);
        }
        if let Some(id) = self.entries.last() {
            info!("Watching {}", id);
        }
        Ok(true)
    }

    /// Remove the first occurrence of `id` and persist. Returns whether
    /// anything was removed; nothing is written when it was not present.
    pub fn remove(&mut self, id: &ResourceId) -> Result<bool> {
        let Some(index) = self.entries.iter().position(|e| e == id) else {
            return Ok(false);
        };

        let removed = self.entries.remove(index);
        if let Err(e) = self.save() {
            self.entries.insert(index, removed);
            return Err(e);
        }
        info!("Stopped watching {}", id);
        Ok(true)
    }

    /// Ordered copy of the current entries.
    pub fn list(&self) -> Vec<ResourceId> {
        self.entries.clone()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.entries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Rewrite the whole list to disk.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.storage_path, json.as_bytes())
    }

    /// Entries on disk, plus whether the file must be rewritten because it
    /// was missing or corrupt.
    fn read_or_reset(path: &Path) -> Result<(Vec<ResourceId>, bool)> {
        match Self::read(path) {
            Ok(Some(entries)) => Ok((entries, false)),
            Ok(None) => {
                debug!("No watch list at {}, starting empty", path.display());
                Ok((Vec::new(), true))
            }
            Err(WatchError::StorageCorrupt(reason)) => {
                warn!(
                    "Watch list {} is unreadable ({}), resetting to empty",
                    path.display(),
                    reason
                );
                Ok((Vec::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` when the file does not exist.
    fn read(path: &Path) -> Result<Option<Vec<ResourceId>>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(WatchError::StorageCorrupt(e.to_string()));
            }
            Err(e) => {
                return Err(WatchError::Storage(format!(
                    "Failed to read watch list {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| WatchError::StorageCorrupt(e.to_string()))
    }
}
