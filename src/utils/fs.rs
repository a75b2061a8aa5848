//! Durable file writes.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, WatchError};

/// Suffix of the in-flight temp file. Snapshot keys always follow `%` with
/// two hex digits, so no key can end in this.
pub const TMP_SUFFIX: &str = ".%tmp";

/// Write `contents` to `path` so that a crash leaves either the old file or
/// the new one, never a torn write.
///
/// Data goes to a sibling temp file which is fsynced and then renamed over
/// the target. Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent).map_err(|e| {
            WatchError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| WatchError::Storage(format!("Not a file path: {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(TMP_SUFFIX);
    let tmp_path = path.with_file_name(tmp_name);

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        WatchError::Storage(format!("Failed to write {}: {}", path.display(), e))
    })
}
