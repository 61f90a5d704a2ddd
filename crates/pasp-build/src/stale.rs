use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::error::{BuildError, Result};

/// Whether `target` has to be regenerated from `source`.
///
/// A missing (or unreadable) target is stale. A target that is read-only or
/// a directory can never be replaced and fails with `PermissionDenied`.
/// Otherwise the target is stale when its modification time is strictly
/// earlier than the source's.
pub fn is_stale(source: &Path, target: &Path) -> Result<bool> {
    let target_meta = match fs::metadata(target) {
        Ok(meta) => meta,
        Err(_) => return Ok(true),
    };

    if target_meta.is_dir() {
        return Err(BuildError::PermissionDenied {
            path: target.to_path_buf(),
            reason: "target is a directory".to_string(),
        });
    }
    if target_meta.permissions().readonly() {
        return Err(BuildError::PermissionDenied {
            path: target.to_path_buf(),
            reason: "target is read-only".to_string(),
        });
    }

    let source_meta = fs::metadata(source).map_err(|e| BuildError::io(source, e))?;
    if source_meta.is_dir() {
        return Err(BuildError::Io {
            path: source.to_path_buf(),
            source: Arc::new(io::Error::other("source is a directory")),
        });
    }

    let source_mtime = source_meta.modified().map_err(|e| BuildError::io(source, e))?;
    let target_mtime = target_meta.modified().map_err(|e| BuildError::io(target, e))?;
    Ok(source_mtime > target_mtime)
}
