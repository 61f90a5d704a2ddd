//! Atomic replacement of a target file.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use pasp_scan::StreamWriter;

use crate::error::{BuildError, Result};

/// Sink handed to the producer in [`write_atomic`].
pub type FileSink = StreamWriter<BufWriter<File>>;

/// Sibling temp path unique to this process and thread.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_name = format!(
        "{}.{}.{:?}.tmp",
        name,
        std::process::id(),
        std::thread::current().id()
    );
    target.with_file_name(temp_name)
}

/// Write `target` through `produce` so that readers only ever see the old
/// file or the complete new one.
///
/// Output goes to a sibling temp file that is optionally fsynced and then
/// renamed over `target`. The temp file is removed on any failure. Returns
/// the number of bytes written.
pub fn write_atomic<F>(target: &Path, sync: bool, produce: F) -> Result<u64>
where
    F: FnOnce(&mut FileSink) -> Result<()>,
{
    let temp_path = temp_path_for(target);

    let written = match write_temp(&temp_path, sync, produce) {
        Ok(written) => written,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(BuildError::io(target, e));
    }
    Ok(written)
}

fn write_temp<F>(temp_path: &Path, sync: bool, produce: F) -> Result<u64>
where
    F: FnOnce(&mut FileSink) -> Result<()>,
{
    let file = File::create(temp_path).map_err(|e| BuildError::io(temp_path, e))?;
    let mut sink = StreamWriter::new(BufWriter::new(file));
    produce(&mut sink)?;

    let written = sink.bytes_written();
    let file = sink
        .into_inner()
        .into_inner()
        .map_err(|e| BuildError::io(temp_path, e.into_error()))?;
    if sync {
        file.sync_all().map_err(|e| BuildError::io(temp_path, e))?;
    }
    Ok(written)
}
