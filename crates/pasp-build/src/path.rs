//! Source to target path derivation.
//!
//! `/site/dir/page.pasp` is translated into `/site/dir/__page.asp`, next to
//! its source.

use crate::error::{BuildError, Result};

/// Longest logical path accepted, exclusive.
pub const MAX_PATH: usize = 260;

/// Length of the source extension without its dot (`pasp`).
pub const SOURCE_EXTENSION_LEN: usize = 4;

/// Prepended to the target file name.
pub const TARGET_MARKER: &str = "__";

/// Extension of translated files.
pub const TARGET_EXTENSION: &str = "asp";

/// Map a logical source path to the path of its translated script.
///
/// The path must hold a `/`-separated file name with a four-character
/// extension, be shorter than [`MAX_PATH`] and carry no query string.
pub fn derive_target_path(source: &str) -> Result<String> {
    let bytes = source.as_bytes();
    let len = bytes.len();

    if len < SOURCE_EXTENSION_LEN + 1 {
        return Err(BuildError::invalid(source, "too short"));
    }
    if len >= MAX_PATH {
        return Err(BuildError::invalid(source, "too long"));
    }
    if bytes.contains(&b'?') {
        return Err(BuildError::invalid(source, "contains a query string"));
    }

    let dot = len - (SOURCE_EXTENSION_LEN + 1);
    if bytes[dot] != b'.' {
        return Err(BuildError::invalid(source, "extension is not four characters"));
    }
    let slash = match bytes[..dot].iter().rposition(|&b| b == b'/') {
        Some(slash) => slash,
        None => return Err(BuildError::invalid(source, "no directory separator")),
    };

    let dir = &source[..=slash];
    let stem = &source[slash + 1..dot];
    let mut target = String::with_capacity(len + TARGET_MARKER.len());
    target.push_str(dir);
    target.push_str(TARGET_MARKER);
    target.push_str(stem);
    target.push('.');
    target.push_str(TARGET_EXTENSION);
    Ok(target)
}
