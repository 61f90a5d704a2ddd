//! Logical request paths to local file-system paths.

use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

/// Resolves a logical (URL-style) path to a local file.
pub trait PathMapper: Send + Sync {
    fn map_path(&self, logical: &str) -> Result<PathBuf>;
}

/// Logical paths are already local paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl PathMapper for IdentityMapper {
    fn map_path(&self, logical: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(logical))
    }
}

/// Resolves logical paths under a document root.
///
/// `.` and empty segments are dropped and `..` pops a segment. A path that
/// climbs above the root is refused.
#[derive(Debug, Clone)]
pub struct RootMapper {
    root: PathBuf,
}

impl RootMapper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathMapper for RootMapper {
    fn map_path(&self, logical: &str) -> Result<PathBuf> {
        let mut segments: Vec<&str> = Vec::new();
        for segment in logical.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(BuildError::PermissionDenied {
                            path: PathBuf::from(logical),
                            reason: "path escapes the document root".to_string(),
                        });
                    }
                }
                s => segments.push(s),
            }
        }

        let mut local = self.root.clone();
        local.extend(segments);
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_identity() {
        assert_eq!(
            IdentityMapper.map_path("/srv/a.pasp").unwrap(),
            PathBuf::from("/srv/a.pasp")
        );
    }

    #[test]
    fn test_root_join() {
        let m = RootMapper::new("/var/www");
        assert_eq!(
            m.map_path("/site/./a.pasp").unwrap(),
            PathBuf::from("/var/www/site/a.pasp")
        );
        assert_eq!(
            m.map_path("/site/x/../__a.asp").unwrap(),
            PathBuf::from("/var/www/site/__a.asp")
        );
    }

    #[test]
    fn test_root_escape_is_denied() {
        let m = RootMapper::new("/var/www");
        let err = m.map_path("/../etc/passwd.pasp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(m.map_path("/a/../../b.pasp").is_err());
    }
}
