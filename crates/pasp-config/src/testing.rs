//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - A temporary document root
//! - Template source files with controlled modification times
//!
//! # Usage
//!
//! ```ignore
//! use pasp_config::testing::TestEnvironment;
//!
//! let env = TestEnvironment::new().unwrap();
//! let src = env.create_file("site/index.pasp", b"Hello\r\n").unwrap();
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with a private document root
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Document root that logical paths resolve under
    pub document_root: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let document_root = temp_dir.path().join("wwwroot");
        std::fs::create_dir_all(&document_root)?;

        Ok(Self {
            _temp_dir: temp_dir,
            document_root,
            test_id,
        })
    }

    /// Local path of a root-relative file
    pub fn local(&self, relative_path: &str) -> PathBuf {
        self.document_root.join(relative_path.trim_start_matches('/'))
    }

    /// Create a test file with content
    pub fn create_file(&self, relative_path: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.local(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a test directory
    pub fn create_dir(&self, relative_path: &str) -> anyhow::Result<PathBuf> {
        let path = self.local(relative_path);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Set the modification time of `path` to `age` before now.
    pub fn set_age(&self, path: &Path, age: Duration) -> anyhow::Result<()> {
        let when = SystemTime::now()
            .checked_sub(age)
            .ok_or_else(|| anyhow::anyhow!("age {:?} predates the epoch", age))?;
        filetime::set_file_mtime(path, FileTime::from_system_time(when))?;
        Ok(())
    }

    /// Make `path` share the exact modification time of `reference`.
    pub fn copy_mtime(&self, reference: &Path, path: &Path) -> anyhow::Result<()> {
        let meta = std::fs::metadata(reference)?;
        filetime::set_file_mtime(path, FileTime::from_last_modification_time(&meta))?;
        Ok(())
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
