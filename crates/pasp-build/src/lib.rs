//! # pasp-build
//!
//! Turns `.pasp` templates into script files on demand.
//!
//! [`Preprocessor::process`] derives the target path, takes a slot in the
//! request table and, if it is the first caller for that source, checks
//! staleness and translates. Concurrent callers for the same source wait for
//! that work and share its result.

pub mod context;
pub mod error;
pub mod mapper;
pub mod output;
pub mod path;
pub mod stale;
pub mod stats;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use pasp_coalesce::RequestTable;
use pasp_config::{log_build_debug, log_build_info, log_build_warn, Config};
use tracing::instrument;

pub use context::{ContextScope, CurrentContext, SecurityContext};
pub use error::{BuildError, ErrorKind, Result};
pub use mapper::{IdentityMapper, PathMapper, RootMapper};
pub use path::derive_target_path;
pub use stale::is_stale;
pub use stats::{BuildStats, StatsSnapshot};

/// How a `process` call obtained its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// This call translated the source.
    Rebuilt,
    /// The target was already current.
    UpToDate,
    /// Another concurrent call did the work.
    Joined,
}

/// Result of a successful `process` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Logical path of the translated script.
    pub target: String,
    /// Where the translated script lives on disk.
    pub local_target: PathBuf,
    pub status: ProcessStatus,
}

/// Outcome broadcast from a slot's owner to its joiners.
type SharedOutcome = std::result::Result<ProcessStatus, BuildError>;

/// Cached, coalesced template translator.
pub struct Preprocessor {
    table: RequestTable<SharedOutcome>,
    mapper: Box<dyn PathMapper>,
    context: Box<dyn SecurityContext>,
    sync_output: bool,
    stats: BuildStats,
}

impl Preprocessor {
    pub fn new(table: RequestTable<SharedOutcome>) -> Self {
        Self {
            table,
            mapper: Box::new(IdentityMapper),
            context: Box::new(CurrentContext),
            sync_output: true,
            stats: BuildStats::default(),
        }
    }

    /// Build from configuration. A zero table capacity is an
    /// `InvalidArgument` error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let preprocessor = Self::new(RequestTable::from_config(&config.table)?)
            .with_sync_output(config.build.sync_output);
        Ok(match config.build.document_root() {
            Some(root) => preprocessor.with_mapper(RootMapper::new(root)),
            None => preprocessor,
        })
    }

    pub fn with_mapper(mut self, mapper: impl PathMapper + 'static) -> Self {
        self.mapper = Box::new(mapper);
        self
    }

    pub fn with_security_context(mut self, context: impl SecurityContext + 'static) -> Self {
        self.context = Box::new(context);
        self
    }

    pub fn with_sync_output(mut self, sync: bool) -> Self {
        self.sync_output = sync;
        self
    }

    pub fn table(&self) -> &RequestTable<SharedOutcome> {
        &self.table
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Make sure the translated script for `source` exists and is current.
    ///
    /// At most one translation per source runs at a time; callers arriving
    /// while it runs receive its outcome, success or failure. Nothing is
    /// remembered after the last caller leaves, so a failed source is
    /// retried by the next request.
    #[instrument(skip(self), level = "debug")]
    pub fn process(&self, source: &str) -> Result<ProcessOutput> {
        self.stats.record_request();
        let result = self.process_request(source);
        if let Err(e) = &result {
            self.stats.record_failure();
            log_build_warn!("Request failed", source = source, error = display(e));
        }
        result
    }

    fn process_request(&self, source: &str) -> Result<ProcessOutput> {
        let target = derive_target_path(source)?;
        let local_source = self.mapper.map_path(source)?;
        let local_target = self.mapper.map_path(&target)?;

        let guard = self.table.enter(source)?;
        let status = if guard.is_new() {
            let outcome = self.run_owner(&local_source, &local_target);
            guard.complete(outcome.clone());
            outcome?
        } else {
            self.stats.record_join();
            log_build_debug!("Joining in-flight request", source = source);
            guard.wait()??;
            ProcessStatus::Joined
        };

        Ok(ProcessOutput {
            target,
            local_target,
            status,
        })
    }

    fn run_owner(&self, source: &Path, target: &Path) -> SharedOutcome {
        if !is_stale(source, target)? {
            self.stats.record_up_to_date();
            log_build_debug!("Target is current", target = display(target.display()));
            return Ok(ProcessStatus::UpToDate);
        }

        let data = read_source(source)?;
        let written = {
            let _scope =
                ContextScope::enter(self.context.as_ref()).map_err(|e| BuildError::io(target, e))?;
            output::write_atomic(target, self.sync_output, |sink| {
                pasp_scan::translate(&data, sink)
                    .map(|_| ())
                    .map_err(|e| BuildError::Scan {
                        path: source.to_path_buf(),
                        source: e,
                    })
            })?
        };

        self.stats.record_translation();
        log_build_info!(
            "Translated",
            source = display(source.display()),
            target = display(target.display()),
            bytes = written,
        );
        Ok(ProcessStatus::Rebuilt)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(RequestTable::default())
    }
}

/// Read a whole source file, failing cleanly when it cannot be buffered.
fn read_source(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| BuildError::io(path, e))?;
    let size = file.metadata().map_err(|e| BuildError::io(path, e))?.len();

    let oom = || BuildError::OutOfMemory {
        path: path.to_path_buf(),
        size,
    };
    let capacity = usize::try_from(size).map_err(|_| oom())?;
    let mut data = Vec::new();
    data.try_reserve_exact(capacity).map_err(|_| oom())?;

    file.read_to_end(&mut data)
        .map_err(|e| BuildError::io(path, e))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pasp_config::testing::TestEnvironment;

    #[test]
    fn test_read_source_whole_file() {
        let env = TestEnvironment::new().unwrap();
        let path = env.create_file("a.pasp", b"Hello\r\n").unwrap();
        assert_eq!(read_source(&path).unwrap(), b"Hello\r\n");
    }

    #[test]
    fn test_read_source_missing() {
        let env = TestEnvironment::new().unwrap();
        let err = read_source(&env.local("nope.pasp")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_from_config_uses_document_root() {
        let env = TestEnvironment::new().unwrap();
        env.create_file("site/a.pasp", b"x").unwrap();

        let mut config = Config::default();
        config.build.document_root = env.document_root.clone();
        config.build.sync_output = false;
        config.table.capacity = 3;

        let pre = Preprocessor::from_config(&config).unwrap();
        assert_eq!(pre.table().capacity(), 3);

        let out = pre.process("/site/a.pasp").unwrap();
        assert_eq!(out.target, "/site/__a.asp");
        assert_eq!(out.local_target, env.local("site/__a.asp"));
        assert_eq!(out.status, ProcessStatus::Rebuilt);
    }

    #[test]
    fn test_from_config_rejects_zero_capacity() {
        let mut config = Config::default();
        config.table.capacity = 0;

        match Preprocessor::from_config(&config) {
            Ok(_) => panic!("zero capacity accepted"),
            Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidArgument),
        }
    }
}
