//! # pasp-coalesce
//!
//! A fixed-capacity table that coalesces concurrent requests for the same
//! key: the first caller does the work, everyone else waits for its result.
//!
//! ```
//! use pasp_coalesce::RequestTable;
//!
//! let table: RequestTable<u32> = RequestTable::default();
//! let guard = table.enter("/site/index.pasp").unwrap();
//! assert!(guard.is_new());
//! guard.complete(1);
//! assert!(table.is_empty());
//! ```

mod completion;
pub mod table;

use std::time::Duration;

pub use table::{Acquired, RequestGuard, RequestTable, SlotHandle, SlotInfo};

/// Request table errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoalesceError {
    #[error("timed out after {waited:?} waiting for a free request slot for {key}")]
    Timeout { key: String, waited: Duration },

    #[error("request for {key} was abandoned by its owner")]
    Abandoned { key: String },

    #[error("slot handle no longer refers to a live request")]
    StaleHandle,

    #[error("request table capacity must be at least 1")]
    InvalidCapacity,
}

pub type Result<T> = std::result::Result<T, CoalesceError>;
