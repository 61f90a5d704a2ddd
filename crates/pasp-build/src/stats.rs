use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a [`crate::Preprocessor`].
#[derive(Debug, Default)]
pub struct BuildStats {
    requests: AtomicU64,
    translations: AtomicU64,
    up_to_date: AtomicU64,
    joins: AtomicU64,
    failures: AtomicU64,
}

/// Plain copy of [`BuildStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Calls to `process`.
    pub requests: u64,
    /// Times the translator actually ran and replaced a target.
    pub translations: u64,
    /// Owner found the target current and skipped translation.
    pub up_to_date: u64,
    /// Callers that waited on another caller's translation.
    pub joins: u64,
    pub failures: u64,
}

impl BuildStats {
    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_translation(&self) {
        self.translations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_up_to_date(&self) {
        self.up_to_date.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            translations: self.translations.load(Ordering::Relaxed),
            up_to_date: self.up_to_date.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
