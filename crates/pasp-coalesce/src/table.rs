//! Fixed-capacity request table.
//!
//! Slots live in a fixed array of cells. A separate permutation array holds
//! cell numbers: its first `count` entries are the live slots sorted by key,
//! the rest are free cells. Lookups binary-search that prefix; insertion and
//! removal rotate it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use pasp_config::{log_table_debug, log_table_warn, TableConfig};
use tracing::instrument;

use crate::completion::{Completion, Settled};
use crate::{CoalesceError, Result};

/// Reference to a slot held by one caller.
///
/// The generation changes every time a cell is reused, so a handle kept past
/// its release cannot touch the next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    cell: usize,
    generation: u64,
}

/// Outcome of [`RequestTable::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired {
    pub handle: SlotHandle,
    /// True for the caller that created the slot. It owns the work.
    pub is_new: bool,
}

/// Point-in-time view of one live slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub key: String,
    pub ref_count: usize,
    pub done: bool,
}

struct Slot<T> {
    key: String,
    ref_count: usize,
    generation: u64,
    completion: Arc<Completion<T>>,
}

struct TableState<T> {
    slots: Vec<Slot<T>>,
    /// Permutation of cell numbers; `index[..count]` is sorted by key.
    index: Vec<usize>,
    count: usize,
    /// Callers blocked in `acquire` on a full table.
    waiters: usize,
    next_generation: u64,
}

impl<T: Clone> TableState<T> {
    fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                key: String::new(),
                ref_count: 0,
                generation: 0,
                completion: Arc::new(Completion::new()),
            })
            .collect();
        Self {
            slots,
            index: (0..capacity).collect(),
            count: 0,
            waiters: 0,
            next_generation: 0,
        }
    }

    /// Position of `key` in the live index, or where it would be inserted.
    fn search(&self, key: &str) -> std::result::Result<usize, usize> {
        self.index[..self.count].binary_search_by(|&cell| self.slots[cell].key.as_str().cmp(key))
    }

    /// Position in the live index of the slot `handle` refers to, if current.
    fn position_of(&self, handle: SlotHandle) -> Option<usize> {
        let slot = self.slots.get(handle.cell)?;
        if slot.ref_count == 0 || slot.generation != handle.generation {
            return None;
        }
        self.search(&slot.key).ok()
    }

    fn insert(&mut self, pos: usize, key: &str) -> SlotHandle {
        let count = self.count;
        let cell = self.index[count];
        self.index[pos..=count].rotate_right(1);
        self.count += 1;

        self.next_generation += 1;
        let generation = self.next_generation;
        let slot = &mut self.slots[cell];
        slot.key.clear();
        slot.key.push_str(key);
        slot.ref_count = 1;
        slot.generation = generation;
        slot.completion = Arc::new(Completion::new());

        SlotHandle { cell, generation }
    }

    fn remove(&mut self, pos: usize) {
        let count = self.count;
        self.index[pos..count].rotate_left(1);
        self.count -= 1;
    }
}

/// Bounded table of in-flight requests keyed by source identity.
///
/// The first caller for a key owns the work; later callers for the same key
/// join it and receive a clone of the owner's result. When every cell is in
/// use, callers for new keys block until a slot frees or the acquire timeout
/// passes.
pub struct RequestTable<T> {
    state: Mutex<TableState<T>>,
    slot_freed: Condvar,
    capacity: usize,
    acquire_timeout: Duration,
}

impl<T: Clone> RequestTable<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`RequestTable::with_capacity`] for
    /// capacities that come from outside the program.
    pub fn new(capacity: usize, acquire_timeout: Duration) -> Self {
        assert!(capacity > 0, "request table capacity must be positive");
        Self {
            state: Mutex::new(TableState::new(capacity)),
            slot_freed: Condvar::new(),
            capacity,
            acquire_timeout,
        }
    }

    /// Like [`RequestTable::new`], but a zero capacity is an error.
    pub fn with_capacity(capacity: usize, acquire_timeout: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(CoalesceError::InvalidCapacity);
        }
        Ok(Self::new(capacity, acquire_timeout))
    }

    pub fn from_config(config: &TableConfig) -> Result<Self> {
        Self::with_capacity(config.capacity, config.acquire_timeout())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    fn lock(&self) -> MutexGuard<'_, TableState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take a reference on the slot for `key`, creating it if absent.
    ///
    /// Blocks while the table is full and `key` is not tracked. Fails with
    /// [`CoalesceError::Timeout`] once the acquire timeout has elapsed since
    /// the first wait.
    #[instrument(skip(self), level = "debug")]
    pub fn acquire(&self, key: &str) -> Result<Acquired> {
        let mut state = self.lock();
        let mut deadline: Option<Instant> = None;

        loop {
            let acquired = match state.search(key) {
                Ok(pos) => {
                    let cell = state.index[pos];
                    let slot = &mut state.slots[cell];
                    slot.ref_count += 1;
                    Some(Acquired {
                        handle: SlotHandle {
                            cell,
                            generation: slot.generation,
                        },
                        is_new: false,
                    })
                }
                Err(pos) if state.count < self.capacity => Some(Acquired {
                    handle: state.insert(pos, key),
                    is_new: true,
                }),
                Err(_) => None,
            };

            if let Some(acquired) = acquired {
                // One freed slot wakes one waiter; hand the wakeup on if
                // there is still room for someone else.
                if deadline.is_some() && state.waiters > 0 && state.count < self.capacity {
                    self.slot_freed.notify_one();
                }
                log_table_debug!(
                    "Slot acquired",
                    key = key,
                    is_new = acquired.is_new,
                    live = state.count,
                );
                return Ok(acquired);
            }

            let now = Instant::now();
            let limit = *deadline.get_or_insert(now + self.acquire_timeout);
            if now >= limit {
                log_table_warn!(
                    "Timed out waiting for a free slot",
                    key = key,
                    capacity = self.capacity,
                );
                return Err(CoalesceError::Timeout {
                    key: key.to_string(),
                    waited: self.acquire_timeout,
                });
            }

            state.waiters += 1;
            let (guard, _) = self
                .slot_freed
                .wait_timeout(state, limit - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            state.waiters -= 1;
        }
    }

    /// Drop one reference. The slot is removed when the last one goes.
    #[instrument(skip(self), level = "debug")]
    pub fn release(&self, handle: SlotHandle) {
        let mut state = self.lock();
        let Some(pos) = state.position_of(handle) else {
            log_table_warn!("Ignoring release of a stale slot handle", cell = handle.cell);
            return;
        };

        let cell = state.index[pos];
        state.slots[cell].ref_count -= 1;
        if state.slots[cell].ref_count > 0 {
            return;
        }

        let was_full = state.count == self.capacity;
        state.remove(pos);
        log_table_debug!("Slot removed", key = state.slots[cell].key.as_str(), live = state.count);
        if was_full {
            self.slot_freed.notify_one();
        }
    }

    fn completion(&self, handle: SlotHandle) -> Option<(String, Arc<Completion<T>>)> {
        let state = self.lock();
        let pos = state.position_of(handle)?;
        let slot = &state.slots[state.index[pos]];
        Some((slot.key.clone(), Arc::clone(&slot.completion)))
    }

    /// Record the owner's result and wake all joiners. Returns false if the
    /// slot was already settled or the handle is stale.
    pub fn complete(&self, handle: SlotHandle, value: T) -> bool {
        match self.completion(handle) {
            Some((_, completion)) => completion.finish(value),
            None => false,
        }
    }

    /// Mark the slot as given up so joiners stop waiting.
    pub fn abandon(&self, handle: SlotHandle) -> bool {
        match self.completion(handle) {
            Some((key, completion)) => {
                let first = completion.abandon();
                if first {
                    log_table_warn!("Slot abandoned by its owner", key = key.as_str());
                }
                first
            }
            None => false,
        }
    }

    /// Block until the slot's owner completes or abandons it.
    ///
    /// The table lock is not held while waiting.
    pub fn wait(&self, handle: SlotHandle) -> Result<T> {
        let (key, completion) = self
            .completion(handle)
            .ok_or(CoalesceError::StaleHandle)?;
        match completion.wait() {
            Settled::Done(value) => Ok(value),
            Settled::Abandoned => Err(CoalesceError::Abandoned { key }),
        }
    }

    /// Acquire `key` and wrap the reference in a guard that releases it on
    /// every exit path.
    pub fn enter(&self, key: &str) -> Result<RequestGuard<'_, T>> {
        let acquired = self.acquire(key)?;
        Ok(RequestGuard {
            table: self,
            handle: acquired.handle,
            is_new: acquired.is_new,
            settled: false,
        })
    }

    /// Live slots in key order.
    pub fn snapshot(&self) -> Vec<SlotInfo> {
        let state = self.lock();
        state.index[..state.count]
            .iter()
            .map(|&cell| {
                let slot = &state.slots[cell];
                SlotInfo {
                    key: slot.key.clone(),
                    ref_count: slot.ref_count,
                    done: slot.completion.is_done(),
                }
            })
            .collect()
    }
}

impl<T: Clone> Default for RequestTable<T> {
    fn default() -> Self {
        Self::new(
            pasp_config::DEFAULT_TABLE_CAPACITY,
            Duration::from_millis(pasp_config::DEFAULT_ACQUIRE_TIMEOUT_MS),
        )
    }
}

/// Scoped reference to a slot.
///
/// Dropping an owner's guard without calling [`RequestGuard::complete`]
/// abandons the slot, so joiners get [`CoalesceError::Abandoned`] rather than
/// waiting forever.
pub struct RequestGuard<'t, T: Clone> {
    table: &'t RequestTable<T>,
    handle: SlotHandle,
    is_new: bool,
    settled: bool,
}

impl<T: Clone> RequestGuard<'_, T> {
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn handle(&self) -> SlotHandle {
        self.handle
    }

    /// Publish the owner's result, then release.
    pub fn complete(mut self, value: T) {
        debug_assert!(self.is_new, "only the owner completes a slot");
        self.table.complete(self.handle, value);
        self.settled = true;
    }

    /// Wait for the owner's result, then release.
    pub fn wait(mut self) -> Result<T> {
        self.settled = true;
        self.table.wait(self.handle)
    }
}

impl<T: Clone> Drop for RequestGuard<'_, T> {
    fn drop(&mut self) {
        if self.is_new && !self.settled {
            self.table.abandon(self.handle);
        }
        self.table.release(self.handle);
    }
}
