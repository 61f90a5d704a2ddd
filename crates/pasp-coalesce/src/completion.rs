//! One-shot outcome cell shared by a slot's owner and its joiners.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
enum Outcome<T> {
    Pending,
    Done(T),
    Abandoned,
}

/// Result of waiting on a [`Completion`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Settled<T> {
    Done(T),
    Abandoned,
}

#[derive(Debug)]
pub(crate) struct Completion<T> {
    outcome: Mutex<Outcome<T>>,
    ready: Condvar,
}

impl<T: Clone> Completion<T> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: Mutex::new(Outcome::Pending),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Outcome<T>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the owner's outcome and wake every joiner. Only the first call
    /// has an effect; returns whether it was this one.
    pub(crate) fn finish(&self, value: T) -> bool {
        self.settle(Outcome::Done(value))
    }

    /// Mark the slot as given up by its owner.
    pub(crate) fn abandon(&self) -> bool {
        self.settle(Outcome::Abandoned)
    }

    fn settle(&self, outcome: Outcome<T>) -> bool {
        let mut current = self.lock();
        if !matches!(*current, Outcome::Pending) {
            return false;
        }
        *current = outcome;
        self.ready.notify_all();
        true
    }

    pub(crate) fn is_done(&self) -> bool {
        !matches!(*self.lock(), Outcome::Pending)
    }

    /// Block until the owner settles the slot.
    pub(crate) fn wait(&self) -> Settled<T> {
        let mut current = self.lock();
        loop {
            match &*current {
                Outcome::Pending => {
                    current = self
                        .ready
                        .wait(current)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Outcome::Done(value) => return Settled::Done(value.clone()),
                Outcome::Abandoned => return Settled::Abandoned,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_first_outcome_wins() {
        let c = Completion::new();
        assert!(!c.is_done());
        assert!(c.finish(1));
        assert!(!c.finish(2));
        assert!(!c.abandon());
        assert!(c.is_done());
        assert_eq!(c.wait(), Settled::Done(1));
    }

    #[test]
    fn test_waiters_wake_on_finish() {
        let c = Arc::new(Completion::new());
        let joiners: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&c);
                thread::spawn(move || c.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        c.finish("ok".to_string());

        for j in joiners {
            assert_eq!(j.join().unwrap(), Settled::Done("ok".to_string()));
        }
    }

    #[test]
    fn test_abandon_releases_waiters() {
        let c: Arc<Completion<u8>> = Arc::new(Completion::new());
        let c2 = Arc::clone(&c);
        let joiner = thread::spawn(move || c2.wait());
        c.abandon();
        assert_eq!(joiner.join().unwrap(), Settled::Abandoned);
    }
}
