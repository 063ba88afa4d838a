//! Commitment store: the sole persistence seam of the rollup core.
//!
//! A real deployment backs this with a contract's committed state (the
//! ledger's single-writer-per-block semantics providing the atomicity); the
//! trait generalizes that to an explicit compare-and-swap contract so the
//! engine runs against any transactional store.

use arle_core::{ChainHash, Checkpoint, StoreError, CHECKPOINT_VERSION};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Authoritative holder of the last-committed `(cursor, accumulator)` pair.
///
/// `load` returning `Ok(None)` means the backing state has not been
/// initialized; the engine reports that as an explicit skipped outcome
/// rather than silently doing nothing.
pub trait CommitmentStore<A> {
    /// Read the current checkpoint, if any.
    fn load(&self) -> Result<Option<Checkpoint<A>>, StoreError>;

    /// Atomically replace the checkpoint **iff** the stored cursor still
    /// equals `expected`. Returns `Ok(false)` on a cursor mismatch (the CAS
    /// miss the engine surfaces as `StaleCursor`); `Err` only for backend
    /// failures.
    fn compare_and_swap(
        &self,
        expected: &ChainHash,
        next: Checkpoint<A>,
    ) -> Result<bool, StoreError>;
}

impl<A, S: CommitmentStore<A>> CommitmentStore<A> for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<Checkpoint<A>>, StoreError> {
        (**self).load()
    }

    fn compare_and_swap(
        &self,
        expected: &ChainHash,
        next: Checkpoint<A>,
    ) -> Result<bool, StoreError> {
        (**self).compare_and_swap(expected, next)
    }
}

/// In-process store: a checkpoint behind a mutex.
///
/// The lock makes `compare_and_swap` atomic on the `(cursor, accumulator)`
/// pair, which is all the engine's serializability argument needs.
#[derive(Debug, Default)]
pub struct MemoryStore<A> {
    slot: Mutex<Option<Checkpoint<A>>>,
}

impl<A: Clone> MemoryStore<A> {
    /// Create a store seeded with an initial checkpoint (normally the log's
    /// genesis cursor and the application's empty accumulator).
    #[must_use]
    pub fn new(initial: Checkpoint<A>) -> Self {
        Self {
            slot: Mutex::new(Some(initial)),
        }
    }

    /// Create a store with no backing checkpoint yet.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Seed an uninitialized store. Overwrites nothing: returns `false` if a
    /// checkpoint is already present.
    pub fn init(&self, initial: Checkpoint<A>) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(initial);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Option<Checkpoint<A>>> {
        // The store is only written at the end of a CAS; a poisoned lock
        // cannot hold a half-written pair.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Clone> CommitmentStore<A> for MemoryStore<A> {
    fn load(&self) -> Result<Option<Checkpoint<A>>, StoreError> {
        match &*self.lock() {
            Some(cp) if cp.version != CHECKPOINT_VERSION => Err(StoreError::UnsupportedVersion {
                found: cp.version,
                expected: CHECKPOINT_VERSION,
            }),
            other => Ok(other.clone()),
        }
    }

    fn compare_and_swap(
        &self,
        expected: &ChainHash,
        next: Checkpoint<A>,
    ) -> Result<bool, StoreError> {
        let mut slot = self.lock();
        match &*slot {
            Some(cp) if cp.cursor == *expected => {
                *slot = Some(next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(cursor_byte: u8, acc: u64) -> Checkpoint<u64> {
        Checkpoint::new(ChainHash([cursor_byte; 32]), acc)
    }

    #[test]
    fn cas_succeeds_only_on_matching_cursor() {
        let store = MemoryStore::new(cp(1, 0));

        assert!(!store
            .compare_and_swap(&ChainHash([9; 32]), cp(2, 10))
            .unwrap());
        assert_eq!(store.load().unwrap(), Some(cp(1, 0)));

        assert!(store
            .compare_and_swap(&ChainHash([1; 32]), cp(2, 10))
            .unwrap());
        assert_eq!(store.load().unwrap(), Some(cp(2, 10)));
    }

    #[test]
    fn init_refuses_to_clobber() {
        let store = MemoryStore::uninitialized();
        assert_eq!(store.load().unwrap(), None);

        assert!(store.init(cp(1, 0)));
        assert!(!store.init(cp(2, 5)));
        assert_eq!(store.load().unwrap(), Some(cp(1, 0)));
    }

    #[test]
    fn unsupported_version_is_reported() {
        let mut bad = cp(1, 0);
        bad.version = 99;
        let store = MemoryStore::new(bad);
        assert!(matches!(
            store.load(),
            Err(StoreError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn cas_on_uninitialized_store_is_a_miss() {
        let store = MemoryStore::uninitialized();
        assert!(!store
            .compare_and_swap(&ChainHash([0; 32]), cp(1, 1))
            .unwrap());
    }
}
