//! Bounded retry around `StaleCursor`.
//!
//! Retry lives *outside* the engine so the driver stays composable: callers
//! that want backoff, metrics, or different bounds wrap [`RollupEngine::run`]
//! themselves. This helper is the plain bounded loop most callers want.

use crate::engine::{EngineError, RollupEngine, RollupOutcome};
use crate::fold::FoldFunction;
use crate::store::CommitmentStore;
use arle_log::ActionSource;
use tracing::debug;

/// Run the engine, retrying `StaleCursor` conflicts up to `attempts` times.
///
/// Each retry re-enters the Reading phase, so the losing invocation's folded
/// work is discarded and recomputed from the now-current cursor — no action
/// is lost and none is applied twice. Every other error propagates
/// unchanged on the first occurrence.
pub fn run_with_retry<F, S, L>(
    engine: &RollupEngine<F, S, L>,
    attempts: usize,
) -> Result<RollupOutcome<F::Acc>, EngineError<F::Error>>
where
    F: FoldFunction,
    S: CommitmentStore<F::Acc>,
    L: ActionSource,
{
    for attempt in 1..=attempts {
        match engine.run() {
            Err(EngineError::StaleCursor { expected }) => {
                debug!(attempt, attempts, lost_from = %expected, "rollup conflict, retrying");
            }
            other => return other,
        }
    }
    Err(EngineError::RetryExhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use arle_core::{Action, ActionKind, ActorId, ChainHash, Checkpoint, StoreError};
    use arle_log::SharedLog;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountFold;
    impl FoldFunction for CountFold {
        type Acc = u64;
        type Error = Infallible;
        fn fold(&self, acc: u64, _a: &Action) -> Result<u64, Infallible> {
            Ok(acc + 1)
        }
    }

    /// Store that fails the CAS the first `misses` times regardless of the
    /// cursor, emulating losing races to a concurrent invocation.
    struct ContendedStore {
        inner: MemoryStore<u64>,
        misses: AtomicUsize,
    }

    impl CommitmentStore<u64> for ContendedStore {
        fn load(&self) -> Result<Option<Checkpoint<u64>>, StoreError> {
            self.inner.load()
        }

        fn compare_and_swap(
            &self,
            expected: &ChainHash,
            next: Checkpoint<u64>,
        ) -> Result<bool, StoreError> {
            if self.misses.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |m| {
                (m > 0).then(|| m - 1)
            }).is_ok() {
                return Ok(false);
            }
            self.inner.compare_and_swap(expected, next)
        }
    }

    fn setup(misses: usize) -> RollupEngine<CountFold, ContendedStore, SharedLog> {
        let log = SharedLog::default();
        for i in 0..3 {
            log.append(Action::new(ActionKind(0), ActorId::from_index(i), vec![]))
                .unwrap();
        }
        let store = ContendedStore {
            inner: MemoryStore::new(Checkpoint::new(log.genesis(), 0)),
            misses: AtomicUsize::new(misses),
        };
        RollupEngine::new(CountFold, store, log)
    }

    #[test]
    fn conflicts_are_retried_to_success() {
        let engine = setup(2);
        let out = run_with_retry(&engine, 5).unwrap();
        let RollupOutcome::Committed { checkpoint, .. } = out else {
            panic!("expected a commit");
        };
        assert_eq!(checkpoint.accumulator, 3);
    }

    #[test]
    fn exhausted_retries_surface_as_an_error() {
        let engine = setup(usize::MAX);
        assert!(matches!(
            run_with_retry(&engine, 3),
            Err(EngineError::RetryExhausted { attempts: 3 })
        ));
    }
}
