//! Settlement glue: run a rollup and advance the log's folded watermark.
//!
//! The engine deliberately knows nothing about log capacity; this helper is
//! the application-side loop closure that frees pending capacity once a
//! batch is durably committed.

use arle_engine::{run_with_retry, CommitmentStore, EngineError, FoldFunction, RollupEngine, RollupOutcome};
use arle_log::SharedLog;
use tracing::debug;

/// Default retry bound used by the settle helpers.
pub const DEFAULT_RETRY_ATTEMPTS: usize = 8;

/// Run one rollup (with bounded conflict retries) against a [`SharedLog`]
/// and, on commit, note the new cursor as folded so the capacity bound
/// opens back up.
pub fn settle<F, S>(
    engine: &RollupEngine<F, S, SharedLog>,
    attempts: usize,
) -> Result<RollupOutcome<F::Acc>, EngineError<F::Error>>
where
    F: FoldFunction,
    S: CommitmentStore<F::Acc>,
{
    let outcome = run_with_retry(engine, attempts)?;
    if let RollupOutcome::Committed {
        checkpoint,
        folded,
        remaining,
    } = &outcome
    {
        engine.source().note_folded(&checkpoint.cursor)?;
        debug!(folded, remaining, "settled batch; watermark advanced");
    }
    Ok(outcome)
}

/// Repeatedly [`settle`] until the log is drained, returning the final
/// outcome. Each iteration is its own atomic commit.
pub fn settle_all<F, S>(
    engine: &RollupEngine<F, S, SharedLog>,
) -> Result<RollupOutcome<F::Acc>, EngineError<F::Error>>
where
    F: FoldFunction,
    S: CommitmentStore<F::Acc>,
{
    loop {
        let outcome = settle(engine, DEFAULT_RETRY_ATTEMPTS)?;
        match outcome {
            RollupOutcome::Committed { remaining, .. } if remaining > 0 => {}
            done => return Ok(done),
        }
    }
}
