//! Shared error taxonomy for logs and commitment stores.
//!
//! Application fold errors and the engine-level wrapper live in
//! `arle-engine`; only the errors both sides of the log/store boundary need
//! are defined here.

use crate::types::ChainHash;
use thiserror::Error;

/// Errors raised by the append-only action log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// Too many actions are pending (appended but not yet folded).
    ///
    /// Caller error; recoverable by running a rollup before submitting more
    /// actions.
    #[error("action log capacity exceeded: {pending} pending actions (max {max})")]
    CapacityExceeded {
        /// Actions appended past the folded watermark.
        pending: usize,
        /// Configured bound.
        max: usize,
    },

    /// The cursor does not correspond to any recorded log position.
    ///
    /// Indicates the log was truncated or reset incompatibly with the stored
    /// cursor; fatal to the rollup invocation that observed it.
    #[error("unknown cursor {0}: no log position carries this chain hash")]
    UnknownCursor(ChainHash),
}

/// Errors raised by a commitment store backend.
///
/// A CAS *miss* is not a `StoreError`; `compare_and_swap` reports it as
/// `Ok(false)` and the engine maps that to `StaleCursor`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached or is corrupted.
    #[error("commitment store unavailable: {0}")]
    Unavailable(String),

    /// The store holds a checkpoint with an unsupported schema version.
    #[error("unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the store.
        found: u16,
        /// Version this build understands.
        expected: u16,
    },
}
