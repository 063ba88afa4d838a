//! arle-engine — the rollup fold driver and its persistence seam.
//!
//! The engine turns a backlog of appended actions into one atomic state
//! transition: read the committed `(cursor, accumulator)` checkpoint, fold a
//! bounded oldest-first batch of pending actions, and commit the result with
//! compare-and-swap. Concurrent invocations are allowed; at most one wins
//! per overlapping window and the rest observe `StaleCursor` and retry —
//! serializability by optimistic concurrency, no locks in the contract.
//!
//! ```no_run
//! use arle_engine::{run_with_retry, MemoryStore, RollupEngine};
//! use arle_core::Checkpoint;
//! use arle_log::{ActionSource, SharedLog};
//! # use arle_core::Action;
//! # struct MyFold;
//! # impl arle_engine::FoldFunction for MyFold {
//! #     type Acc = u64;
//! #     type Error = std::convert::Infallible;
//! #     fn fold(&self, acc: u64, _a: &Action) -> Result<u64, Self::Error> { Ok(acc) }
//! # }
//! let log = SharedLog::default();
//! let store = MemoryStore::new(Checkpoint::new(log.genesis(), 0u64));
//! let engine = RollupEngine::new(MyFold, store, log);
//! let outcome = run_with_retry(&engine, 8)?;
//! # Ok::<(), arle_engine::EngineError<std::convert::Infallible>>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

/// The fold driver and its outcome/error types.
pub mod engine;
/// The application-supplied fold seam.
pub mod fold;
/// Bounded retry helper for `StaleCursor`.
pub mod retry;
/// Commitment store trait and the in-memory CAS store.
pub mod store;

pub use engine::{EngineError, RollupEngine, RollupOptions, RollupOutcome};
pub use fold::FoldFunction;
pub use retry::run_with_retry;
pub use store::{CommitmentStore, MemoryStore};
