//! arle-log — append-only, hash-chained action log.
//!
//! Producers append opaque [`arle_core::Action`]s; each append extends a
//! Blake3 chain hash so any running value is a verifiable cursor into the
//! log. Capacity is bounded relative to a *folded watermark* that application
//! glue advances after each committed rollup, mirroring bounded-batch
//! settlement systems.
//!
//! [`SharedLog`] is the multi-producer handle; [`ActionSource`] is the
//! read-side trait the rollup engine consumes.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

/// The single-threaded log and its config.
pub mod log;
/// Thread-safe wrapper and the engine-facing `ActionSource` trait.
pub mod shared;

pub use log::{ActionLog, LogConfig};
pub use shared::{ActionSource, SharedLog};
