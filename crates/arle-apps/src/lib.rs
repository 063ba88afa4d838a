//! arle-apps — example applications of the action rollup pattern.
//!
//! Three settlement designs that recur in deferred-settlement contracts,
//! each expressed as an append-boundary entry point plus a pure fold:
//!
//! - [`deposit`]: whitelisted fund pool folding deposits into a balance book;
//! - [`vote`]: member voting with append-time double-vote rejection;
//! - [`farm`]: staking farm with accrue-before-mutate reward bookkeeping.
//!
//! [`settle`] glues an engine run to the log's folded watermark.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

/// Whitelisted fund pool: deposit accounting.
pub mod deposit;
/// Staking farm: per-share reward accrual.
pub mod farm;
/// Settlement glue between engine and log capacity.
pub mod settle;
/// Member voting: tally with append-time uniqueness.
pub mod vote;

pub use settle::{settle, settle_all, DEFAULT_RETRY_ATTEMPTS};
