//! arle-core — core types, errors, and I/O for the action rollup engine.
//!
//! This crate defines the **stable boundary** used across ARLE crates:
//! - canonical data types (`Action`, `ActionRecord`, `ChainHash`,
//!   `Checkpoint`, ...),
//! - the shared error taxonomy (`LogError`, `StoreError`), and
//! - JSON/CBOR I/O with extension auto-detection.
//!
//! The crate is deliberately free of hashing and concurrency concerns; those
//! live in `arle-crypto` and `arle-log`/`arle-engine` respectively.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Shared error taxonomy for logs and commitment stores.
pub mod error;
/// JSON/CBOR helpers and auto-detecting read/write APIs.
pub mod io;
/// Canonical core data types shared across the workspace.
pub mod types;

pub use error::*;
pub use types::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use arle_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{LogError, StoreError};
    pub use crate::types::*;
}
