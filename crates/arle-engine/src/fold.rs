//! The application-supplied fold seam.
//!
//! A fold function is the whole of an application's settlement semantics:
//! deposit accounting, vote tallying, reward accrual. The engine drives it
//! over a batch of pending actions; it must stay pure so a batch can be
//! abandoned at any point with no observable effect.

use arle_core::Action;

/// Pure, deterministic `(accumulator, action) -> accumulator` mapping.
///
/// # Contract
/// - No side effects: the engine may fold the same actions again after a
///   conflict, and an abandoned batch must leave no trace.
/// - Associative over log order: folding a prefix in one batch and the rest
///   in a later batch must equal folding everything at once. Batch size is a
///   backpressure valve, never a semantic knob.
/// - Errors abort the whole batch with no partial commit; severity is
///   application-defined.
pub trait FoldFunction {
    /// Aggregate state the application accumulates.
    type Acc: Clone;
    /// Application-defined fold failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fold one action into the accumulator.
    fn fold(&self, acc: Self::Acc, action: &Action) -> Result<Self::Acc, Self::Error>;
}
