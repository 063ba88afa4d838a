//! The append-only action log.
//!
//! Every append extends a running chain hash, so the value at any position is
//! an unforgeable cursor into the log. Appends are never reordered or undone;
//! the only moving part besides the tail is the *folded watermark*, which the
//! capacity check measures pending actions against.

use arle_core::{Action, ActionReceipt, ActionRecord, ChainHash, LogError};
use std::collections::HashMap;
use tracing::trace;

/// Tunables for a log instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogConfig {
    /// Maximum actions appended past the folded watermark before
    /// [`ActionLog::append`] starts failing with `CapacityExceeded`.
    pub max_pending: usize,
}

impl Default for LogConfig {
    #[inline]
    fn default() -> Self {
        Self { max_pending: 1024 }
    }
}

/// Append-only, hash-chained sequence of actions.
///
/// Single-threaded; see [`crate::SharedLog`] for the multi-producer wrapper.
#[derive(Clone, Debug)]
pub struct ActionLog {
    cfg: LogConfig,
    genesis: ChainHash,
    entries: Vec<ActionRecord>,
    /// Chain hash → position, for O(1) cursor resolution.
    by_hash: HashMap<ChainHash, u64>,
    /// Number of leading entries already folded into a committed checkpoint.
    folded: u64,
}

impl ActionLog {
    /// Create an empty log with the given config.
    #[must_use]
    pub fn new(cfg: LogConfig) -> Self {
        Self {
            cfg,
            genesis: arle_crypto::genesis(),
            entries: Vec::new(),
            by_hash: HashMap::new(),
            folded: 0,
        }
    }

    /// Chain value of the empty log; the initial cursor for any consumer.
    #[inline]
    #[must_use]
    pub const fn genesis(&self) -> ChainHash {
        self.genesis
    }

    /// Current chain head (genesis if empty).
    #[inline]
    #[must_use]
    pub fn head(&self) -> ChainHash {
        self.entries
            .last()
            .map_or(self.genesis, |r| r.chain_hash)
    }

    /// Number of appended actions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log has no actions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Actions appended past the folded watermark.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries.len() - self.folded as usize
    }

    /// Append one action, extending the chain.
    ///
    /// Fails with [`LogError::CapacityExceeded`] when the pending bound is
    /// hit; the caller must wait for a rollup before submitting more.
    pub fn append(&mut self, action: Action) -> Result<ActionReceipt, LogError> {
        let pending = self.pending();
        if pending >= self.cfg.max_pending {
            return Err(LogError::CapacityExceeded {
                pending,
                max: self.cfg.max_pending,
            });
        }

        let position = self.entries.len() as u64;
        let chain_hash = arle_crypto::chain_step(&self.head(), &action);
        self.by_hash.insert(chain_hash, position);
        self.entries.push(ActionRecord {
            position,
            action,
            chain_hash,
        });

        trace!(position, head = %chain_hash, "action appended");
        Ok(ActionReceipt {
            position,
            chain_hash,
        })
    }

    /// Resolve a cursor to the index of the first action *after* it.
    fn start_after(&self, cursor: &ChainHash) -> Result<usize, LogError> {
        if *cursor == self.genesis {
            return Ok(0);
        }
        self.by_hash
            .get(cursor)
            .map(|&p| p as usize + 1)
            .ok_or(LogError::UnknownCursor(*cursor))
    }

    /// Snapshot of all records appended after `cursor`, in log order.
    pub fn actions_since(&self, cursor: &ChainHash) -> Result<Vec<ActionRecord>, LogError> {
        let start = self.start_after(cursor)?;
        Ok(self.entries[start..].to_vec())
    }

    /// Bounded snapshot: up to `max` records after `cursor`, oldest first,
    /// plus the count left beyond the page. Only the page is cloned, so a
    /// large backlog drained in small batches stays O(batch) per call.
    pub fn actions_page(
        &self,
        cursor: &ChainHash,
        max: usize,
    ) -> Result<(Vec<ActionRecord>, usize), LogError> {
        let start = self.start_after(cursor)?;
        let take = (self.entries.len() - start).min(max);
        let rest = self.entries.len() - start - take;
        Ok((self.entries[start..start + take].to_vec(), rest))
    }

    /// Lazy, restartable borrow of the records appended after `cursor`.
    pub fn iter_since(
        &self,
        cursor: &ChainHash,
    ) -> Result<impl Iterator<Item = &ActionRecord> + '_, LogError> {
        let start = self.start_after(cursor)?;
        Ok(self.entries[start..].iter())
    }

    /// Advance the folded watermark to `cursor` after a successful rollup.
    ///
    /// The watermark never moves backward; noting an older cursor is a no-op.
    pub fn note_folded(&mut self, cursor: &ChainHash) -> Result<(), LogError> {
        let start = self.start_after(cursor)? as u64;
        if start > self.folded {
            self.folded = start;
        }
        Ok(())
    }

    /// Integrity audit: replay the chain rule over all entries and check
    /// every recorded running value, ending at the current head.
    #[must_use]
    pub fn verify_chain(&self) -> bool {
        let mut chain = self.genesis;
        for r in &self.entries {
            chain = arle_crypto::chain_step(&chain, &r.action);
            if chain != r.chain_hash {
                return false;
            }
        }
        chain == self.head()
    }
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}
