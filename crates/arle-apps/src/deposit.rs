//! Fund-pool deposit ledger.
//!
//! Producers deposit into a pool during an open window, subject to a
//! whitelist; settlement folds the pending deposit actions into a per-actor
//! balance book. Whitelist membership is checked when an action is
//! *accepted for append* — the fold only ever sees authorized actions.
//!
//! Token transfers and the whitelist's membership proofs are external
//! collaborators; here the whitelist is the set of admitted actors.

use arle_core::{Action, ActionKind, ActionReceipt, ActorId, LogError};
use arle_engine::FoldFunction;
use arle_log::SharedLog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Action kinds understood by the deposit ledger.
pub mod kinds {
    use arle_core::ActionKind;

    /// Stake `amount` into the pool (payload: amount, u64 LE).
    pub const DEPOSIT: ActionKind = ActionKind(0);
    /// Claim accrued rewards (payload empty; balances untouched).
    pub const CLAIM: ActionKind = ActionKind(1);
    /// Exit the pool (payload empty; clears the actor's balance).
    pub const WITHDRAW: ActionKind = ActionKind(2);
}

/// Build a deposit action.
#[must_use]
pub fn deposit_action(actor: ActorId, amount: u64) -> Action {
    Action::new(kinds::DEPOSIT, actor, amount.to_le_bytes().to_vec())
}

/// Build a claim action.
#[must_use]
pub fn claim_action(actor: ActorId) -> Action {
    Action::new(kinds::CLAIM, actor, Vec::new())
}

/// Build a withdraw action.
#[must_use]
pub fn withdraw_action(actor: ActorId) -> Action {
    Action::new(kinds::WITHDRAW, actor, Vec::new())
}

/// Per-actor balance book; the pool's accumulator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepositBook {
    /// Settled balance per actor.
    pub balances: BTreeMap<ActorId, u64>,
}

impl DepositBook {
    /// Settled balance for one actor (zero if absent).
    #[must_use]
    pub fn balance_of(&self, actor: &ActorId) -> u64 {
        self.balances.get(actor).copied().unwrap_or(0)
    }
}

/// Deposit-ledger fold failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepositFoldError {
    /// Adding a deposit would overflow the actor's balance.
    #[error("balance overflow for actor {actor}")]
    BalanceOverflow {
        /// The affected actor.
        actor: ActorId,
    },

    /// Payload did not decode for the action's kind.
    #[error("malformed payload for action kind {0:?}")]
    MalformedPayload(ActionKind),

    /// The action kind is not part of this application.
    #[error("unknown action kind {0:?}")]
    UnknownKind(ActionKind),
}

/// `accumulator[actor] += amount` for deposits; withdraw clears the balance.
#[derive(Clone, Copy, Debug, Default)]
pub struct DepositLedgerFold;

impl FoldFunction for DepositLedgerFold {
    type Acc = DepositBook;
    type Error = DepositFoldError;

    fn fold(&self, mut book: DepositBook, action: &Action) -> Result<DepositBook, Self::Error> {
        match action.kind {
            kinds::DEPOSIT => {
                let amount = decode_amount(action)?;
                let entry = book.balances.entry(action.actor).or_insert(0);
                *entry = entry
                    .checked_add(amount)
                    .ok_or(DepositFoldError::BalanceOverflow {
                        actor: action.actor,
                    })?;
            }
            kinds::CLAIM => {}
            kinds::WITHDRAW => {
                book.balances.remove(&action.actor);
            }
            other => return Err(DepositFoldError::UnknownKind(other)),
        }
        Ok(book)
    }
}

fn decode_amount(action: &Action) -> Result<u64, DepositFoldError> {
    let bytes: [u8; 8] = action
        .payload
        .as_slice()
        .try_into()
        .map_err(|_| DepositFoldError::MalformedPayload(action.kind))?;
    Ok(u64::from_le_bytes(bytes))
}

/// Construction-time pool parameters (the original kept these as shared
/// static contract state; they are explicit per instance here).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// First block height at which deposits are accepted.
    pub open_from: u64,
    /// Last block height at which deposits are accepted.
    pub open_until: u64,
}

/// Errors raised when a pool entry point refuses an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The actor is not on the pool's whitelist.
    #[error("actor {actor} is not whitelisted")]
    NotWhitelisted {
        /// The refused actor.
        actor: ActorId,
    },

    /// The deposit window is not open at this height.
    #[error("deposit window closed at height {height} (open {open_from}..={open_until})")]
    WindowClosed {
        /// Height the deposit was attempted at.
        height: u64,
        /// Window start.
        open_from: u64,
        /// Window end.
        open_until: u64,
    },

    /// The underlying log refused the append.
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Entry points of the whitelisted fund pool.
///
/// All authorization happens here, before append; the fold stays a pure
/// balance update.
#[derive(Clone, Debug)]
pub struct FundPool {
    log: SharedLog,
    whitelist: BTreeSet<ActorId>,
    cfg: PoolConfig,
}

impl FundPool {
    /// Create a pool over a shared log.
    #[must_use]
    pub fn new(log: SharedLog, whitelist: BTreeSet<ActorId>, cfg: PoolConfig) -> Self {
        Self {
            log,
            whitelist,
            cfg,
        }
    }

    /// The log this pool appends to.
    #[must_use]
    pub fn log(&self) -> &SharedLog {
        &self.log
    }

    /// Deposit `amount`, checking the whitelist and the open window.
    pub fn deposit(
        &self,
        actor: ActorId,
        amount: u64,
        height: u64,
    ) -> Result<ActionReceipt, PoolError> {
        if !self.whitelist.contains(&actor) {
            return Err(PoolError::NotWhitelisted { actor });
        }
        if height < self.cfg.open_from || height > self.cfg.open_until {
            return Err(PoolError::WindowClosed {
                height,
                open_from: self.cfg.open_from,
                open_until: self.cfg.open_until,
            });
        }
        Ok(self.log.append(deposit_action(actor, amount))?)
    }

    /// Claim rewards (no window or whitelist precondition).
    pub fn claim(&self, actor: ActorId) -> Result<ActionReceipt, PoolError> {
        Ok(self.log.append(claim_action(actor))?)
    }

    /// Withdraw the actor's whole balance.
    pub fn withdraw(&self, actor: ActorId) -> Result<ActionReceipt, PoolError> {
        Ok(self.log.append(withdraw_action(actor))?)
    }
}
