//! Staking farm with per-share reward accrual.
//!
//! Bookkeeping follows the classic accumulated-reward-per-share scheme: the
//! farm tracks a fixed-point `acc_reward_per_share`, and each delegator
//! record remembers the accumulator value it last settled at, so a
//! delegator's owed reward is `(acc - acc_start) * balance / accuracy`.
//!
//! The one ordering invariant everything hinges on: every fold step first
//! accrues elapsed-block rewards against the stake **as of immediately
//! before the action**, then applies the action's stake delta. Accruing
//! after the delta would credit new stake with rewards for blocks it was
//! not staked in.
//!
//! Token custody (paying rewards out, moving stake) is external; the fold
//! records what is owed in `rewards_owed`.

use arle_core::{Action, ActionKind, ActionReceipt, ActorId, LogError};
use arle_engine::FoldFunction;
use arle_log::SharedLog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Action kinds understood by the farm.
pub mod kinds {
    use arle_core::ActionKind;

    /// Stake `amount` (payload: amount u64 LE, block height u64 LE).
    pub const DEPOSIT: ActionKind = ActionKind(0);
    /// Settle rewards without touching the stake (payload: 0, height).
    pub const CLAIM: ActionKind = ActionKind(1);
    /// Settle rewards and exit the whole stake (payload: 0, height).
    pub const WITHDRAW: ActionKind = ActionKind(2);
}

fn encode_payload(amount: u64, height: u64) -> Vec<u8> {
    let mut p = Vec::with_capacity(16);
    p.extend_from_slice(&amount.to_le_bytes());
    p.extend_from_slice(&height.to_le_bytes());
    p
}

/// Build a stake-deposit action observed at `height`.
#[must_use]
pub fn deposit_action(actor: ActorId, amount: u64, height: u64) -> Action {
    Action::new(kinds::DEPOSIT, actor, encode_payload(amount, height))
}

/// Build a claim action observed at `height`.
#[must_use]
pub fn claim_action(actor: ActorId, height: u64) -> Action {
    Action::new(kinds::CLAIM, actor, encode_payload(0, height))
}

/// Build a withdraw action observed at `height`.
#[must_use]
pub fn withdraw_action(actor: ActorId, height: u64) -> Action {
    Action::new(kinds::WITHDRAW, actor, encode_payload(0, height))
}

/// Construction-time farm parameters (explicit per instance; the original
/// held the reward rate in shared contract state).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FarmConfig {
    /// Reward emitted per block, split across stakers pro rata.
    pub reward_per_block: u64,
    /// Fixed-point accuracy of `acc_reward_per_share`.
    pub accuracy: u64,
}

impl Default for FarmConfig {
    #[inline]
    fn default() -> Self {
        Self {
            reward_per_block: 5,
            accuracy: 1_000_000,
        }
    }
}

/// One delegator's settlement record.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegatorRecord {
    /// `acc_reward_per_share` value this record last settled at.
    pub acc_start: u64,
    /// Staked balance.
    pub balance: u64,
}

/// The farm's accumulator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FarmState {
    /// Fixed-point accumulated reward per staked unit.
    pub acc_reward_per_share: u64,
    /// Sum of all staked balances.
    pub total_staked: u64,
    /// Block height the pool last accrued at.
    pub last_update_height: u64,
    /// Per-delegator settlement records.
    pub delegators: BTreeMap<ActorId, DelegatorRecord>,
    /// Rewards owed but not yet paid out (payout is external).
    pub rewards_owed: BTreeMap<ActorId, u64>,
}

impl FarmState {
    /// Reward owed to one actor (zero if absent).
    #[must_use]
    pub fn owed_to(&self, actor: &ActorId) -> u64 {
        self.rewards_owed.get(actor).copied().unwrap_or(0)
    }

    /// Staked balance of one actor (zero if absent).
    #[must_use]
    pub fn stake_of(&self, actor: &ActorId) -> u64 {
        self.delegators.get(actor).map_or(0, |r| r.balance)
    }
}

/// Farm fold failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FarmFoldError {
    /// Payload was not `amount ++ height` (16 bytes LE).
    #[error("malformed payload for action kind {0:?}")]
    MalformedPayload(ActionKind),

    /// Action heights must be monotone non-decreasing along the log.
    #[error("height regression: action at {at} behind last accrual at {last}")]
    HeightRegression {
        /// Height carried by the action.
        at: u64,
        /// Height the pool last accrued at.
        last: u64,
    },

    /// Fixed-point bookkeeping overflowed.
    #[error("reward arithmetic overflow at height {height}")]
    Overflow {
        /// Height of the offending action.
        height: u64,
    },

    /// The action kind is not part of this application.
    #[error("unknown action kind {0:?}")]
    UnknownKind(ActionKind),
}

/// Accrue-then-mutate reward fold.
#[derive(Clone, Copy, Debug, Default)]
pub struct FarmFold {
    cfg: FarmConfig,
}

impl FarmFold {
    /// Create a fold with the given farm parameters.
    #[must_use]
    pub const fn new(cfg: FarmConfig) -> Self {
        Self { cfg }
    }

    /// Step 1: mark elapsed-block rewards against the previous total stake.
    ///
    /// With zero stake there is no one to credit; the elapsed blocks'
    /// emission is simply not distributed (matching the source system's
    /// saturating division).
    fn accrue(&self, state: &mut FarmState, height: u64) -> Result<(), FarmFoldError> {
        if height < state.last_update_height {
            return Err(FarmFoldError::HeightRegression {
                at: height,
                last: state.last_update_height,
            });
        }
        if state.total_staked > 0 {
            let elapsed = height - state.last_update_height;
            let reward = elapsed
                .checked_mul(self.cfg.reward_per_block)
                .and_then(|r| r.checked_mul(self.cfg.accuracy))
                .ok_or(FarmFoldError::Overflow { height })?;
            state.acc_reward_per_share = state
                .acc_reward_per_share
                .checked_add(reward / state.total_staked)
                .ok_or(FarmFoldError::Overflow { height })?;
        }
        state.last_update_height = height;
        Ok(())
    }

    /// Reward owed to a record since it last settled.
    fn settled_reward(
        &self,
        state: &FarmState,
        rec: DelegatorRecord,
        height: u64,
    ) -> Result<u64, FarmFoldError> {
        let acc_delta = state.acc_reward_per_share - rec.acc_start;
        acc_delta
            .checked_mul(rec.balance)
            .map(|r| r / self.cfg.accuracy)
            .ok_or(FarmFoldError::Overflow { height })
    }
}

impl FoldFunction for FarmFold {
    type Acc = FarmState;
    type Error = FarmFoldError;

    fn fold(&self, mut state: FarmState, action: &Action) -> Result<FarmState, Self::Error> {
        let (amount, height) = decode_payload(action)?;

        // Accrue against the stake as of *before* this action.
        self.accrue(&mut state, height)?;

        let rec = state
            .delegators
            .get(&action.actor)
            .copied()
            .unwrap_or_default();
        let reward = self.settled_reward(&state, rec, height)?;
        if reward > 0 {
            let owed = state.rewards_owed.entry(action.actor).or_insert(0);
            *owed = owed
                .checked_add(reward)
                .ok_or(FarmFoldError::Overflow { height })?;
        }

        // Only now apply the stake delta.
        let new_balance = match action.kind {
            kinds::DEPOSIT => rec
                .balance
                .checked_add(amount)
                .ok_or(FarmFoldError::Overflow { height })?,
            kinds::CLAIM => rec.balance,
            kinds::WITHDRAW => 0,
            other => return Err(FarmFoldError::UnknownKind(other)),
        };

        state.delegators.insert(
            action.actor,
            DelegatorRecord {
                acc_start: state.acc_reward_per_share,
                balance: new_balance,
            },
        );

        state.total_staked = match action.kind {
            kinds::DEPOSIT => state
                .total_staked
                .checked_add(amount)
                .ok_or(FarmFoldError::Overflow { height })?,
            kinds::CLAIM => state.total_staked,
            // rec.balance ≤ total_staked by construction.
            _ => state.total_staked - rec.balance,
        };

        Ok(state)
    }
}

fn decode_payload(action: &Action) -> Result<(u64, u64), FarmFoldError> {
    if action.payload.len() != 16 {
        return Err(FarmFoldError::MalformedPayload(action.kind));
    }
    let mut amount = [0u8; 8];
    let mut height = [0u8; 8];
    amount.copy_from_slice(&action.payload[..8]);
    height.copy_from_slice(&action.payload[8..]);
    Ok((u64::from_le_bytes(amount), u64::from_le_bytes(height)))
}

/// Entry points of the farm: thin append wrappers, one per action kind.
///
/// Signature verification on the acting account is external (the original
/// required a signed account update per call).
#[derive(Clone, Debug)]
pub struct Farm {
    log: SharedLog,
}

impl Farm {
    /// Create a farm over a shared log.
    #[must_use]
    pub fn new(log: SharedLog) -> Self {
        Self { log }
    }

    /// The log this farm appends to.
    #[must_use]
    pub fn log(&self) -> &SharedLog {
        &self.log
    }

    /// Stake `amount` at `height`.
    pub fn deposit(
        &self,
        actor: ActorId,
        amount: u64,
        height: u64,
    ) -> Result<ActionReceipt, LogError> {
        self.log.append(deposit_action(actor, amount, height))
    }

    /// Settle rewards at `height` without touching the stake.
    pub fn claim(&self, actor: ActorId, height: u64) -> Result<ActionReceipt, LogError> {
        self.log.append(claim_action(actor, height))
    }

    /// Settle rewards and exit the whole stake at `height`.
    pub fn withdraw(&self, actor: ActorId, height: u64) -> Result<ActionReceipt, LogError> {
        self.log.append(withdraw_action(actor, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(i: u64) -> ActorId {
        ActorId::from_index(i)
    }

    fn fold_all(actions: &[Action]) -> Result<FarmState, FarmFoldError> {
        let fold = FarmFold::new(FarmConfig::default());
        actions
            .iter()
            .try_fold(FarmState::default(), |s, a| fold.fold(s, a))
    }

    /// 5 reward/block, accuracy 1e6. Alice stakes 30 at height 0; nothing
    /// accrues over zero stake. Bob stakes 10 at height 3: 15 reward accrued
    /// over stake 30 *before* bob joins, so acc = 15 * 1e6 / 30 = 500_000.
    #[test]
    fn accrues_before_applying_the_stake_delta() {
        let state = fold_all(&[
            deposit_action(actor(1), 30, 0),
            deposit_action(actor(2), 10, 3),
        ])
        .unwrap();

        assert_eq!(state.acc_reward_per_share, 500_000);
        assert_eq!(state.total_staked, 40);
        assert_eq!(state.last_update_height, 3);
        // Bob's record starts at the post-accrual value: no retroactive pay.
        assert_eq!(
            state.delegators[&actor(2)],
            DelegatorRecord {
                acc_start: 500_000,
                balance: 10
            }
        );
    }

    #[test]
    fn claim_settles_rewards_without_touching_stake() {
        let state = fold_all(&[
            deposit_action(actor(1), 30, 0),
            claim_action(actor(1), 3),
        ])
        .unwrap();

        // 3 blocks * 5 reward over alice's own 30 stake: all 15 are hers.
        assert_eq!(state.owed_to(&actor(1)), 15);
        assert_eq!(state.stake_of(&actor(1)), 30);
        assert_eq!(state.total_staked, 30);
        // Record resets so a second immediate claim settles nothing.
        let fold = FarmFold::new(FarmConfig::default());
        let again = fold.fold(state, &claim_action(actor(1), 3)).unwrap();
        assert_eq!(again.owed_to(&actor(1)), 15);
    }

    #[test]
    fn withdraw_pays_out_and_exits_the_stake() {
        let state = fold_all(&[
            deposit_action(actor(1), 30, 0),
            deposit_action(actor(2), 10, 3),
            withdraw_action(actor(1), 7),
        ])
        .unwrap();

        // Height 0→3: 15 over 30 (alice only). Height 3→7: 20 over 40,
        // acc += 20 * 1e6 / 40 = 500_000 → 1_000_000.
        assert_eq!(state.acc_reward_per_share, 1_000_000);
        // Alice: full 1.0 per-share over 30 staked = 30.
        assert_eq!(state.owed_to(&actor(1)), 30);
        assert_eq!(state.stake_of(&actor(1)), 0);
        assert_eq!(state.total_staked, 10);
    }

    #[test]
    fn rewards_split_pro_rata_after_a_join() {
        let state = fold_all(&[
            deposit_action(actor(1), 30, 0),
            deposit_action(actor(2), 10, 3),
            claim_action(actor(1), 7),
            claim_action(actor(2), 7),
        ])
        .unwrap();

        // Blocks 3→7 emit 20 over stake 40: alice 3/4, bob 1/4.
        assert_eq!(state.owed_to(&actor(1)), 15 + 15);
        assert_eq!(state.owed_to(&actor(2)), 5);
    }

    #[test]
    fn height_regression_is_rejected() {
        let err = fold_all(&[
            deposit_action(actor(1), 30, 5),
            deposit_action(actor(2), 10, 3),
        ])
        .unwrap_err();
        assert_eq!(err, FarmFoldError::HeightRegression { at: 3, last: 5 });
    }

    #[test]
    fn emission_over_zero_stake_is_not_distributed() {
        let state = fold_all(&[deposit_action(actor(1), 30, 10)]).unwrap();
        assert_eq!(state.acc_reward_per_share, 0);
        assert_eq!(state.last_update_height, 10);
    }
}
