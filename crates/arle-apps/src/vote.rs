//! Member voting with an approve/reject tally.
//!
//! Double-vote prevention is enforced at the **append boundary**: the vote
//! book keeps a voter index and refuses a second ballot outright, so the
//! fold never rescans prior actions (the original checked during folding,
//! an O(n²) scan per ballot). Membership proofs are external; here the
//! electorate is the configured member set.

use arle_core::{Action, ActionKind, ActionReceipt, ActorId, LogError};
use arle_engine::FoldFunction;
use arle_log::SharedLog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// The single action kind of this application (payload: one byte, `1` for
/// approve, `0` for reject).
pub const VOTE: ActionKind = ActionKind(0);

/// Build a ballot action.
#[must_use]
pub fn vote_action(actor: ActorId, approve: bool) -> Action {
    Action::new(VOTE, actor, vec![u8::from(approve)])
}

/// Running tally; the vote application's accumulator.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteTally {
    /// Ballots in favor.
    pub vote_for: u64,
    /// Ballots against.
    pub vote_against: u64,
}

/// Vote-tally fold failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteFoldError {
    /// Ballot payload was not a single 0/1 byte.
    #[error("malformed ballot from actor {actor}")]
    MalformedBallot {
        /// The offending voter.
        actor: ActorId,
    },

    /// The action kind is not a ballot.
    #[error("unknown action kind {0:?}")]
    UnknownKind(ActionKind),
}

/// Counts ballots. Uniqueness per voter is a precondition established at
/// append time, not re-checked here.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoteTallyFold;

impl FoldFunction for VoteTallyFold {
    type Acc = VoteTally;
    type Error = VoteFoldError;

    fn fold(&self, mut tally: VoteTally, action: &Action) -> Result<VoteTally, Self::Error> {
        if action.kind != VOTE {
            return Err(VoteFoldError::UnknownKind(action.kind));
        }
        match action.payload.as_slice() {
            [0] => tally.vote_against += 1,
            [1] => tally.vote_for += 1,
            _ => {
                return Err(VoteFoldError::MalformedBallot {
                    actor: action.actor,
                })
            }
        }
        Ok(tally)
    }
}

/// Errors raised when a ballot is refused at the append boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    /// The actor is not part of the electorate.
    #[error("actor {actor} is not a member")]
    NotAMember {
        /// The refused actor.
        actor: ActorId,
    },

    /// The actor already has a pending or committed ballot.
    #[error("actor {actor} has already voted")]
    DuplicateVote {
        /// The repeat voter.
        actor: ActorId,
    },

    /// The underlying log refused the append.
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Entry point for casting ballots: membership plus one-ballot-per-actor,
/// both enforced before append (a single index lookup each).
#[derive(Clone, Debug)]
pub struct VoteBook {
    log: SharedLog,
    members: BTreeSet<ActorId>,
    voted: BTreeSet<ActorId>,
}

impl VoteBook {
    /// Create a vote book for the given electorate.
    ///
    /// The voter index is rebuilt from ballots already in the log, so
    /// uniqueness holds across book instances and restarts, not just within
    /// one book's lifetime.
    #[must_use]
    pub fn new(log: SharedLog, members: BTreeSet<ActorId>) -> Self {
        let voted = log.with(|l| {
            // The genesis cursor always resolves.
            l.iter_since(&l.genesis())
                .map(|it| it.map(|r| r.action.actor).collect())
                .unwrap_or_default()
        });
        Self {
            log,
            members,
            voted,
        }
    }

    /// The log ballots are appended to.
    #[must_use]
    pub fn log(&self) -> &SharedLog {
        &self.log
    }

    /// Cast one ballot; at most one per actor across the whole log.
    pub fn cast_vote(&mut self, actor: ActorId, approve: bool) -> Result<ActionReceipt, VoteError> {
        if !self.members.contains(&actor) {
            return Err(VoteError::NotAMember { actor });
        }
        if self.voted.contains(&actor) {
            return Err(VoteError::DuplicateVote { actor });
        }
        let receipt = self.log.append(vote_action(actor, approve))?;
        // Mark only after the append sticks, so a capacity failure does not
        // burn the actor's ballot.
        self.voted.insert(actor);
        Ok(receipt)
    }

    /// Number of ballots accepted so far.
    #[must_use]
    pub fn ballots(&self) -> usize {
        self.voted.len()
    }
}
