//! Minimal crypto substrate: Blake3 chain hashing for action logs.
//!
//! The chain rule is `chain(n) = H(DS_CHAIN, chain(n-1), H(DS_ACTION, a_n))`
//! with length-prefixed field encodings, so the running value at any position
//! is a compact, collision-resistant commitment to the whole log prefix.
//!
//! The hashed form is independent of serde: fields are bound in a fixed
//! order with explicit length prefixes, so the chain stays **wire-stable**
//! across serialization formats.
//!
//! ⚠️ **Security note:** Blake3 here stands in for an external system's
//! native action-state hash. The chain is collision-resistant but carries no
//! proof-system semantics of its own.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use arle_core::{Action, ChainHash};
use blake3::Hasher;

/// Domain separator for hashing a single action's fields.
const DS_ACTION: &[u8] = b"arle.action.v1";
/// Domain separator for one chain-extension step.
const DS_CHAIN: &[u8] = b"arle.chain.v1";
/// Domain separator for the empty-log chain value.
const DS_GENESIS: &[u8] = b"arle.genesis.v1";

/// Chain value of the empty log.
///
/// Deliberately not all-zero so an uninitialized digest can never pass as a
/// valid cursor.
#[must_use]
pub fn genesis() -> ChainHash {
    let mut h = Hasher::new();
    h.update(DS_GENESIS);
    ChainHash(*h.finalize().as_bytes())
}

/// Content hash of a single action (canonical field encodings, fixed order).
#[must_use]
pub fn action_digest(action: &Action) -> [u8; 32] {
    let mut h = Hasher::new();
    h.update(DS_ACTION);
    h.update(&action.kind.raw().to_le_bytes());
    h.update(action.actor.as_bytes());
    h.update(&(action.payload.len() as u32).to_le_bytes());
    h.update(&action.payload);
    *h.finalize().as_bytes()
}

/// Extend the chain by one action.
#[must_use]
pub fn chain_step(prev: &ChainHash, action: &Action) -> ChainHash {
    let mut h = Hasher::new();
    h.update(DS_CHAIN);
    h.update(prev.as_bytes());
    h.update(&action_digest(action));
    ChainHash(*h.finalize().as_bytes())
}

/// Replay the chain rule over a sequence of actions starting at `from`.
///
/// Used by integrity audits: replaying a full log from [`genesis`] must
/// reproduce the head cursor returned by the last append.
#[must_use]
pub fn replay_chain<'a, I>(from: ChainHash, actions: I) -> ChainHash
where
    I: IntoIterator<Item = &'a Action>,
{
    actions
        .into_iter()
        .fold(from, |acc, a| chain_step(&acc, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arle_core::{ActionKind, ActorId};

    fn act(kind: u16, actor: u64, payload: &[u8]) -> Action {
        Action::new(ActionKind(kind), ActorId::from_index(actor), payload.to_vec())
    }

    #[test]
    fn deterministic_and_order_sensitive() {
        let a = act(0, 1, b"x");
        let b = act(0, 2, b"y");

        let ab = replay_chain(genesis(), [&a, &b]);
        let ab2 = replay_chain(genesis(), [&a, &b]);
        let ba = replay_chain(genesis(), [&b, &a]);

        assert_eq!(ab, ab2);
        assert_ne!(ab, ba);
    }

    #[test]
    fn field_changes_change_the_digest() {
        let base = act(0, 1, b"pay");
        let kind = act(1, 1, b"pay");
        let actor = act(0, 2, b"pay");
        let payload = act(0, 1, b"pax");

        let d = action_digest(&base);
        assert_ne!(d, action_digest(&kind));
        assert_ne!(d, action_digest(&actor));
        assert_ne!(d, action_digest(&payload));
    }

    #[test]
    fn genesis_is_not_zero_and_differs_from_steps() {
        let g = genesis();
        assert_ne!(g, ChainHash([0u8; 32]));
        assert_ne!(g, chain_step(&g, &act(0, 0, b"")));
    }

    #[test]
    fn length_prefix_prevents_payload_splicing() {
        // Same concatenated bytes, different payload boundaries.
        let a = act(0, 1, b"ab");
        let b = act(0, 1, b"a");
        assert_ne!(action_digest(&a), action_digest(&b));
    }
}
