//! Canonical core types used across the ARLE workspace.
//!
//! These live in `arle-core` and are re-exported at the crate root so other
//! crates can import via `arle_core::Action`, `arle_core::ChainHash`, etc.
//!
//! The design keeps serialized forms conservative and portable (serde), and
//! keeps the *hashed* forms independent of serde: chain hashing binds the
//! canonical field encodings directly (see `arle-crypto`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex-string serde for 32-byte digests/identities, so they stay readable in
/// JSON and can key JSON maps.
mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let v = hex::decode(&s).map_err(de::Error::custom)?;
        v.try_into()
            .map_err(|_| de::Error::custom("expected 32 hex-encoded bytes"))
    }
}

/// Schema/wire version for serialized checkpoints.
pub const CHECKPOINT_VERSION: u16 = 1;

/// Opaque 32-byte identity of an action producer.
///
/// Real deployments derive this from a public key or address; the core only
/// requires that equal actors compare equal.
///
/// Serialized as a hex string so it can key JSON maps in accumulators.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl ActorId {
    /// Construct from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Deterministic test/demo actor derived from a small index.
    #[must_use]
    pub fn from_index(i: u64) -> Self {
        let mut b = [0u8; 32];
        b[..8].copy_from_slice(&i.to_le_bytes());
        Self(b)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough to disambiguate in logs.
        write!(f, "{}", &hex::encode(self.0)[..16])
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({self})")
    }
}

/// Application-defined action discriminant.
///
/// Each application owns its kind space; the core never interprets kinds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ActionKind(pub u16);

impl ActionKind {
    /// Raw discriminant value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// An immutable, content-addressed action record.
///
/// `payload` is the application's canonical encoding of any extra fields
/// (amounts, block heights, flags) in little-endian order. Actions are never
/// mutated or deleted once appended to a log.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Action {
    /// Application-defined discriminant (deposit/claim/withdraw/vote/...).
    pub kind: ActionKind,
    /// Who produced the action. Authorization happens before append.
    pub actor: ActorId,
    /// Canonical application payload bytes (may be empty).
    pub payload: Vec<u8>,
}

impl Action {
    /// Construct a new action.
    #[inline]
    #[must_use]
    pub fn new(kind: ActionKind, actor: ActorId, payload: Vec<u8>) -> Self {
        Self {
            kind,
            actor,
            payload,
        }
    }
}

/// Running chain-hash value; doubles as the log cursor type.
///
/// The chain hash at position `n` is a deterministic function of the chain
/// hash at `n - 1` and the action at `n`, so any value of this type is a
/// compact, unforgeable pointer into a specific log prefix.
///
/// Serialized as a hex string; the hashed form never goes through serde.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChainHash(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl ChainHash {
    /// Borrow the raw digest bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &hex::encode(self.0)[..16])
    }
}

impl fmt::Debug for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainHash({self})")
    }
}

/// One appended log entry: the action plus its position and the chain hash
/// *after* folding this action into the chain.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRecord {
    /// Zero-based log position.
    pub position: u64,
    /// The appended action.
    pub action: Action,
    /// Running chain hash including this action.
    pub chain_hash: ChainHash,
}

/// Receipt returned by a successful append.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionReceipt {
    /// Zero-based position of the appended action.
    pub position: u64,
    /// Chain hash after the append (the new log head).
    pub chain_hash: ChainHash,
}

/// Committed `(cursor, accumulator)` pair held by a commitment store.
///
/// The cursor and accumulator only ever change together, as the atomic
/// output of one rollup invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint<A> {
    /// Schema version for forward-compat checks.
    pub version: u16,
    /// Chain hash of the last folded action (genesis if none).
    pub cursor: ChainHash,
    /// Application-defined aggregate state.
    pub accumulator: A,
}

impl<A> Checkpoint<A> {
    /// Construct a checkpoint at the current schema version.
    #[inline]
    #[must_use]
    pub fn new(cursor: ChainHash, accumulator: A) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            cursor,
            accumulator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn actor_display_is_short_hex_prefix() {
        let a = ActorId::from_index(7);
        let s = a.to_string();
        assert_eq!(s.len(), 16);
        assert!(s.starts_with("07000000"));
    }

    #[test]
    fn actor_id_keys_json_maps() {
        let mut m = std::collections::BTreeMap::new();
        m.insert(ActorId::from_index(1), 10u64);
        m.insert(ActorId::from_index(2), 5u64);
        let s = serde_json::to_string(&m).unwrap();
        let back: std::collections::BTreeMap<ActorId, u64> = serde_json::from_str(&s).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn chain_hash_serializes_as_hex_string() {
        let h = ChainHash([0x0F; 32]);
        let s = serde_json::to_string(&h).unwrap();
        assert_eq!(s, format!("\"{}\"", "0f".repeat(32)));
    }

    #[test]
    fn checkpoint_carries_schema_version() {
        let cp = Checkpoint::new(ChainHash([0u8; 32]), 42u64);
        assert_eq!(cp.version, CHECKPOINT_VERSION);
    }

    proptest! {
        /// Hex-string serde holds for arbitrary identities and digests, as a
        /// JSON value and as a JSON map key alike.
        #[test]
        fn hex_serde_round_trips_arbitrary_bytes(
            bytes in proptest::array::uniform32(any::<u8>()),
        ) {
            let actor = ActorId::from_bytes(bytes);
            let s = serde_json::to_string(&actor).unwrap();
            prop_assert_eq!(serde_json::from_str::<ActorId>(&s).unwrap(), actor);

            let hash = ChainHash(bytes);
            let s = serde_json::to_string(&hash).unwrap();
            prop_assert_eq!(s.len(), 66);
            prop_assert_eq!(serde_json::from_str::<ChainHash>(&s).unwrap(), hash);

            let keyed: std::collections::BTreeMap<ActorId, u8> =
                [(actor, 1u8)].into_iter().collect();
            let s = serde_json::to_string(&keyed).unwrap();
            let back: std::collections::BTreeMap<ActorId, u8> =
                serde_json::from_str(&s).unwrap();
            prop_assert_eq!(back, keyed);
        }
    }
}
