//! Serialization helpers for action logs and checkpoints.
//!
//! JSON and CBOR read/write utilities with extension-based auto-detection.
//! Unknown/missing extensions are rejected for reads and default to JSON
//! for writes.
//!
//! Extras:
//! - In-memory CBOR helpers: [`to_cbor`] / [`from_cbor`]

use crate::types::{ActionRecord, Checkpoint};
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;

/// Ensure the parent directory for a file exists (no-op if none).
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(path)))?;
        }
    }
    Ok(())
}

/* ------------------------------
 * Action record (Vec) I/O
 * ------------------------------ */

/// Read `Vec<ActionRecord>` from **JSON**.
pub fn read_action_records_json<P: AsRef<Path>>(path: P) -> Result<Vec<ActionRecord>> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let rdr = BufReader::new(f);
    let v: Vec<ActionRecord> =
        serde_json::from_reader(rdr).with_context(|| "deserialize JSON action records")?;
    Ok(v)
}

/// Write `Vec<ActionRecord>` to **JSON** (pretty).
pub fn write_action_records_json<P: AsRef<Path>>(path: P, v: &[ActionRecord]) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let w = BufWriter::new(f);
    serde_json::to_writer_pretty(w, v).with_context(|| "serialize JSON action records")?;
    Ok(())
}

/// Read `Vec<ActionRecord>` from **CBOR**.
pub fn read_action_records_cbor<P: AsRef<Path>>(path: P) -> Result<Vec<ActionRecord>> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let mut rdr = BufReader::new(f);
    let v: Vec<ActionRecord> =
        ciborium::de::from_reader(&mut rdr).with_context(|| "deserialize CBOR action records")?;
    Ok(v)
}

/// Write `Vec<ActionRecord>` to **CBOR**.
pub fn write_action_records_cbor<P: AsRef<Path>>(path: P, v: &[ActionRecord]) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| "serialize CBOR action records")?;
    Ok(())
}

/// Auto-detect read by extension `.json` / `.cbor` (case-insensitive).
pub fn read_action_records_auto<P: AsRef<Path>>(path: P) -> Result<Vec<ActionRecord>> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_action_records_json(path),
        Some("cbor") => read_action_records_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported action-log extension: {} (supported: .json, .cbor)",
            other
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_action_records_auto<P: AsRef<Path>>(path: P, v: &[ActionRecord]) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_action_records_cbor(path, v),
        _ => write_action_records_json(path, v),
    }
}

/* ------------------------------
 * Checkpoint I/O
 * ------------------------------ */

/// Read a `Checkpoint<A>` from **JSON**.
pub fn read_checkpoint_json<A, P>(path: P) -> Result<Checkpoint<A>>
where
    A: DeserializeOwned,
    P: AsRef<Path>,
{
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let rdr = BufReader::new(f);
    let v: Checkpoint<A> =
        serde_json::from_reader(rdr).with_context(|| "deserialize JSON checkpoint")?;
    Ok(v)
}

/// Write a `Checkpoint<A>` to **JSON** (pretty).
pub fn write_checkpoint_json<A, P>(path: P, cp: &Checkpoint<A>) -> Result<()>
where
    A: Serialize,
    P: AsRef<Path>,
{
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let w = BufWriter::new(f);
    serde_json::to_writer_pretty(w, cp).with_context(|| "serialize JSON checkpoint")?;
    Ok(())
}

/// Read a `Checkpoint<A>` from **CBOR**.
pub fn read_checkpoint_cbor<A, P>(path: P) -> Result<Checkpoint<A>>
where
    A: DeserializeOwned,
    P: AsRef<Path>,
{
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let mut rdr = BufReader::new(f);
    let v: Checkpoint<A> =
        ciborium::de::from_reader(&mut rdr).with_context(|| "deserialize CBOR checkpoint")?;
    Ok(v)
}

/// Write a `Checkpoint<A>` to **CBOR**.
pub fn write_checkpoint_cbor<A, P>(path: P, cp: &Checkpoint<A>) -> Result<()>
where
    A: Serialize,
    P: AsRef<Path>,
{
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(cp, &mut w).with_context(|| "serialize CBOR checkpoint")?;
    Ok(())
}

/// Auto-detect checkpoint read by extension `.json` / `.cbor`.
pub fn read_checkpoint_auto<A, P>(path: P) -> Result<Checkpoint<A>>
where
    A: DeserializeOwned,
    P: AsRef<Path>,
{
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_checkpoint_json(path),
        Some("cbor") => read_checkpoint_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported checkpoint extension: {} (supported: .json, .cbor)",
            other
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect checkpoint write (defaults to **JSON**).
pub fn write_checkpoint_auto<A, P>(path: P, cp: &Checkpoint<A>) -> Result<()>
where
    A: Serialize,
    P: AsRef<Path>,
{
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_checkpoint_cbor(path, cp),
        _ => write_checkpoint_json(path, cp),
    }
}

/* ------------------------------
 * In-memory CBOR helpers
 * ------------------------------ */

/// Serialize any `Serialize` value to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).with_context(|| "serialize CBOR value")?;
    Ok(out)
}

/// Deserialize any `DeserializeOwned` value from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let rdr = Cursor::new(bytes);
    let v = ciborium::de::from_reader(rdr).with_context(|| "deserialize CBOR value")?;
    Ok(v)
}

/* -------------------- Small helpers -------------------- */

#[inline]
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
}

#[inline]
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, ActionKind, ActorId, ChainHash};

    fn mk_record(position: u64) -> ActionRecord {
        ActionRecord {
            position,
            action: Action::new(
                ActionKind(0),
                ActorId::from_index(position),
                position.to_le_bytes().to_vec(),
            ),
            chain_hash: ChainHash([position as u8; 32]),
        }
    }

    #[test]
    fn action_records_json_cbor_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![mk_record(0), mk_record(1), mk_record(2)];

        let jp = dir.path().join("log.json");
        write_action_records_auto(&jp, &records).unwrap();
        assert_eq!(read_action_records_auto(&jp).unwrap(), records);

        let cp = dir.path().join("log.cbor");
        write_action_records_auto(&cp, &records).unwrap();
        assert_eq!(read_action_records_auto(&cp).unwrap(), records);
    }

    #[test]
    fn checkpoint_roundtrip_and_bad_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cp = Checkpoint::new(ChainHash([9u8; 32]), vec![1u64, 2, 3]);

        let p = dir.path().join("state.cbor");
        write_checkpoint_auto(&p, &cp).unwrap();
        let back: Checkpoint<Vec<u64>> = read_checkpoint_auto(&p).unwrap();
        assert_eq!(back, cp);

        let bad = dir.path().join("state.toml");
        assert!(read_checkpoint_auto::<Vec<u64>, _>(&bad).is_err());
    }

    #[test]
    fn in_memory_cbor_roundtrip() {
        let r = mk_record(5);
        let bytes = to_cbor(&r).unwrap();
        let back: ActionRecord = from_cbor(&bytes).unwrap();
        assert_eq!(back, r);
    }
}
