//! arle-bench-harness
//!
//! Run small end-to-end benchmarks (append -> rollup -> verify -> snapshot)
//! and append CSV rows into `benchmarks/reports/bench-<unix>.csv`.
//!
//! Usage examples:
//!   cargo run -p arle-bench-harness -- --profile configs/profiles/small.toml --workload deposit
//!   cargo run -p arle-bench-harness -- --profile configs/profiles/medium.toml --workload farm

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Deserialize;

use arle_apps::deposit::{self, DepositBook, DepositLedgerFold};
use arle_apps::farm::{self, FarmConfig, FarmFold, FarmState};
use arle_apps::settle;
use arle_core::io::{read_action_records_auto, write_action_records_auto, write_checkpoint_cbor};
use arle_core::{ActorId, Checkpoint};
use arle_engine::{CommitmentStore, MemoryStore, RollupEngine, RollupOptions, RollupOutcome};
use arle_log::{ActionLog, ActionSource, LogConfig, SharedLog};

#[derive(Debug, Deserialize)]
struct Profile {
    /// Total actions appended per repeat
    n_actions: u64,
    /// Distinct acting accounts
    n_actors: u64,
    /// Batch bound per rollup invocation
    max_batch: usize,
    /// Repetitions of the whole pipeline
    repeats: u32,
}

#[derive(Clone, Copy, Debug)]
enum WorkloadSel {
    Deposit,
    Farm,
}

fn parse_flag(name: &str, default: &str) -> String {
    let mut it = std::env::args().skip(1);
    while let Some(k) = it.next() {
        if k == format!("--{name}") {
            return it.next().unwrap_or_else(|| default.to_string());
        }
    }
    default.to_string()
}

fn dur_ms(d: Duration) -> u128 {
    d.as_millis()
}

fn fill_log(workload: WorkloadSel, profile: &Profile) -> Result<SharedLog> {
    let log = SharedLog::with_config(LogConfig {
        max_pending: profile.n_actions as usize,
    });
    for i in 0..profile.n_actions {
        let actor = ActorId::from_index(i % profile.n_actors);
        let action = match workload {
            WorkloadSel::Deposit => deposit::deposit_action(actor, 1 + i % 7),
            WorkloadSel::Farm => farm::deposit_action(actor, 1 + i % 7, i),
        };
        log.append(action)?;
    }
    Ok(log)
}

/// Drain the log commit by commit, returning (commits, final cursor).
fn drain<F, S>(
    engine: &RollupEngine<F, S, SharedLog>,
) -> Result<(u64, arle_core::ChainHash), anyhow::Error>
where
    F: arle_engine::FoldFunction,
    S: CommitmentStore<F::Acc>,
{
    let mut commits = 0u64;
    loop {
        match settle(engine, arle_apps::DEFAULT_RETRY_ATTEMPTS)? {
            RollupOutcome::Committed {
                checkpoint,
                remaining,
                ..
            } => {
                commits += 1;
                if remaining == 0 {
                    return Ok((commits, checkpoint.cursor));
                }
            }
            RollupOutcome::UpToDate { checkpoint } => return Ok((commits, checkpoint.cursor)),
            RollupOutcome::SkippedNoOp => anyhow::bail!("store lost its checkpoint"),
        }
    }
}

fn main() -> Result<()> {
    let profile_path = PathBuf::from(parse_flag("profile", "configs/profiles/small.toml"));
    let workload_str = parse_flag("workload", "deposit");
    let workload = match workload_str.as_str() {
        "deposit" => WorkloadSel::Deposit,
        "farm" => WorkloadSel::Farm,
        other => anyhow::bail!("unknown --workload {other} (use deposit|farm)"),
    };

    let profile_src = fs::read_to_string(&profile_path)
        .with_context(|| format!("read profile {:?}", profile_path))?;
    let profile: Profile = toml::from_str(&profile_src).context("parse profile toml")?;
    println!(
        "Profile: n_actions={}, n_actors={}, max_batch={}, repeats={}, workload={workload_str}",
        profile.n_actions, profile.n_actors, profile.max_batch, profile.repeats
    );

    fs::create_dir_all("benchmarks/reports").ok();

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs();
    let csv_path = PathBuf::from(format!("benchmarks/reports/bench-{ts}.csv"));
    let mut csv = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&csv_path)?;
    writeln!(
        csv,
        "timestamp,workload,n_actions,n_actors,max_batch,repeat,stage,ms,extra"
    )?;

    for rep in 0..profile.repeats {
        let log_path = PathBuf::from(format!("benchmarks/tmp-log-{ts}-{rep}.cbor"));
        let ckpt_path = PathBuf::from(format!("benchmarks/tmp-checkpoint-{ts}-{rep}.cbor"));
        fs::create_dir_all("benchmarks").ok();

        // 1) append, then persist the log snapshot
        let t0 = Instant::now();
        let log = fill_log(workload, &profile)?;
        let records = log.actions_since(&log.genesis())?;
        write_action_records_auto(&log_path, &records)?;
        let t_append = t0.elapsed();
        writeln!(
            csv,
            "{ts},{workload_str},{},{},{},{},append,{},log_bytes={}",
            profile.n_actions,
            profile.n_actors,
            profile.max_batch,
            rep,
            dur_ms(t_append),
            fs::metadata(&log_path)?.len()
        )?;

        // 2) rollup to a committed checkpoint, one bounded batch per commit
        let opts = RollupOptions {
            max_batch: profile.max_batch,
        };
        let (t_rollup, commits, cursor, ckpt_bytes) = match workload {
            WorkloadSel::Deposit => {
                let store = MemoryStore::new(Checkpoint::new(log.genesis(), DepositBook::default()));
                let engine = RollupEngine::with_options(DepositLedgerFold, store, log.clone(), opts);
                let t0 = Instant::now();
                let (commits, cursor) = drain(&engine)?;
                let t = t0.elapsed();
                let ckpt = engine
                    .store()
                    .load()?
                    .context("store emptied during bench")?;
                write_checkpoint_cbor(&ckpt_path, &ckpt)?;
                (t, commits, cursor, fs::metadata(&ckpt_path)?.len())
            }
            WorkloadSel::Farm => {
                let store = MemoryStore::new(Checkpoint::new(log.genesis(), FarmState::default()));
                let engine = RollupEngine::with_options(
                    FarmFold::new(FarmConfig::default()),
                    store,
                    log.clone(),
                    opts,
                );
                let t0 = Instant::now();
                let (commits, cursor) = drain(&engine)?;
                let t = t0.elapsed();
                let ckpt = engine
                    .store()
                    .load()?
                    .context("store emptied during bench")?;
                write_checkpoint_cbor(&ckpt_path, &ckpt)?;
                (t, commits, cursor, fs::metadata(&ckpt_path)?.len())
            }
        };
        writeln!(
            csv,
            "{ts},{workload_str},{},{},{},{},rollup,{},commits={commits}",
            profile.n_actions,
            profile.n_actors,
            profile.max_batch,
            rep,
            dur_ms(t_rollup)
        )?;

        // 3) verify the chain, the persisted snapshot, and that the commit
        //    reached the head
        let t0 = Instant::now();
        anyhow::ensure!(log.with(ActionLog::verify_chain), "chain verification failed");
        anyhow::ensure!(cursor == log.head(), "rollup stopped short of the head");
        let reloaded = read_action_records_auto(&log_path)?;
        anyhow::ensure!(
            reloaded.last().map(|r| r.chain_hash) == Some(log.head()),
            "log snapshot diverges from the live head"
        );
        let t_verify = t0.elapsed();
        writeln!(
            csv,
            "{ts},{workload_str},{},{},{},{},verify,{},cursor={}",
            profile.n_actions,
            profile.n_actors,
            profile.max_batch,
            rep,
            dur_ms(t_verify),
            hex::encode(&cursor.0[..8])
        )?;

        // 4) snapshot size of the committed checkpoint
        writeln!(
            csv,
            "{ts},{workload_str},{},{},{},{},snapshot,0,ckpt_bytes={ckpt_bytes}",
            profile.n_actions, profile.n_actors, profile.max_batch, rep
        )?;

        // cleanup temp files to avoid disk bloat
        let _ = fs::remove_file(&log_path);
        let _ = fs::remove_file(&ckpt_path);
    }

    println!("Wrote report → {}", csv_path.display());
    Ok(())
}
