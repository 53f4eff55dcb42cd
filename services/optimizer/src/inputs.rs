//! Input files for one optimization run

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;
use vote_allocator::{CastVote, PoolRewardRecord, RelayBallot};

/// Pool snapshot for one voting period
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSnapshot {
    #[serde(default)]
    pub period: Option<u64>,
    /// Voting power recorded with the snapshot, used when no budget is given
    #[serde(default)]
    pub voting_power: Option<Decimal>,
    pub pools: Vec<PoolRewardRecord>,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file {:?}", what, path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {} file {:?}", what, path))
}

pub fn load_snapshot(path: &Path) -> Result<PoolSnapshot> {
    let snapshot: PoolSnapshot = read_json(path, "pools")?;
    debug!(
        "Loaded {} pools (period {:?}) from {:?}",
        snapshot.pools.len(),
        snapshot.period,
        path
    );
    Ok(snapshot)
}

pub fn load_own_votes(path: &Path) -> Result<Vec<CastVote>> {
    read_json(path, "own votes")
}

pub fn load_relays(path: &Path) -> Result<Vec<RelayBallot>> {
    read_json(path, "relays")
}
