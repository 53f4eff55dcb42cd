//! Record adjustments applied before optimizing
//!
//! Snapshots rarely describe the field exactly as the voter faces it: our own
//! earlier votes are already counted in re-runs, relays hold votes that are
//! not on chain yet, and some voters prefer to stay out of relay-dominated
//! pools. Each transform returns new records and leaves the input untouched.

use crate::error::{AllocationError, Result};
use crate::records::PoolRewardRecord;
use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Votes a voter has already cast on one pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastVote {
    pub pool_id: String,
    pub votes: Decimal,
}

/// One relay's committed votes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayBallot {
    #[serde(default)]
    pub name: String,
    /// Total voting power controlled by the relay
    #[serde(default)]
    pub voting_amount: Decimal,
    pub votes: Vec<RelayVote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayVote {
    pub pool_id: String,
    #[serde(default)]
    pub votes: Decimal,
    /// Share of the relay's power on this pool, 0-100
    #[serde(default)]
    pub percent: Decimal,
}

fn check_pct(name: &'static str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO || value > dec!(100) {
        return Err(AllocationError::InvalidParameter {
            name,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Remove our own previously cast votes from `existing_votes`
///
/// Used when re-optimizing a period we already voted in, or replaying a past
/// period as if we had voted last.
pub fn deduct_own_votes(records: &[PoolRewardRecord], own_votes: &[CastVote]) -> Vec<PoolRewardRecord> {
    let mut own: BTreeMap<String, Decimal> = BTreeMap::new();
    for vote in own_votes {
        if vote.votes < Decimal::ZERO {
            warn!(pool = %vote.pool_id, votes = %vote.votes, "Ignoring negative cast vote");
            continue;
        }
        *own.entry(vote.pool_id.to_ascii_lowercase()).or_default() += vote.votes;
    }

    records
        .iter()
        .map(|record| {
            let mut adjusted = record.clone();
            if let Some(&mine) = own.get(&record.pool_key()) {
                let remaining = record.existing_votes - mine;
                if remaining < Decimal::ZERO {
                    warn!(
                        pool = %record.pool_id,
                        existing = %record.existing_votes,
                        own = %mine,
                        "Own votes exceed pool total, clamping to zero"
                    );
                }
                adjusted.existing_votes = remaining.max(Decimal::ZERO);
            }
            adjusted
        })
        .collect()
}

/// Total relay votes per pool key
pub fn sum_relay_votes(relays: &[RelayBallot]) -> BTreeMap<String, Decimal> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for relay in relays {
        for vote in &relay.votes {
            if vote.votes > Decimal::ZERO {
                *totals.entry(vote.pool_id.to_ascii_lowercase()).or_default() += vote.votes;
            }
        }
    }
    totals
}

/// Add votes committed off-chain (relays) to each pool's existing votes
pub fn add_external_votes(
    records: &[PoolRewardRecord],
    totals: &BTreeMap<String, Decimal>,
) -> Vec<PoolRewardRecord> {
    records
        .iter()
        .map(|record| {
            let mut adjusted = record.clone();
            if let Some(&extra) = totals.get(&record.pool_key()) {
                adjusted.existing_votes += extra;
            }
            adjusted
        })
        .collect()
}

/// Per-pool relay presence in `[0, 1]` from the `top_k` relays by voting power
pub fn relay_avoidance_penalties(relays: &[RelayBallot], top_k: usize) -> BTreeMap<String, Decimal> {
    let mut ranked: Vec<&RelayBallot> = relays.iter().collect();
    ranked.sort_by(|a, b| b.voting_amount.cmp(&a.voting_amount).then_with(|| a.name.cmp(&b.name)));

    let mut penalties: BTreeMap<String, Decimal> = BTreeMap::new();
    for relay in ranked.into_iter().take(top_k) {
        for vote in &relay.votes {
            let share = (vote.percent / dec!(100)).max(Decimal::ZERO);
            *penalties.entry(vote.pool_id.to_ascii_lowercase()).or_default() += share;
        }
    }
    for penalty in penalties.values_mut() {
        *penalty = (*penalty).min(Decimal::ONE);
    }
    penalties
}

/// Scale pot and existing votes by `(1 - ρ)^(2α)`, `α = avoid_pct / 100`
///
/// At 0 nothing changes; at 100 a pool fully held by relays drops out.
pub fn apply_relay_avoidance(
    records: &[PoolRewardRecord],
    penalties: &BTreeMap<String, Decimal>,
    avoid_pct: Decimal,
) -> Result<Vec<PoolRewardRecord>> {
    check_pct("avoid_relays_pct", avoid_pct)?;
    let exponent = dec!(2) * avoid_pct / dec!(100);
    if exponent.is_zero() {
        return Ok(records.to_vec());
    }

    records
        .iter()
        .map(|record| {
            let mut adjusted = record.clone();
            let Some(&rho) = penalties.get(&record.pool_key()) else {
                return Ok(adjusted);
            };
            let leftover = (Decimal::ONE - rho).max(Decimal::ZERO);
            let factor = if leftover.is_zero() {
                Decimal::ZERO
            } else {
                leftover
                    .checked_powd(exponent)
                    .ok_or_else(|| AllocationError::overflow(format!("avoidance factor for {}", record.pool_id)))?
            };
            debug!(pool = %record.pool_id, %rho, %factor, "Applying relay avoidance");
            adjusted.bribe_usd_pot *= factor;
            adjusted.existing_votes *= factor;
            Ok(adjusted)
        })
        .collect()
}

/// Keep the `n` largest bribe pots, ties broken by pool id
pub fn top_n_by_bribe(records: &[PoolRewardRecord], n: usize) -> Vec<PoolRewardRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| {
        b.bribe_usd_pot
            .cmp(&a.bribe_usd_pot)
            .then_with(|| a.pool_key().cmp(&b.pool_key()))
    });
    ranked.truncate(n);
    ranked
}
