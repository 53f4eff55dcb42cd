//! Pool reward snapshots and the voter's budget
//!
//! Records are built fresh for each optimization run from point-in-time
//! epoch data and never mutated by the allocator.

use crate::error::{AllocationError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// One pool's reward offer for a single voting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRewardRecord {
    pub pool_id: String,
    #[serde(default)]
    pub symbol: String,
    /// Total USD bribes paid pro-rata to the pool's voters this period
    pub bribe_usd_pot: Decimal,
    /// Votes already committed by everyone except us
    pub existing_votes: Decimal,
}

impl PoolRewardRecord {
    pub fn new(
        pool_id: impl Into<String>,
        symbol: impl Into<String>,
        bribe_usd_pot: Decimal,
        existing_votes: Decimal,
    ) -> Self {
        Self {
            pool_id: pool_id.into(),
            symbol: symbol.into(),
            bribe_usd_pot,
            existing_votes,
        }
    }

    /// Pool ids are compared case-insensitively (hex addresses arrive in mixed case)
    pub fn pool_key(&self) -> String {
        self.pool_id.to_ascii_lowercase()
    }

    pub fn is_pool(&self, pool_id: &str) -> bool {
        self.pool_id.eq_ignore_ascii_case(pool_id)
    }

    /// Only a positive pot can ever pay for a vote
    pub fn is_eligible(&self) -> bool {
        self.bribe_usd_pot > Decimal::ZERO
    }

    /// Uncontested pools pay the whole pot to the first voter
    pub fn is_uncontested(&self) -> bool {
        self.existing_votes.is_zero()
    }
}

/// Voting power available to split across pools for one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoterBudget {
    pub available_votes: Decimal,
}

impl VoterBudget {
    pub fn new(available_votes: Decimal) -> Self {
        Self { available_votes }
    }

    pub fn validate(&self) -> Result<()> {
        if self.available_votes < Decimal::ZERO {
            return Err(AllocationError::InvalidBudget {
                available_votes: self.available_votes,
            });
        }
        Ok(())
    }
}

impl From<Decimal> for VoterBudget {
    fn from(available_votes: Decimal) -> Self {
        Self::new(available_votes)
    }
}

/// Validate the run's records and return the eligible ones ordered by pool key.
///
/// Negative vote counts and duplicate pools are rejected outright; pools
/// without a positive pot are dropped. An empty eligible set is an error so
/// callers can tell "nothing to allocate" apart from "zero reward".
pub(crate) fn eligible_records(records: &[PoolRewardRecord]) -> Result<Vec<&PoolRewardRecord>> {
    let mut seen = HashSet::with_capacity(records.len());

    for record in records {
        if record.existing_votes < Decimal::ZERO {
            return Err(AllocationError::InvalidRecord {
                pool_id: record.pool_id.clone(),
                reason: format!("existing votes {} is negative", record.existing_votes),
            });
        }
        if !seen.insert(record.pool_key()) {
            return Err(AllocationError::DuplicatePool {
                pool_id: record.pool_id.clone(),
            });
        }
    }

    let mut eligible: Vec<&PoolRewardRecord> = records
        .iter()
        .filter(|record| {
            let keep = record.is_eligible();
            if !keep {
                debug!(
                    pool = %record.pool_id,
                    bribe_usd = %record.bribe_usd_pot,
                    "Skipping pool without a positive bribe pot"
                );
            }
            keep
        })
        .collect();

    if eligible.is_empty() {
        return Err(AllocationError::EmptyInput {
            total_records: records.len(),
        });
    }

    eligible.sort_by_key(|record| record.pool_key());
    Ok(eligible)
}
