//! Realized returns and yield of an allocation
//!
//! After a period closes, each pool's final vote total includes our own votes,
//! so the realized reward of a cast vote is `R * v / W_final`.

use crate::adjust::CastVote;
use crate::error::{AllocationError, Result};
use crate::records::PoolRewardRecord;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Voting periods per year
pub const PERIODS_PER_YEAR: u32 = 52;

/// Reward earned by `cast_votes` given each pool's final pot and vote total
///
/// `records` must be the closing snapshot, where `existing_votes` already counts
/// the cast votes. Votes on pools missing from the snapshot earn nothing.
pub fn actual_return(records: &[PoolRewardRecord], cast_votes: &[CastVote]) -> Decimal {
    let finals: BTreeMap<String, &PoolRewardRecord> =
        records.iter().map(|r| (r.pool_key(), r)).collect();

    let mut total = Decimal::ZERO;
    for vote in cast_votes {
        let Some(record) = finals.get(&vote.pool_id.to_ascii_lowercase()) else {
            warn!(pool = %vote.pool_id, "Cast vote on a pool missing from the snapshot");
            continue;
        };
        if record.existing_votes <= Decimal::ZERO || vote.votes <= Decimal::ZERO {
            continue;
        }
        total += record.bribe_usd_pot * (vote.votes / record.existing_votes);
    }
    total
}

/// Annualized yield in percent of one period's reward on the voting tokens' USD value
///
/// Rounded half-up to two decimals; zero when the tokens are worth nothing.
pub fn forecast_apr_pct(period_reward_usd: Decimal, token_value_usd: Decimal) -> Result<Decimal> {
    if token_value_usd < Decimal::ZERO {
        return Err(AllocationError::InvalidParameter {
            name: "token_value_usd",
            value: token_value_usd.to_string(),
        });
    }
    if token_value_usd.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let apr = period_reward_usd
        .checked_mul(Decimal::from(PERIODS_PER_YEAR))
        .and_then(|yearly| yearly.checked_div(token_value_usd))
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .ok_or_else(|| AllocationError::overflow("forecast APR"))?;
    Ok(apr.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Realized reward of the votes actually cast next to the optimizer's expectation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnComparison {
    pub expected_usd: Decimal,
    pub actual_usd: Decimal,
    /// `actual - expected`; negative when the cast votes underperformed
    pub difference_usd: Decimal,
}

impl ReturnComparison {
    pub fn new(expected_usd: Decimal, actual_usd: Decimal) -> Self {
        Self {
            expected_usd,
            actual_usd,
            difference_usd: actual_usd - expected_usd,
        }
    }
}
