//! Pro-rata bribe reward math
//!
//! A voter adding `v` votes to a pool holding `W` other votes and offering a
//! pot `R` earns `R * v / (v + W)`. The curve is concave in `v`, with
//! derivative `R * W / (v + W)^2`.

use crate::error::{AllocationError, Result};
use crate::records::PoolRewardRecord;
use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal;

/// Expected USD for casting `votes` on a pool
///
/// Computed as `R * (v / (v + W))` so the share stays within `[0, 1]` and the
/// product cannot overflow.
pub fn expected_reward(bribe_usd_pot: Decimal, existing_votes: Decimal, votes: Decimal) -> Decimal {
    if votes <= Decimal::ZERO || bribe_usd_pot <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let total = votes + existing_votes;
    if total.is_zero() {
        return Decimal::ZERO;
    }
    bribe_usd_pot * (votes / total)
}

/// Reward gained per additional vote, `None` when infinite (empty pool, no votes yet)
pub fn marginal_value(bribe_usd_pot: Decimal, existing_votes: Decimal, votes: Decimal) -> Option<Decimal> {
    if bribe_usd_pot <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    let total = votes + existing_votes;
    if total.is_zero() {
        return None;
    }
    Some(bribe_usd_pot * (existing_votes / total) / total)
}

impl PoolRewardRecord {
    pub fn expected_reward(&self, votes: Decimal) -> Decimal {
        expected_reward(self.bribe_usd_pot, self.existing_votes, votes)
    }

    pub fn marginal_value(&self, votes: Decimal) -> Option<Decimal> {
        marginal_value(self.bribe_usd_pot, self.existing_votes, votes)
    }
}

/// Total expected USD of an arbitrary allocation, `votes[i]` going to `records[i]`
///
/// Useful for comparing the optimum against naive splits.
pub fn evaluate(records: &[PoolRewardRecord], votes: &[Decimal]) -> Result<Decimal> {
    if records.len() != votes.len() {
        return Err(AllocationError::InvalidParameter {
            name: "votes",
            value: format!("{} entries for {} records", votes.len(), records.len()),
        });
    }
    records
        .iter()
        .zip(votes)
        .try_fold(Decimal::ZERO, |acc, (record, &v)| {
            acc.checked_add(record.expected_reward(v))
                .ok_or_else(|| AllocationError::overflow("total expected reward"))
        })
}

/// Square root of a non-negative decimal
pub(crate) fn decimal_sqrt(value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO {
        return Err(AllocationError::InvalidParameter {
            name: "sqrt operand",
            value: value.to_string(),
        });
    }
    if value.is_zero() {
        return Ok(Decimal::ZERO);
    }
    value
        .sqrt()
        .ok_or_else(|| AllocationError::overflow(format!("square root of {}", value)))
}

/// Sum decimals, failing instead of panicking on overflow
pub(crate) fn checked_sum<I>(values: I, context: &str) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| AllocationError::overflow(context))
    })
}
