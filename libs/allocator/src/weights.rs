//! Integer vote weights for on-chain submission
//!
//! Voter contracts take relative weights, conventionally scaled so a full
//! budget sums to `100e18`.

use crate::error::{AllocationError, Result};
use crate::result::AllocationResult;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 100 * 10^18
pub const DEFAULT_TOTAL_WEIGHT: u128 = 100_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightLine {
    pub pool_id: String,
    pub weight: u128,
}

impl fmt::Display for WeightLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pool_id, self.weight)
    }
}

/// Scale each funded allocation to `votes / available_votes * total_weight`
///
/// Lines are rounded half-up; any rounding overshoot is taken back from the
/// heaviest lines so the weights never sum above `total_weight`, and lines
/// that round to zero are dropped.
pub fn to_weight_lines(result: &AllocationResult, total_weight: u128) -> Result<Vec<WeightLine>> {
    if result.available_votes <= Decimal::ZERO {
        return Ok(Vec::new());
    }
    let total = Decimal::from_u128(total_weight).ok_or_else(|| AllocationError::InvalidParameter {
        name: "total_weight",
        value: total_weight.to_string(),
    })?;

    let mut lines = result
        .funded()
        .map(|allocation| {
            let share = allocation.votes_assigned / result.available_votes;
            let weight = share
                .checked_mul(total)
                .map(|w| w.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
                .and_then(|w| w.to_u128())
                .ok_or_else(|| AllocationError::overflow(format!("weight for {}", allocation.pool_id)))?;
            Ok(WeightLine {
                pool_id: allocation.pool_id.clone(),
                weight,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    clamp_to_total(&mut lines, total_weight);
    lines.retain(|line| line.weight > 0);
    Ok(lines)
}

fn clamp_to_total(lines: &mut [WeightLine], total_weight: u128) {
    let sum = lines.iter().fold(0u128, |acc, line| acc.saturating_add(line.weight));
    let mut excess = sum.saturating_sub(total_weight);
    if excess == 0 {
        return;
    }

    let mut order: Vec<usize> = (0..lines.len()).collect();
    order.sort_by(|&a, &b| lines[b].weight.cmp(&lines[a].weight).then(a.cmp(&b)));
    for i in order {
        if excess == 0 {
            break;
        }
        let take = excess.min(lines[i].weight);
        lines[i].weight -= take;
        excess -= take;
    }
}

pub fn render_weight_lines(lines: &[WeightLine]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
