//! Display percentages of the voting budget

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Where the rounding leftover of displayed percentages goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Truncate each share and report what is left as unallocated
    #[default]
    ReportUnallocated,
    /// Round half-up, then correct the largest shares to match the allocated total
    AssignToLargest,
}

/// How `pct_of_budget` is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentRounding {
    Exact,
    Round {
        decimals: u32,
        remainder: RemainderPolicy,
    },
}

impl Default for PercentRounding {
    fn default() -> Self {
        Self::whole_percent(RemainderPolicy::default())
    }
}

impl PercentRounding {
    pub fn whole_percent(remainder: RemainderPolicy) -> Self {
        Self::Round {
            decimals: 0,
            remainder,
        }
    }

    /// Round exact shares (each in `[0, 100]`); the result never sums above 100
    pub fn apply(&self, exact: &[Decimal]) -> Vec<Decimal> {
        match *self {
            Self::Exact => exact.to_vec(),
            Self::Round {
                decimals,
                remainder: RemainderPolicy::ReportUnallocated,
            } => exact
                .iter()
                .map(|pct| pct.round_dp_with_strategy(decimals.min(28), RoundingStrategy::ToZero))
                .collect(),
            Self::Round {
                decimals,
                remainder: RemainderPolicy::AssignToLargest,
            } => assign_to_largest(exact, decimals.min(28)),
        }
    }
}

fn half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

fn assign_to_largest(exact: &[Decimal], decimals: u32) -> Vec<Decimal> {
    let mut rounded: Vec<Decimal> = exact.iter().map(|&pct| half_up(pct, decimals)).collect();

    let exact_total: Decimal = exact.iter().copied().sum();
    let target = half_up(exact_total, decimals).min(dec!(100));
    let mut diff = target - rounded.iter().copied().sum::<Decimal>();
    if diff.is_zero() {
        return rounded;
    }

    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| exact[b].cmp(&exact[a]).then(a.cmp(&b)));

    if diff > Decimal::ZERO {
        if let Some(&largest) = order.first() {
            rounded[largest] += diff;
        }
        return rounded;
    }

    // Overshoot: shave from the largest shares first, never below zero
    for idx in order {
        if diff >= Decimal::ZERO {
            break;
        }
        let take = rounded[idx].min(-diff);
        rounded[idx] -= take;
        diff += take;
    }
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_passthrough() {
        let exact = vec![dec!(33.3333), dec!(66.6667)];
        assert_eq!(PercentRounding::Exact.apply(&exact), exact);
    }

    #[test]
    fn test_report_unallocated_truncates() {
        let exact = vec![dec!(50.5), dec!(49.5)];
        let rounded = PercentRounding::default().apply(&exact);
        assert_eq!(rounded, vec![dec!(50), dec!(49)]);
        // 1% left for the caller to report as unallocated
        assert_eq!(rounded.iter().copied().sum::<Decimal>(), dec!(99));
    }

    #[test]
    fn test_assign_to_largest_fixes_overshoot() {
        let exact = vec![dec!(50.5), dec!(49.5)];
        let rounded = PercentRounding::whole_percent(RemainderPolicy::AssignToLargest).apply(&exact);
        // 51 + 50 = 101 overshoots; the largest share absorbs it
        assert_eq!(rounded, vec![dec!(50), dec!(50)]);
    }

    #[test]
    fn test_assign_to_largest_fills_undershoot() {
        let exact = vec![dec!(33.4), dec!(33.3), dec!(33.3)];
        let rounded = PercentRounding::whole_percent(RemainderPolicy::AssignToLargest).apply(&exact);
        assert_eq!(rounded, vec![dec!(34), dec!(33), dec!(33)]);
    }

    #[test]
    fn test_assign_to_largest_spills_past_small_shares() {
        // Four half-percent shares round to 1 each, but only 2% is allocated
        let exact = vec![dec!(0.5); 4];
        let rounded = PercentRounding::whole_percent(RemainderPolicy::AssignToLargest).apply(&exact);
        assert_eq!(rounded.iter().copied().sum::<Decimal>(), dec!(2));
        assert!(rounded.iter().all(|pct| *pct >= Decimal::ZERO));
    }

    #[test]
    fn test_decimals_respected() {
        let exact = vec![dec!(12.3456)];
        let policy = PercentRounding::Round {
            decimals: 2,
            remainder: RemainderPolicy::ReportUnallocated,
        };
        assert_eq!(policy.apply(&exact), vec![dec!(12.34)]);
    }
}
