//! Allocation output

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Votes assigned to a single pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolAllocation {
    pub pool_id: String,
    pub symbol: String,
    pub votes_assigned: Decimal,
    pub pct_of_budget: Decimal,
    pub expected_usd: Decimal,
}

/// Outcome of one optimization run
///
/// Allocations are ordered by votes descending, then pool id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub allocations: Vec<PoolAllocation>,
    pub total_expected_usd: Decimal,
    pub available_votes: Decimal,
    pub unallocated_votes: Decimal,
    pub unallocated_pct: Decimal,
    /// Common marginal value (USD per vote) of the contested pools at the optimum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marginal_value: Option<Decimal>,
}

impl AllocationResult {
    pub fn total_votes(&self) -> Decimal {
        self.allocations.iter().map(|a| a.votes_assigned).sum()
    }

    pub fn get(&self, pool_id: &str) -> Option<&PoolAllocation> {
        self.allocations
            .iter()
            .find(|a| a.pool_id.eq_ignore_ascii_case(pool_id))
    }

    /// Pools that actually receive votes
    pub fn funded(&self) -> impl Iterator<Item = &PoolAllocation> {
        self.allocations
            .iter()
            .filter(|a| a.votes_assigned > Decimal::ZERO)
    }

    /// Copy with USD figures rounded to cents for display and export
    pub fn rounded_to_cents(&self) -> Self {
        let cents = |v: Decimal| v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            allocations: self
                .allocations
                .iter()
                .map(|a| PoolAllocation {
                    expected_usd: cents(a.expected_usd),
                    ..a.clone()
                })
                .collect(),
            total_expected_usd: cents(self.total_expected_usd),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> AllocationResult {
        AllocationResult {
            allocations: vec![
                PoolAllocation {
                    pool_id: "0xAA".to_string(),
                    symbol: "A".to_string(),
                    votes_assigned: dec!(300),
                    pct_of_budget: dec!(60),
                    expected_usd: dec!(12.345),
                },
                PoolAllocation {
                    pool_id: "0xbb".to_string(),
                    symbol: "B".to_string(),
                    votes_assigned: dec!(0),
                    pct_of_budget: dec!(0),
                    expected_usd: dec!(0),
                },
            ],
            total_expected_usd: dec!(12.345),
            available_votes: dec!(500),
            unallocated_votes: dec!(200),
            unallocated_pct: dec!(40),
            marginal_value: None,
        }
    }

    #[test]
    fn test_lookup_and_funded() {
        let result = sample();
        assert_eq!(result.total_votes(), dec!(300));
        assert!(result.get("0xaa").is_some());
        assert_eq!(result.funded().count(), 1);
    }

    #[test]
    fn test_rounded_to_cents() {
        let rounded = sample().rounded_to_cents();
        assert_eq!(rounded.total_expected_usd, dec!(12.35));
        assert_eq!(rounded.allocations[0].expected_usd, dec!(12.35));
        assert_eq!(rounded.allocations[0].votes_assigned, dec!(300));
    }
}
