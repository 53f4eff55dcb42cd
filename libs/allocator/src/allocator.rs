//! Bribe-maximizing vote allocation
//!
//! Splits a voter's budget across pools so that the sum of pro-rata bribe
//! rewards is maximal. Uncontested pools are served first since any positive
//! vote collects their whole pot; contested pools share the rest at equal
//! marginal value.

use crate::error::{AllocationError, Result};
use crate::records::{eligible_records, PoolRewardRecord, VoterBudget};
use crate::result::{AllocationResult, PoolAllocation};
use crate::rounding::PercentRounding;
use crate::water_fill::{trim_excess, ContestedPool, SolverConfig, WaterFillSolver};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for vote allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    pub solver: SolverConfig,
    /// Share of the budget placed on each uncontested pool; any positive vote claims the whole pot
    pub empty_pool_seed_fraction: Decimal,
    /// 0 = pure optimum, 100 = split in proportion to existing votes
    pub risk_aversion_pct: Decimal,
    pub rounding: PercentRounding,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            empty_pool_seed_fraction: dec!(0.000001),
            risk_aversion_pct: dec!(0),
            rounding: PercentRounding::default(),
        }
    }
}

impl AllocatorConfig {
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        if self.empty_pool_seed_fraction <= Decimal::ZERO || self.empty_pool_seed_fraction > Decimal::ONE {
            return Err(AllocationError::InvalidParameter {
                name: "empty_pool_seed_fraction",
                value: self.empty_pool_seed_fraction.to_string(),
            });
        }
        if self.risk_aversion_pct < Decimal::ZERO || self.risk_aversion_pct > dec!(100) {
            return Err(AllocationError::InvalidParameter {
                name: "risk_aversion_pct",
                value: self.risk_aversion_pct.to_string(),
            });
        }
        Ok(())
    }
}

/// Computes optimal vote allocations
#[derive(Debug, Clone, Default)]
pub struct Allocator {
    config: AllocatorConfig,
}

impl Allocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Allocate `budget` across `records` to maximize total expected USD.
    ///
    /// Fails on a negative budget, malformed or duplicate records, when no
    /// record offers a positive pot, or when the marginal value search does
    /// not converge. A zero budget yields an all-zero allocation.
    pub fn optimize(
        &self,
        records: &[PoolRewardRecord],
        budget: VoterBudget,
    ) -> Result<AllocationResult> {
        self.config.validate()?;
        budget.validate()?;
        let eligible = eligible_records(records)?;
        let available = budget.available_votes;

        let mut votes = vec![Decimal::ZERO; eligible.len()];
        let mut marginal_value = None;

        if available > Decimal::ZERO {
            let remaining = self.seed_uncontested(&eligible, &mut votes, available);

            let contested: Vec<usize> = (0..eligible.len())
                .filter(|&i| !eligible[i].is_uncontested())
                .collect();
            let pools: Vec<ContestedPool> = contested
                .iter()
                .map(|&i| ContestedPool {
                    bribe_usd_pot: eligible[i].bribe_usd_pot,
                    existing_votes: eligible[i].existing_votes,
                })
                .collect();

            if contested.is_empty() {
                spread_over_uncontested(&eligible, &mut votes, remaining, available);
            } else {
                let fill = WaterFillSolver::new(self.config.solver).solve(&pools, remaining)?;
                for (&i, v) in contested.iter().zip(fill.votes) {
                    votes[i] = v;
                }
                marginal_value = fill.marginal_value;
            }

            if self.config.risk_aversion_pct > Decimal::ZERO {
                self.blend_with_proportional(&eligible, &mut votes, available)?;
                // The blend is no longer an equal-marginal point
                marginal_value = None;
            }
        }

        let result = self.build_result(&eligible, &votes, available, marginal_value);
        info!(
            pools = result.allocations.len(),
            funded = result.funded().count(),
            total_expected_usd = %result.total_expected_usd,
            unallocated_votes = %result.unallocated_votes,
            "Vote allocation computed"
        );
        Ok(result)
    }

    /// Give each uncontested pool its seed, largest pot first; returns the rest of the budget
    fn seed_uncontested(
        &self,
        eligible: &[&PoolRewardRecord],
        votes: &mut [Decimal],
        available: Decimal,
    ) -> Decimal {
        let mut uncontested: Vec<usize> = (0..eligible.len())
            .filter(|&i| eligible[i].is_uncontested())
            .collect();
        uncontested.sort_by(|&a, &b| {
            eligible[b]
                .bribe_usd_pot
                .cmp(&eligible[a].bribe_usd_pot)
                .then_with(|| eligible[a].pool_key().cmp(&eligible[b].pool_key()))
        });

        let seed_size = available * self.config.empty_pool_seed_fraction;
        let mut remaining = available;
        for i in uncontested {
            if remaining <= Decimal::ZERO {
                break;
            }
            let seed = seed_size.min(remaining);
            votes[i] = seed;
            remaining -= seed;
            debug!(pool = %eligible[i].pool_id, %seed, "Seeded uncontested pool");
        }
        remaining
    }

    /// `(1 - θ) * optimal + θ * safe`, where safe splits the budget by existing votes
    fn blend_with_proportional(
        &self,
        eligible: &[&PoolRewardRecord],
        votes: &mut [Decimal],
        available: Decimal,
    ) -> Result<()> {
        let theta = self.config.risk_aversion_pct / dec!(100);
        let total_existing = eligible
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.existing_votes))
            .ok_or_else(|| AllocationError::overflow("existing votes"))?;

        for (v, record) in votes.iter_mut().zip(eligible) {
            let safe = if total_existing.is_zero() {
                Decimal::ZERO
            } else {
                available * (record.existing_votes / total_existing)
            };
            *v = (Decimal::ONE - theta) * *v + theta * safe;
        }
        trim_excess(votes, available);
        debug!(%theta, "Blended optimum with proportional split");
        Ok(())
    }

    fn build_result(
        &self,
        eligible: &[&PoolRewardRecord],
        votes: &[Decimal],
        available: Decimal,
        marginal_value: Option<Decimal>,
    ) -> AllocationResult {
        let mut order: Vec<usize> = (0..eligible.len()).collect();
        order.sort_by(|&a, &b| {
            votes[b]
                .cmp(&votes[a])
                .then_with(|| eligible[a].pool_key().cmp(&eligible[b].pool_key()))
        });

        let exact_pct: Vec<Decimal> = order
            .iter()
            .map(|&i| {
                if available > Decimal::ZERO {
                    votes[i] / available * dec!(100)
                } else {
                    Decimal::ZERO
                }
            })
            .collect();
        let pct = self.config.rounding.apply(&exact_pct);

        let allocations: Vec<PoolAllocation> = order
            .iter()
            .zip(pct)
            .map(|(&i, pct_of_budget)| PoolAllocation {
                pool_id: eligible[i].pool_id.clone(),
                symbol: eligible[i].symbol.clone(),
                votes_assigned: votes[i],
                pct_of_budget,
                expected_usd: eligible[i].expected_reward(votes[i]),
            })
            .collect();

        let total_votes: Decimal = votes.iter().copied().sum();
        let total_pct: Decimal = allocations.iter().map(|a| a.pct_of_budget).sum();
        let unallocated_pct = if available > Decimal::ZERO {
            (dec!(100) - total_pct).max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        AllocationResult {
            total_expected_usd: allocations.iter().map(|a| a.expected_usd).sum(),
            allocations,
            available_votes: available,
            unallocated_votes: (available - total_votes).max(Decimal::ZERO),
            unallocated_pct,
            marginal_value,
        }
    }
}

/// Hand what is left to the seeded uncontested pools in equal shares
///
/// Only used when no contested pool exists; their rewards are unchanged.
fn spread_over_uncontested(
    eligible: &[&PoolRewardRecord],
    votes: &mut [Decimal],
    remaining: Decimal,
    available: Decimal,
) {
    let seeded: Vec<usize> = (0..eligible.len())
        .filter(|&i| eligible[i].is_uncontested() && votes[i] > Decimal::ZERO)
        .collect();
    if seeded.is_empty() || remaining <= Decimal::ZERO {
        return;
    }
    let share = remaining / Decimal::from(seeded.len() as u64);
    for i in seeded {
        votes[i] += share;
    }
    trim_excess(votes, available);
    debug!(%remaining, "Spread leftover budget over uncontested pools");
}

/// Optimize with the default configuration
pub fn optimize(records: &[PoolRewardRecord], budget: VoterBudget) -> Result<AllocationResult> {
    Allocator::default().optimize(records, budget)
}
