//! Equal-marginal-value solver for contested pools
//!
//! At the optimum every pool receiving votes has the same marginal value λ:
//! `R * W / (v + W)^2 = λ`, so `v = max(0, t * sqrt(R * W) - W)` with
//! `t = 1 / sqrt(λ)`. Total demand is monotone in `t`, which the solver
//! bisects until demand meets the budget. The active set found this way is
//! then solved in closed form so the budget is used exactly.

use crate::error::{AllocationError, Result};
use crate::reward::{checked_sum, decimal_sqrt};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bisection limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Upper bound on bisection steps before giving up
    pub max_iterations: u32,
    /// Accepted demand/budget mismatch as a fraction of the budget
    pub tolerance: Decimal,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: dec!(0.000000000001), // 1e-12 of the budget
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AllocationError::InvalidParameter {
                name: "max_iterations",
                value: self.max_iterations.to_string(),
            });
        }
        if self.tolerance <= Decimal::ZERO || self.tolerance >= Decimal::ONE {
            return Err(AllocationError::InvalidParameter {
                name: "tolerance",
                value: self.tolerance.to_string(),
            });
        }
        Ok(())
    }
}

/// A pool that already holds other voters' votes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContestedPool {
    pub bribe_usd_pot: Decimal,
    pub existing_votes: Decimal,
}

/// Solver output, votes in input order
#[derive(Debug, Clone, PartialEq)]
pub struct WaterFill {
    pub votes: Vec<Decimal>,
    /// Common marginal value λ of the pools that received votes
    pub marginal_value: Option<Decimal>,
    pub iterations: u32,
}

impl WaterFill {
    fn idle(len: usize) -> Self {
        Self {
            votes: vec![Decimal::ZERO; len],
            marginal_value: None,
            iterations: 0,
        }
    }
}

/// Distributes a budget over contested pools at equal marginal value
pub struct WaterFillSolver {
    config: SolverConfig,
}

impl WaterFillSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn solve(&self, pools: &[ContestedPool], budget: Decimal) -> Result<WaterFill> {
        if pools.is_empty() || budget <= Decimal::ZERO {
            return Ok(WaterFill::idle(pools.len()));
        }

        // sqrt(R) * sqrt(W) instead of sqrt(R * W) keeps large pots from overflowing
        let leverage = pools
            .iter()
            .map(|p| Ok(decimal_sqrt(p.bribe_usd_pot)? * decimal_sqrt(p.existing_votes)?))
            .collect::<Result<Vec<_>>>()?;

        let total_existing = checked_sum(pools.iter().map(|p| p.existing_votes), "existing votes")?;
        let total_leverage = checked_sum(leverage.iter().copied(), "pool leverage")?;
        if total_leverage.is_zero() {
            debug!("Contested pools have no usable leverage, leaving budget unallocated");
            return Ok(WaterFill::idle(pools.len()));
        }

        // demand(t) >= t * Σs - ΣW, so this t always covers the budget
        let upper = budget
            .checked_add(total_existing)
            .and_then(|sum| sum.checked_div(total_leverage))
            .ok_or_else(|| AllocationError::overflow("marginal value bracket"))?;

        let tolerance = budget * self.config.tolerance;
        let (t, iterations) = self.bisect(pools, &leverage, budget, upper, tolerance)?;
        debug!(iterations, %t, "Bisection settled");

        let (votes, t_star) = self.polish(pools, &leverage, budget, t)?;
        let marginal_value = t_star
            .checked_mul(t_star)
            .filter(|sq| !sq.is_zero())
            .and_then(|sq| Decimal::ONE.checked_div(sq));

        Ok(WaterFill {
            votes,
            marginal_value,
            iterations,
        })
    }

    fn bisect(
        &self,
        pools: &[ContestedPool],
        leverage: &[Decimal],
        budget: Decimal,
        upper: Decimal,
        tolerance: Decimal,
    ) -> Result<(Decimal, u32)> {
        let mut lo = Decimal::ZERO;
        let mut hi = upper;
        let mut residual = demand(pools, leverage, hi) - budget;

        for iteration in 1..=self.config.max_iterations {
            let mid = (lo + hi) / dec!(2);
            if mid == lo || mid == hi {
                // Decimal precision exhausted: the bracket is as tight as it gets,
                // the closed form on its active set does the rest
                debug!(iteration, %residual, "Bisection hit decimal resolution");
                return Ok((mid, iteration));
            }

            residual = demand(pools, leverage, mid) - budget;
            if residual.abs() <= tolerance {
                return Ok((mid, iteration));
            }
            if residual > Decimal::ZERO {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        Err(AllocationError::ConvergenceError {
            iterations: self.config.max_iterations,
            residual: residual.abs(),
        })
    }

    /// Solve `Σ_S (t s_i - W_i) = B` exactly on the active set.
    ///
    /// A pool joins once `t` passes its threshold `W_i / s_i`, so the active
    /// set is always a prefix of the pools ordered by threshold. Starting from
    /// the prefix the bisection found, the prefix only ever moves one way.
    fn polish(
        &self,
        pools: &[ContestedPool],
        leverage: &[Decimal],
        budget: Decimal,
        t: Decimal,
    ) -> Result<(Vec<Decimal>, Decimal)> {
        let mut order: Vec<usize> = (0..pools.len())
            .filter(|&i| !leverage[i].is_zero())
            .collect();
        let threshold = |i: usize| pools[i].existing_votes / leverage[i];
        order.sort_by(|&a, &b| threshold(a).cmp(&threshold(b)).then(a.cmp(&b)));
        let thresholds: Vec<Decimal> = order.iter().map(|&i| threshold(i)).collect();

        let mut k = thresholds.iter().filter(|&&th| th < t).count().max(1);
        for _ in 0..=order.len() {
            let active = &order[..k];
            let sum_existing = checked_sum(active.iter().map(|&i| pools[i].existing_votes), "active existing votes")?;
            let sum_leverage = checked_sum(active.iter().map(|&i| leverage[i]), "active leverage")?;
            let t_star = budget
                .checked_add(sum_existing)
                .and_then(|sum| sum.checked_div(sum_leverage))
                .ok_or_else(|| AllocationError::overflow("closed-form marginal value"))?;

            if k > 1 && t_star <= thresholds[k - 1] {
                k -= 1;
                continue;
            }
            if k < order.len() && t_star > thresholds[k] {
                k += 1;
                continue;
            }

            let mut votes = vec![Decimal::ZERO; pools.len()];
            for &i in active {
                votes[i] = (t_star * leverage[i] - pools[i].existing_votes).max(Decimal::ZERO);
            }
            trim_excess(&mut votes, budget);
            return Ok((votes, t_star));
        }

        Err(AllocationError::ConvergenceError {
            iterations: self.config.max_iterations,
            residual: budget,
        })
    }
}

impl Default for WaterFillSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

fn demand(pools: &[ContestedPool], leverage: &[Decimal], t: Decimal) -> Decimal {
    pools
        .iter()
        .zip(leverage)
        .map(|(p, &s)| (t * s - p.existing_votes).max(Decimal::ZERO))
        .sum()
}

/// Remove decimal rounding overshoot so votes never exceed the budget
pub(crate) fn trim_excess(votes: &mut [Decimal], budget: Decimal) {
    let total: Decimal = votes.iter().copied().sum();
    let mut excess = total - budget;
    if excess <= Decimal::ZERO {
        return;
    }

    let mut order: Vec<usize> = (0..votes.len()).collect();
    order.sort_by(|&a, &b| votes[b].cmp(&votes[a]).then(a.cmp(&b)));
    for idx in order {
        if excess <= Decimal::ZERO {
            break;
        }
        let take = votes[idx].min(excess);
        votes[idx] -= take;
        excess -= take;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(bribe: Decimal, existing: Decimal) -> ContestedPool {
        ContestedPool {
            bribe_usd_pot: bribe,
            existing_votes: existing,
        }
    }

    #[test]
    fn test_two_pools_equalize_marginal_value() {
        let pools = [pool(dec!(100), dec!(1000)), pool(dec!(50), dec!(200))];
        let fill = WaterFillSolver::default().solve(&pools, dec!(500)).unwrap();

        let total: Decimal = fill.votes.iter().copied().sum();
        assert!(total <= dec!(500));
        assert!((total - dec!(500)).abs() < dec!(0.000001));

        // v_A ≈ 291.57, v_B ≈ 208.43
        assert!((fill.votes[0] - dec!(291.5697)).abs() < dec!(0.01));
        assert!((fill.votes[1] - dec!(208.4303)).abs() < dec!(0.01));

        let lambda = fill.marginal_value.unwrap();
        for (p, v) in pools.iter().zip(&fill.votes) {
            let mv = crate::reward::marginal_value(p.bribe_usd_pot, p.existing_votes, *v).unwrap();
            assert!((mv - lambda).abs() < dec!(0.0000001));
        }
    }

    #[test]
    fn test_weak_pool_left_out() {
        // Pool B's first vote is worth 1/10000, far below λ of pool A
        let pools = [pool(dec!(1000), dec!(100)), pool(dec!(1), dec!(10000))];
        let fill = WaterFillSolver::default().solve(&pools, dec!(50)).unwrap();
        assert_eq!(fill.votes[1], Decimal::ZERO);
        assert!((fill.votes[0] - dec!(50)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_identical_pools_split_evenly() {
        let pools = [pool(dec!(70), dec!(300)); 3];
        let fill = WaterFillSolver::default().solve(&pools, dec!(90)).unwrap();
        assert_eq!(fill.votes[0], fill.votes[1]);
        assert_eq!(fill.votes[1], fill.votes[2]);
        assert!((fill.votes[0] - dec!(30)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_zero_budget_is_idle() {
        let pools = [pool(dec!(1), dec!(1))];
        let fill = WaterFillSolver::default().solve(&pools, dec!(0)).unwrap();
        assert_eq!(fill.votes, vec![Decimal::ZERO]);
        assert_eq!(fill.marginal_value, None);
    }

    #[test]
    fn test_iteration_limit_reports_convergence_error() {
        let solver = WaterFillSolver::new(SolverConfig {
            max_iterations: 1,
            tolerance: dec!(0.000000000001),
        });
        let pools = [pool(dec!(100), dec!(1000)), pool(dec!(50), dec!(200))];
        let err = solver.solve(&pools, dec!(500)).unwrap_err();
        assert!(matches!(err, AllocationError::ConvergenceError { .. }));
    }

    #[test]
    fn test_wei_scale_existing_votes_still_solve() {
        // 1e17..1e20 existing votes against a budget of 1 exceed what 28 digits resolve
        for existing in [dec!(100000000000000000), dec!(100000000000000000000)] {
            let fill = WaterFillSolver::default()
                .solve(&[pool(dec!(5000), existing)], dec!(1))
                .unwrap();
            assert!(fill.votes[0] <= dec!(1));
            assert!((fill.votes[0] - dec!(1)).abs() < dec!(0.000001), "{} existing -> {}", existing, fill.votes[0]);
        }
    }

    #[test]
    fn test_trim_excess_takes_from_largest() {
        let mut votes = vec![dec!(1), dec!(5), dec!(2)];
        trim_excess(&mut votes, dec!(7.5));
        assert_eq!(votes, vec![dec!(1), dec!(4.5), dec!(2)]);
    }

    #[test]
    fn test_solver_config_validation() {
        assert!(SolverConfig::default().validate().is_ok());
        let bad = SolverConfig {
            max_iterations: 10,
            tolerance: dec!(0),
        };
        assert!(bad.validate().is_err());
    }
}
