//! Turns loaded inputs and configuration into an allocation

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use tracing::{debug, info};
use vote_allocator::adjust::{
    add_external_votes, apply_relay_avoidance, deduct_own_votes, relay_avoidance_penalties,
    sum_relay_votes, top_n_by_bribe,
};
use vote_allocator::{
    actual_return, evaluate, forecast_apr_pct, AllocationResult, Allocator, AllocatorConfig,
    CastVote, PercentRounding, PoolRewardRecord, RelayBallot, RemainderPolicy, ReturnComparison,
    SolverConfig, VoterBudget,
};
use vote_config::{OptimizerConfig, RemainderMode};

/// Map file configuration onto the allocator's own settings
pub fn allocator_config(config: &OptimizerConfig) -> AllocatorConfig {
    let remainder = match config.output.remainder_policy {
        RemainderMode::ReportUnallocated => RemainderPolicy::ReportUnallocated,
        RemainderMode::AssignToLargest => RemainderPolicy::AssignToLargest,
    };
    let rounding = if config.output.exact_percent {
        PercentRounding::Exact
    } else {
        PercentRounding::Round {
            decimals: config.output.percent_decimals,
            remainder,
        }
    };

    AllocatorConfig {
        solver: SolverConfig {
            max_iterations: config.solver.max_iterations,
            tolerance: config.solver.tolerance,
        },
        empty_pool_seed_fraction: config.solver.empty_pool_seed_fraction,
        risk_aversion_pct: config.strategy.risk_aversion_pct,
        rounding,
    }
}

/// Budget from the command line, else the snapshot's recorded voting power
pub fn resolve_budget(cli: Option<Decimal>, snapshot: Option<Decimal>) -> Result<VoterBudget> {
    match cli.or(snapshot) {
        Some(votes) => Ok(VoterBudget::new(votes)),
        None => bail!("No budget: pass --budget or include voting_power in the pools file"),
    }
}

/// Apply own-vote deduction, relay votes, relay avoidance and top-N, in that order
pub fn prepare_records(
    records: &[PoolRewardRecord],
    own_votes: &[CastVote],
    relays: &[RelayBallot],
    config: &OptimizerConfig,
) -> Result<Vec<PoolRewardRecord>> {
    let mut prepared = records.to_vec();

    if !own_votes.is_empty() {
        debug!("Deducting {} own votes", own_votes.len());
        prepared = deduct_own_votes(&prepared, own_votes);
    }

    if !relays.is_empty() {
        let totals = sum_relay_votes(relays);
        debug!("Adding relay votes on {} pools", totals.len());
        prepared = add_external_votes(&prepared, &totals);

        let penalties = relay_avoidance_penalties(relays, config.strategy.relay_top_k);
        prepared = apply_relay_avoidance(&prepared, &penalties, config.strategy.avoid_relays_pct)
            .context("Failed to apply relay avoidance")?;
    }

    if let Some(n) = config.strategy.top_n {
        prepared = top_n_by_bribe(&prepared, n);
    }

    Ok(prepared)
}

/// Optimize and log the gain over an equal split of the budget
pub fn run_allocation(
    records: &[PoolRewardRecord],
    budget: VoterBudget,
    config: &OptimizerConfig,
) -> Result<AllocationResult> {
    let allocator = Allocator::new(allocator_config(config));
    let result = allocator
        .optimize(records, budget)
        .context("Allocation failed")?;

    let eligible: Vec<PoolRewardRecord> = records
        .iter()
        .filter(|r| r.is_eligible())
        .cloned()
        .collect();
    if !eligible.is_empty() {
        let share = budget.available_votes / Decimal::from(eligible.len() as u64);
        let equal_split = vec![share; eligible.len()];
        let baseline = evaluate(&eligible, &equal_split).context("Failed to evaluate baseline")?;
        info!(
            "Expected ${} vs ${} for an equal split (+${})",
            result.total_expected_usd.round_dp(2),
            baseline.round_dp(2),
            (result.total_expected_usd - baseline).round_dp(2)
        );
    }

    Ok(result)
}

/// Realized return of the votes we cast, against the optimum for the same period
///
/// `final_records` is the raw snapshot whose vote totals include our votes.
pub fn compare_with_cast_votes(
    final_records: &[PoolRewardRecord],
    own_votes: &[CastVote],
    result: &AllocationResult,
) -> ReturnComparison {
    let comparison = ReturnComparison::new(
        result.total_expected_usd,
        actual_return(final_records, own_votes),
    );
    info!(
        "Cast votes returned ${} vs ${} at the optimum ({}${})",
        comparison.actual_usd.round_dp(2),
        comparison.expected_usd.round_dp(2),
        if comparison.difference_usd < Decimal::ZERO { "-" } else { "+" },
        comparison.difference_usd.abs().round_dp(2)
    );
    comparison
}

/// Forecast APR of the optimum on the USD value of the voting tokens
pub fn forecast_apr(result: &AllocationResult, token_value_usd: Decimal) -> Result<Decimal> {
    let apr = forecast_apr_pct(result.total_expected_usd, token_value_usd)
        .context("Failed to compute forecast APR")?;
    info!("Forecast APR: {}% on ${} of voting tokens", apr, token_value_usd);
    Ok(apr)
}
