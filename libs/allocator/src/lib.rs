//! # Vote Allocator - Bribe-Maximizing Vote Split
//!
//! ## Purpose
//!
//! Given a voter's voting power for one epoch and a set of pools, each paying
//! a USD bribe pot pro-rata to its voters, computes the split of votes that
//! maximizes the voter's total expected reward. The reward of `v` votes on a
//! pool with pot `R` and `W` votes from others is `R * v / (v + W)`, concave
//! in `v`, so equal marginal value across funded pools is the global optimum.
//!
//! ## Integration Points
//!
//! - **Input**: `PoolRewardRecord` snapshots built by the caller from on-chain
//!   and pricing data, plus a `VoterBudget`
//! - **Adjustments**: own-vote deduction, relay votes, relay avoidance, top-N
//! - **Output**: `AllocationResult` with per-pool votes, budget percentages and
//!   expected USD; integer weight lines for vote submission
//! - **Analytics**: realized return of cast votes and forecast APR
//!
//! ## Precision
//!
//! All arithmetic is `Decimal`; no floating point. The solver is pure and
//! deterministic: identical inputs, in any order, give identical results.

pub mod adjust;
pub mod analytics;
pub mod allocator;
pub mod error;
pub mod records;
pub mod result;
pub mod reward;
pub mod rounding;
pub mod water_fill;
pub mod weights;

pub use adjust::{CastVote, RelayBallot, RelayVote};
pub use analytics::{actual_return, forecast_apr_pct, ReturnComparison};
pub use allocator::{optimize, Allocator, AllocatorConfig};
pub use error::{AllocationError, Result};
pub use records::{PoolRewardRecord, VoterBudget};
pub use result::{AllocationResult, PoolAllocation};
pub use reward::{evaluate, expected_reward, marginal_value};
pub use rounding::{PercentRounding, RemainderPolicy};
pub use water_fill::{SolverConfig, WaterFillSolver};
pub use weights::{render_weight_lines, to_weight_lines, WeightLine, DEFAULT_TOTAL_WEIGHT};

/// Common types for allocation calculations
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
