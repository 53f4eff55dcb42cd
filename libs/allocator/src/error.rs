//! Allocation errors
//!
//! Every failure is reported to the caller. The optimizer is a pure function
//! of its inputs, so none of these are retried internally.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors returned by the allocator and the record adjustments
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocationError {
    /// Voting power must be non-negative
    #[error("Invalid budget: available votes {available_votes} is negative")]
    InvalidBudget { available_votes: Decimal },

    /// No record offers a positive bribe pot
    #[error("No eligible pools: none of {total_records} records has a positive bribe pot")]
    EmptyInput { total_records: usize },

    /// Bisection for the common marginal value did not settle
    #[error("Marginal value search did not converge after {iterations} iterations (residual {residual} votes)")]
    ConvergenceError { iterations: u32, residual: Decimal },

    /// A record carries data the reward model cannot use
    #[error("Invalid record for pool {pool_id}: {reason}")]
    InvalidRecord { pool_id: String, reason: String },

    /// The same pool appears twice in one run
    #[error("Duplicate pool {pool_id} in input records")]
    DuplicatePool { pool_id: String },

    /// A tuning parameter is outside its allowed range
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// Decimal arithmetic exceeded the representable range
    #[error("Arithmetic overflow while computing {context}")]
    ArithmeticOverflow { context: String },
}

pub type Result<T> = std::result::Result<T, AllocationError>;

impl AllocationError {
    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        Self::ArithmeticOverflow {
            context: context.into(),
        }
    }

    /// True when the caller simply had nothing to allocate
    pub fn is_empty_input(&self) -> bool {
        matches!(self, Self::EmptyInput { .. })
    }
}
