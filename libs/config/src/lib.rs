//! # Vote Optimizer Configuration
//!
//! Layered configuration for the vote optimizer: a base TOML file, optional
//! per-environment overrides and `VOTE_OPT__*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vote_config::load_config;
//!
//! let config = load_config(None, Some("production")).unwrap();
//! println!("risk aversion: {}%", config.strategy.risk_aversion_pct);
//! ```

pub mod defaults;
pub mod optimizer_config;

// Re-export commonly used types
pub use optimizer_config::{
    load_config, LoggingSettings, OptimizerConfig, OutputSettings, RemainderMode, SolverSettings,
    StrategySettings,
};
