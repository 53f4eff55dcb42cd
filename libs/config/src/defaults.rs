//! Default values shared by the config loader and its consumers

/// Base configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/optimizer.toml";

/// Directory (next to the base file) holding `<environment>.toml` overrides
pub const ENVIRONMENTS_DIR: &str = "environments";

/// Environment variable prefix; nested keys use `__`, e.g. `VOTE_OPT__STRATEGY__TOP_N`
pub const ENV_PREFIX: &str = "VOTE_OPT";
pub const ENV_SEPARATOR: &str = "__";

/// Solver defaults
pub mod solver {
    pub const MAX_ITERATIONS: u32 = 200;

    /// Accepted demand/budget mismatch as a fraction of the budget
    pub const TOLERANCE: &str = "0.000000000001";

    /// One millionth of the budget per uncontested pool
    pub const EMPTY_POOL_SEED_FRACTION: &str = "0.000001";
}

/// Strategy defaults
pub mod strategy {
    /// Relays considered when computing avoidance penalties
    pub const RELAY_TOP_K: usize = 3;
}

/// Output defaults
pub mod output {
    pub const OUTPUT_DIR: &str = "optimized_votes";

    /// Weights for a full budget sum to 100e18
    pub const TOTAL_WEIGHT: &str = "100000000000000000000";

    pub const PERCENT_DECIMALS: u32 = 0;
}
