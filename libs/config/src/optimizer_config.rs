//! Optimizer Configuration Module
//!
//! Loads optimizer settings from a TOML file, an optional
//! environment-specific override file and `VOTE_OPT__*` environment variables,
//! in that order of precedence (last wins).

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Main optimizer configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    pub solver: SolverSettings,
    pub strategy: StrategySettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

/// Marginal value search limits
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iterations: u32,
    pub tolerance: Decimal,
    /// Share of the budget placed on each pool nobody else votes for, in (0, 1]
    pub empty_pool_seed_fraction: Decimal,
}

/// Allocation strategy knobs
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StrategySettings {
    /// 0 = pure optimum, 100 = split in proportion to existing votes
    pub risk_aversion_pct: Decimal,
    /// 0 = ignore relays, 100 = strongest penalty on relay-held pools
    pub avoid_relays_pct: Decimal,
    pub relay_top_k: usize,
    /// Only consider the N largest bribe pots
    pub top_n: Option<usize>,
}

/// How percentages show leftover rounding
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemainderMode {
    #[default]
    ReportUnallocated,
    AssignToLargest,
}

/// Result presentation and export
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Show budget percentages unrounded; `percent_decimals` and `remainder_policy` are then ignored
    pub exact_percent: bool,
    /// Decimal places for budget percentages
    pub percent_decimals: u32,
    pub remainder_policy: RemainderMode,
    /// Weight sum of a full budget, as a decimal string (exceeds u64)
    pub total_weight: String,
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: defaults::solver::MAX_ITERATIONS,
            tolerance: Decimal::from_str(defaults::solver::TOLERANCE).unwrap_or(Decimal::ZERO),
            empty_pool_seed_fraction: Decimal::from_str(defaults::solver::EMPTY_POOL_SEED_FRACTION)
                .unwrap_or(Decimal::ONE),
        }
    }
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            risk_aversion_pct: Decimal::ZERO,
            avoid_relays_pct: Decimal::ZERO,
            relay_top_k: defaults::strategy::RELAY_TOP_K,
            top_n: None,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            exact_percent: false,
            percent_decimals: defaults::output::PERCENT_DECIMALS,
            remainder_policy: RemainderMode::default(),
            total_weight: defaults::output::TOTAL_WEIGHT.to_string(),
            output_dir: PathBuf::from(defaults::output::OUTPUT_DIR),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl OptimizerConfig {
    /// Load configuration from files with environment overrides
    ///
    /// An explicitly given base file must exist; the default one is optional
    /// so the optimizer runs on built-in defaults out of the box.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let (base, required) = match base_path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(defaults::DEFAULT_CONFIG_PATH), false),
        };
        debug!("Loading base config: {:?} (required: {})", base, required);

        let mut builder = Config::builder().add_source(File::from(base.as_path()).required(required));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(defaults::ENVIRONMENTS_DIR)
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(defaults::ENV_PREFIX)
                .prefix_separator(defaults::ENV_SEPARATOR)
                .separator(defaults::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject settings the allocator would refuse anyway, with config-level context
    pub fn validate(&self) -> Result<()> {
        if self.solver.max_iterations == 0 {
            bail!("solver.max_iterations must be positive");
        }
        if self.solver.tolerance <= Decimal::ZERO || self.solver.tolerance >= Decimal::ONE {
            bail!("solver.tolerance must be in (0, 1), got {}", self.solver.tolerance);
        }
        let seed = self.solver.empty_pool_seed_fraction;
        if seed <= Decimal::ZERO || seed > Decimal::ONE {
            bail!("solver.empty_pool_seed_fraction must be in (0, 1], got {}", seed);
        }
        for (name, value) in [
            ("strategy.risk_aversion_pct", self.strategy.risk_aversion_pct),
            ("strategy.avoid_relays_pct", self.strategy.avoid_relays_pct),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                bail!("{} must be between 0 and 100, got {}", name, value);
            }
        }
        if self.strategy.top_n == Some(0) {
            bail!("strategy.top_n must be positive when set");
        }
        if self.output.percent_decimals > 28 {
            bail!(
                "output.percent_decimals must be at most 28, got {}",
                self.output.percent_decimals
            );
        }
        self.total_weight()?;
        Ok(())
    }

    pub fn total_weight(&self) -> Result<u128> {
        self.output
            .total_weight
            .trim()
            .parse::<u128>()
            .with_context(|| format!("Invalid output.total_weight '{}'", self.output.total_weight))
    }

    /// Expand environment variables in path values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let raw = self.output.output_dir.to_string_lossy().to_string();
        let expanded = shellexpand::env(&raw).context("Failed to expand output directory")?;
        self.output.output_dir = PathBuf::from(expanded.as_ref());
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Convenience function to load, expand and validate configuration
pub fn load_config(base_path: Option<&Path>, environment: Option<&str>) -> Result<OptimizerConfig> {
    let mut config = OptimizerConfig::load(base_path, environment)?;
    config.expand_env_vars()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_base_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("optimizer.toml");

        let config_content = r#"
[solver]
max_iterations = 150
tolerance = "0.0000001"

[strategy]
risk_aversion_pct = 25
top_n = 10

[output]
remainder_policy = "assign_to_largest"
output_dir = "/tmp/votes"
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = OptimizerConfig::load(Some(&config_path), None).unwrap();

        assert_eq!(config.solver.max_iterations, 150);
        assert_eq!(config.solver.tolerance, dec!(0.0000001));
        assert_eq!(config.solver.empty_pool_seed_fraction, dec!(0.000001));
        assert!(!config.output.exact_percent);
        assert_eq!(config.output.percent_decimals, 0);
        assert_eq!(config.strategy.risk_aversion_pct, dec!(25));
        assert_eq!(config.strategy.top_n, Some(10));
        assert_eq!(config.strategy.relay_top_k, 3);
        assert_eq!(config.output.remainder_policy, RemainderMode::AssignToLargest);
        assert_eq!(config.output.output_dir, PathBuf::from("/tmp/votes"));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_override() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("optimizer.toml");
        fs::write(&config_path, "[strategy]\nrisk_aversion_pct = 10\n").unwrap();

        let env_dir = dir.path().join(defaults::ENVIRONMENTS_DIR);
        fs::create_dir_all(&env_dir).unwrap();
        fs::write(
            env_dir.join("aggressive.toml"),
            "[strategy]\nrisk_aversion_pct = 0\navoid_relays_pct = 40\n",
        )
        .unwrap();

        let config = OptimizerConfig::load(Some(&config_path), Some("aggressive")).unwrap();
        assert_eq!(config.strategy.risk_aversion_pct, dec!(0));
        assert_eq!(config.strategy.avoid_relays_pct, dec!(40));

        // Unknown environments fall back to the base file
        let config = OptimizerConfig::load(Some(&config_path), Some("missing")).unwrap();
        assert_eq!(config.strategy.risk_aversion_pct, dec!(10));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(OptimizerConfig::load(Some(&missing), None).is_err());
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.total_weight().unwrap(), 100_000_000_000_000_000_000);

        config.strategy.avoid_relays_pct = dec!(150);
        assert!(config.validate().is_err());

        let mut config = OptimizerConfig::default();
        config.output.total_weight = "lots".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exact_percent_selectable_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("optimizer.toml");
        fs::write(&config_path, "[output]\nexact_percent = true\n").unwrap();

        let config = OptimizerConfig::load(Some(&config_path), None).unwrap();
        assert!(config.output.exact_percent);
        assert_eq!(config.output.percent_decimals, 0);
    }

    #[test]
    fn test_seed_fraction_must_be_a_share() {
        let mut config = OptimizerConfig::default();
        config.solver.empty_pool_seed_fraction = dec!(1);
        assert!(config.validate().is_ok());
        config.solver.empty_pool_seed_fraction = dec!(2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = OptimizerConfig::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[solver]"));

        let dir = tempdir().unwrap();
        let path = dir.path().join("rendered.toml");
        fs::write(&path, rendered).unwrap();
        let reloaded = OptimizerConfig::load(Some(&path), None).unwrap();
        assert_eq!(reloaded, config);
    }
}
