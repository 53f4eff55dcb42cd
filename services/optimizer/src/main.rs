//! Vote Optimizer
//!
//! Splits a voter's power across bribe-paying pools to maximize expected
//! rewards for one period. Reads a pool snapshot (plus optional own votes and
//! relay ballots), prints the allocation and writes the human-readable JSON
//! and the weight file consumed by the voting bot.
//!
//! Flow:
//! pools.json → adjustments → allocator → table + <period>_optimized_votes_{human.json,bot.txt}

mod inputs;
mod output;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vote_config::load_config;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "vote_optimizer")]
#[command(about = "Bribe-maximizing vote allocation")]
struct Args {
    /// Pool snapshot (JSON)
    #[arg(short, long)]
    records: PathBuf,

    /// Votes to allocate; defaults to the snapshot's voting_power
    #[arg(short, long)]
    budget: Option<Decimal>,

    /// Votes we already cast this period, deducted from existing votes;
    /// their realized return is compared with the optimum
    #[arg(long)]
    own_votes: Option<PathBuf>,

    /// USD value of the voting tokens, for the forecast APR
    #[arg(long)]
    token_value: Option<Decimal>,

    /// Relay ballots not yet on chain
    #[arg(long)]
    relays: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment override (e.g. conservative, aggressive)
    #[arg(short, long)]
    environment: Option<String>,

    /// Overrides output.output_dir from the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the allocation without writing files
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref(), args.environment.as_deref())
        .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Vote Optimizer starting");
    info!("Records: {:?}", args.records);
    info!("Environment: {}", args.environment.as_deref().unwrap_or("default"));

    let snapshot = inputs::load_snapshot(&args.records)?;
    let budget = pipeline::resolve_budget(args.budget, snapshot.voting_power)?;

    let own_votes = match &args.own_votes {
        Some(path) => inputs::load_own_votes(path)?,
        None => Vec::new(),
    };
    let relays = match &args.relays {
        Some(path) => inputs::load_relays(path)?,
        None => Vec::new(),
    };
    if relays.is_empty() && !config.strategy.avoid_relays_pct.is_zero() {
        warn!("avoid_relays_pct is set but no relay ballots were given");
    }

    let records = pipeline::prepare_records(&snapshot.pools, &own_votes, &relays, &config)?;
    info!(
        "Optimizing {} votes across {} pools",
        budget.available_votes,
        records.len()
    );

    let result = pipeline::run_allocation(&records, budget, &config)?;
    println!("{}", output::render_table(&result));

    if !own_votes.is_empty() {
        let comparison = pipeline::compare_with_cast_votes(&snapshot.pools, &own_votes, &result);
        println!("{}", output::render_comparison(&comparison));
    }
    if let Some(token_value) = args.token_value {
        let apr = pipeline::forecast_apr(&result, token_value)?;
        println!("forecast APR: {}%", apr);
    }

    if args.dry_run {
        info!("Dry run, no files written");
        return Ok(());
    }

    let dir = args
        .output_dir
        .unwrap_or_else(|| config.output.output_dir.clone());
    let paths = output::OutputPaths::new(&dir, snapshot.period);
    output::write_outputs(&result, &paths, config.total_weight()?)?;

    Ok(())
}
