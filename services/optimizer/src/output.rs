//! Result presentation and export

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use vote_allocator::{render_weight_lines, to_weight_lines, AllocationResult, ReturnComparison};

const HUMAN_SUFFIX: &str = "optimized_votes_human.json";
const BOT_SUFFIX: &str = "optimized_votes_bot.txt";

/// Paths of the files written for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub human: PathBuf,
    pub bot: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, period: Option<u64>) -> Self {
        let prefix = period.map(|p| format!("{}_", p)).unwrap_or_default();
        Self {
            human: dir.join(format!("{}{}", prefix, HUMAN_SUFFIX)),
            bot: dir.join(format!("{}{}", prefix, BOT_SUFFIX)),
        }
    }
}

/// Write the cent-rounded result as JSON and the bot weight lines
pub fn write_outputs(
    result: &AllocationResult,
    paths: &OutputPaths,
    total_weight: u128,
) -> Result<()> {
    for path in [&paths.human, &paths.bot] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }

    let human = serde_json::to_string_pretty(&result.rounded_to_cents())
        .context("Failed to serialize allocation result")?;
    fs::write(&paths.human, human)
        .with_context(|| format!("Failed to write {:?}", paths.human))?;

    let lines = to_weight_lines(result, total_weight).context("Failed to compute vote weights")?;
    fs::write(&paths.bot, render_weight_lines(&lines))
        .with_context(|| format!("Failed to write {:?}", paths.bot))?;

    info!("Wrote {:?} and {:?}", paths.human, paths.bot);
    Ok(())
}

/// Plain-text table of funded pools
pub fn render_table(result: &AllocationResult) -> String {
    let display = result.rounded_to_cents();
    let mut lines = vec![format!(
        "{:<44} {:<16} {:>20} {:>8} {:>14}",
        "POOL", "SYMBOL", "VOTES", "PCT", "EXPECTED USD"
    )];
    lines.extend(display.funded().map(|allocation| {
        format!(
            "{:<44} {:<16} {:>20} {:>8} {:>14}",
            allocation.pool_id,
            allocation.symbol,
            allocation.votes_assigned.round_dp(4),
            allocation.pct_of_budget,
            allocation.expected_usd
        )
    }));
    lines.push(format!(
        "total expected: ${}  unallocated: {} votes ({}%)",
        display.total_expected_usd,
        display.unallocated_votes.round_dp(4),
        display.unallocated_pct
    ));
    lines.join("\n")
}

pub fn render_comparison(comparison: &ReturnComparison) -> String {
    format!(
        "cast votes returned: ${:.2}  optimum: ${:.2}  difference: ${:.2}",
        comparison.actual_usd.round_dp(2),
        comparison.expected_usd.round_dp(2),
        comparison.difference_usd.round_dp(2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;
    use vote_allocator::PoolAllocation;

    fn sample() -> AllocationResult {
        AllocationResult {
            allocations: vec![
                PoolAllocation {
                    pool_id: "0xaa".to_string(),
                    symbol: "A".to_string(),
                    votes_assigned: dec!(750),
                    pct_of_budget: dec!(75),
                    expected_usd: dec!(33.33333),
                },
                PoolAllocation {
                    pool_id: "0xbb".to_string(),
                    symbol: "B".to_string(),
                    votes_assigned: dec!(250),
                    pct_of_budget: dec!(25),
                    expected_usd: dec!(10.005),
                },
                PoolAllocation {
                    pool_id: "0xcc".to_string(),
                    symbol: "C".to_string(),
                    votes_assigned: dec!(0),
                    pct_of_budget: dec!(0),
                    expected_usd: dec!(0),
                },
            ],
            total_expected_usd: dec!(43.33833),
            available_votes: dec!(1000),
            unallocated_votes: dec!(0),
            unallocated_pct: dec!(0),
            marginal_value: Some(dec!(0.01)),
        }
    }

    #[test]
    fn test_output_paths_with_and_without_period() {
        let dir = Path::new("/tmp/out");
        let plain = OutputPaths::new(dir, None);
        assert_eq!(plain.human, dir.join("optimized_votes_human.json"));
        assert_eq!(plain.bot, dir.join("optimized_votes_bot.txt"));

        let dated = OutputPaths::new(dir, Some(1718236800));
        assert_eq!(dated.human, dir.join("1718236800_optimized_votes_human.json"));
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempdir().unwrap();
        let paths = OutputPaths::new(&dir.path().join("nested"), Some(7));

        write_outputs(&sample(), &paths, 1_000).unwrap();

        let human: AllocationResult =
            serde_json::from_str(&fs::read_to_string(&paths.human).unwrap()).unwrap();
        assert_eq!(human.total_expected_usd, dec!(43.34));
        assert_eq!(human.allocations[1].expected_usd, dec!(10.01));

        let bot = fs::read_to_string(&paths.bot).unwrap();
        let lines: Vec<&str> = bot.lines().collect();
        assert_eq!(lines, vec!["0xaa 750", "0xbb 250"]);
    }

    #[test]
    fn test_table_lists_funded_pools_only() {
        let table = render_table(&sample());
        assert!(table.contains("0xaa"));
        assert!(table.contains("0xbb"));
        assert!(!table.contains("0xcc"));
        assert!(table.contains("total expected: $43.34"));
        assert_eq!(table.lines().count(), 4);
    }

    #[test]
    fn test_comparison_line() {
        let line = render_comparison(&ReturnComparison::new(dec!(48.0908), dec!(45.5)));
        assert_eq!(
            line,
            "cast votes returned: $45.50  optimum: $48.09  difference: $-2.59"
        );
    }
}
