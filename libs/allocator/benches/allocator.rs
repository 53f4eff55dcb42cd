//! Allocation benchmarks
//!
//! Epoch snapshots carry a few hundred votable pools; a full optimization
//! should stay well under a millisecond at that size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vote_allocator::{dec, optimize, Decimal, PoolRewardRecord, VoterBudget, WaterFillSolver};

/// Deterministic pool set with a spread of pots and vote depths
fn create_pools(count: usize) -> Vec<PoolRewardRecord> {
    (0..count)
        .map(|i| {
            let bribe = Decimal::from((i as u64 * 7_919) % 25_000 + 50);
            let existing = Decimal::from((i as u64 * 104_729) % 2_000_000 + 1_000);
            PoolRewardRecord::new(format!("0x{:040x}", i), format!("POOL{}", i), bribe, existing)
        })
        .collect()
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize");
    for count in [10usize, 100, 500] {
        let pools = create_pools(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &pools, |b, pools| {
            b.iter(|| optimize(black_box(pools), VoterBudget::new(dec!(2500000))).unwrap())
        });
    }
    group.finish();
}

fn bench_water_fill(c: &mut Criterion) {
    let pools: Vec<_> = create_pools(100)
        .iter()
        .map(|r| vote_allocator::water_fill::ContestedPool {
            bribe_usd_pot: r.bribe_usd_pot,
            existing_votes: r.existing_votes,
        })
        .collect();
    let solver = WaterFillSolver::default();

    c.bench_function("water_fill_100_pools", |b| {
        b.iter(|| solver.solve(black_box(&pools), dec!(2500000)).unwrap())
    });
}

criterion_group!(benches, bench_optimize, bench_water_fill);
criterion_main!(benches);
