// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cf_bench::{as_samples, piecewise_series};
use cf_core::OnlineScorer;
use cf_online::{ChangeFinder, ChangeFinderConfig};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

const N: usize = 100_000;

fn benchmark_changefinder(c: &mut Criterion) {
    let values = piecewise_series(0x5eed, N, 5_000, 3.0);
    let samples = as_samples(&values, 1_700_000_000);
    let repeated = vec![5.0; N];

    let mut group = c.benchmark_group("changefinder_update");

    group.bench_function("default_config_n1e5", |b| {
        b.iter(|| {
            let mut finder = ChangeFinder::new(ChangeFinderConfig::default())
                .expect("default config should be valid");
            for x in &values {
                black_box(finder.update(black_box(*x)).expect("update should succeed"));
            }
        })
    });

    group.bench_function("repeat_guard_constant_n1e5", |b| {
        b.iter(|| {
            let mut finder = ChangeFinder::new(ChangeFinderConfig::default())
                .expect("default config should be valid");
            for x in &repeated {
                black_box(finder.update(black_box(*x)).expect("update should succeed"));
            }
        })
    });

    group.bench_function("score_samples_n1e5", |b| {
        b.iter(|| {
            let mut finder = ChangeFinder::new(ChangeFinderConfig::default())
                .expect("default config should be valid");
            black_box(
                finder
                    .score_samples(black_box(&samples))
                    .expect("ordered samples should score"),
            );
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_changefinder);
criterion_main!(benches);
