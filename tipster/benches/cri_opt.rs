use criterion::{criterion_group, criterion_main, Criterion};
use std::ops::RangeInclusive;

use tipster::opt::{
    coordinate_descent, hypergrid_search, CoordinateDescentConfig, CoordinateDescentOutcome,
    HypergridSearchConfig, HypergridSearchOutcome,
};

fn criterion_benchmark(c: &mut Criterion) {
    const RANGE: RangeInclusive<f64> = -10.0..=10.0;

    #[inline(always)]
    fn hypergrid_poly3() -> HypergridSearchOutcome {
        let config = HypergridSearchConfig {
            max_steps: 100,
            acceptable_residual: 1e-12,
            bounds: vec![RANGE; 3],
            resolution: 4,
        };
        // search for root of (x - 5)(x + 6)(x - 10) = 0
        hypergrid_search(
            &config,
            |_| true,
            |values| {
                (values[0] - 5.0).powi(2) + (values[1] + 6.0).powi(2) + (values[2] - 10.0).powi(2)
            },
        )
    }

    #[inline(always)]
    fn coordinate_poly5() -> CoordinateDescentOutcome {
        let config = CoordinateDescentConfig {
            time_budget: None,
            ..CoordinateDescentConfig::default()
        };
        coordinate_descent(&config, vec![0.0; 5], |values| {
            (values[0] - 5.0).powi(2)
                + (values[1] + 6.0).powi(2)
                + (values[2] - 10.0).powi(2)
                + (values[3] + 3.0).powi(2)
                + (values[4] + 9.0).powi(2)
                + 0.1 * values[0] * values[1]
        })
    }

    c.bench_function("cri_hypergrid_poly3", |b| {
        b.iter(hypergrid_poly3);
    });
    c.bench_function("cri_coordinate_poly5", |b| {
        b.iter(coordinate_poly5);
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
