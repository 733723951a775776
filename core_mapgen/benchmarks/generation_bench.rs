use std::sync::Arc;

use core_mapgen::{MapGenConfig, MapGenerator};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group.sample_size(10);

    for size in [24u32, 32, 48, 64] {
        let mut config = MapGenConfig::builtin().as_ref().clone();
        config.map.width = size;
        config.map.height = size * 2 / 3;
        config.map.civilization_count = 1;
        config.map.min_seed_separation = 0;
        let generator = match MapGenerator::new(Arc::new(config)) {
            Ok(generator) => generator,
            Err(err) => panic!("bench config rejected: {err}"),
        };

        group.bench_with_input(BenchmarkId::new("grid", size), &size, |b, _| {
            let mut seed = 0u64;
            b.iter(|| {
                seed += 1;
                generator.generate(seed)
            })
        });
    }

    group.finish();
}

criterion_group!(generation_benches, bench_generate);
criterion_main!(generation_benches);
