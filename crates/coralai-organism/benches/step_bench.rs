use coralai_core::{World, WorldConfig};
use coralai_organism::{CoralOrganism, Organism, OrganismConfig};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn bench_organism_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("organism_step");
    group.sample_size(env_or("CORAL_BENCH_SAMPLES", 20_usize).max(10));
    group.warm_up_time(Duration::from_secs(env_or("CORAL_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("CORAL_BENCH_MEASURE_SECS", 8)));
    let steps = env_or("CORAL_BENCH_STEPS", 8_usize).max(1);
    let sizes: Vec<usize> = std::env::var("CORAL_BENCH_SIZES")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![64_usize, 128, 256]);

    for &size in &sizes {
        group.bench_function(format!("steps{steps}_grid{size}"), |b| {
            b.iter_batched(
                || {
                    let mut world: World<f32> =
                        WorldConfig::coral(size, size).build().expect("world");
                    world.allocate().expect("allocate");
                    world
                        .paint_disc("energy", size / 2, size / 2, size / 4, 1.0)
                        .expect("paint");
                    let config = OrganismConfig {
                        rng_seed: Some(0xC0_4A1),
                        ..OrganismConfig::default()
                    };
                    let organism = CoralOrganism::new(&world, config).expect("organism");
                    (world, organism)
                },
                |(mut world, mut organism)| {
                    for _ in 0..steps {
                        organism.forward(&mut world).expect("step");
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_organism_steps);
criterion_main!(benches);
