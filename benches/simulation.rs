//! Performance benchmarks for savanna

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use savanna::genes::GeneTable;
use savanna::{Config, Species, World};

fn benchmark_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for herbivores in [50, 150, 250].iter() {
        let mut config = Config::default();
        config.population.herbivores = *herbivores;

        let mut world = World::new_with_seed(&config, 42);

        // Warm up
        for _ in 0..10 {
            world.step();
        }

        group.bench_with_input(
            BenchmarkId::new("herbivores", herbivores),
            herbivores,
            |b, _| {
                b.iter(|| {
                    world.step();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_perception(c: &mut Criterion) {
    let config = Config::default();
    let world = World::new_with_seed(&config, 42);

    c.bench_function("perceive_center", |b| {
        b.iter(|| {
            world
                .grid
                .perceive(black_box(30), black_box(15), Species::Herbivore)
        });
    });
}

fn benchmark_gene_generation(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    c.bench_function("gene_table_random", |b| {
        b.iter(|| GeneTable::random(Species::Herbivore, black_box(4), &mut rng));
    });
}

fn benchmark_gene_mix(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let a = GeneTable::random(Species::Omnivore, 4, &mut rng);
    let b_table = GeneTable::random(Species::Omnivore, 4, &mut rng);

    c.bench_function("gene_table_mix", |b| {
        b.iter(|| GeneTable::mix(black_box(&a), black_box(&b_table), Species::Omnivore, &mut rng));
    });
}

criterion_group!(
    benches,
    benchmark_world_step,
    benchmark_perception,
    benchmark_gene_generation,
    benchmark_gene_mix,
);

criterion_main!(benches);
