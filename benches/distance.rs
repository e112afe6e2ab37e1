//! Benchmarks for the branch-distance heuristic and dominance ranking.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use coversearch::search::{
    branch_distance, fast_nondominated_sort, GeneNode, ObjectivePool, Opcode, TestCase,
};
use coversearch::search::{FunctionObjective, ObjectiveFunction};

fn bench_branch_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("branch_distance");

    for samples in [1, 16, 256, 4096] {
        let left: Vec<f64> = (0..samples).map(|i| i as f64).collect();
        let right: Vec<f64> = (0..samples).map(|i| (samples - i) as f64).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(samples),
            &samples,
            |b, _| {
                b.iter(|| {
                    branch_distance(
                        black_box(Opcode::Gt),
                        black_box(&left),
                        black_box(&right),
                        black_box(true),
                    )
                    .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_nondominated_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("nondominated_sort");

    for size in [16, 64, 256] {
        let mut pool = ObjectivePool::new();
        let objectives: Vec<_> = (0..8)
            .map(|i| {
                pool.register(
                    Box::new(FunctionObjective::new(format!("f{i}")))
                        as Box<dyn ObjectiveFunction>,
                )
            })
            .collect();

        let population: Vec<TestCase> = (0..size)
            .map(|i| {
                let values: Vec<f64> = objectives
                    .iter()
                    .enumerate()
                    .map(|(j, _)| ((i * 31 + j * 17) % 100) as f64 / 100.0)
                    .collect();
                TestCase::with_distances(GeneNode::leaf("1.0", "num"), &objectives, &values)
                    .unwrap()
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut working = population.clone();
                fast_nondominated_sort(black_box(&mut working), black_box(&objectives))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_branch_distance, bench_nondominated_sort);
criterion_main!(benches);
