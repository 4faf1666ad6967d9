use backbone_core::backbone::{ChunkingConfig, search_for_target};
use backbone_core::{Algorithm, BackboningConfig, EdgeRecord, TargetReduction, WeightedGraph, build_graph, run_backboning, validate};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SIZES: [usize; 3] = [200, 1_000, 5_000];

/// Sparse random graph with average degree about 8, split into `parts`
/// disjoint blocks so the chunked path has components to work on.
fn random_graph(nodes: usize, parts: usize, seed: u64) -> WeightedGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let block = nodes / parts;
    let mut rows = Vec::with_capacity(nodes * 4);
    for p in 0..parts {
        let base = p * block;
        for _ in 0..block * 4 {
            let a = base + rng.gen_range(0..block);
            let b = base + rng.gen_range(0..block);
            if a != b {
                rows.push(EdgeRecord::new(format!("v{a}"), format!("v{b}"), rng.gen_range(1.0..50.0)));
            }
        }
    }
    build_graph(rows).expect("bench graph builds")
}

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("backbone.filters");

    for &n in &SIZES {
        let graph = random_graph(n, 1, 0xBAC_B0E + n as u64);
        group.throughput(Throughput::Elements(graph.edge_count() as u64));

        for algorithm in [
            Algorithm::DisparityFilter { alpha: 0.05 },
            Algorithm::NoiseCorrected { alpha: 0.05 },
            Algorithm::Threshold {
                threshold: backbone_core::ThresholdSpec::default(),
            },
        ] {
            let config = BackboningConfig::new(algorithm);
            group.bench_with_input(BenchmarkId::new(algorithm.name(), n), &graph, |b, g| {
                b.iter(|| black_box(run_backboning(g, &config).map(|(bb, _)| bb.edge_count())));
            });
        }
    }
    group.finish();
}

fn bench_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("backbone.chunked");
    let graph = random_graph(20_000, 16, 0xC4_0A);
    group.throughput(Throughput::Elements(graph.edge_count() as u64));

    let whole = BackboningConfig::default();
    let chunked = BackboningConfig::default().with_chunking(ChunkingConfig {
        edge_threshold: 1_000,
        max_workers: Some(4),
    });
    group.bench_function("whole", |b| b.iter(|| black_box(run_backboning(&graph, &whole).is_ok())));
    group.bench_function("chunked", |b| b.iter(|| black_box(run_backboning(&graph, &chunked).is_ok())));
    group.finish();
}

fn bench_search_and_validate(c: &mut Criterion) {
    let graph = random_graph(1_000, 1, 17);
    let (backbone, _) = run_backboning(&graph, &BackboningConfig::default()).expect("backbone");

    c.bench_function("backbone.search.target_0.5", |b| {
        b.iter(|| {
            black_box(
                search_for_target(&graph, &BackboningConfig::default(), TargetReduction::new(0.5))
                    .map(|r| r.outcome.iterations),
            )
        });
    });
    c.bench_function("backbone.validate", |b| b.iter(|| black_box(validate(&graph, &backbone).valid)));
}

criterion_group!(benches, bench_filters, bench_chunked, bench_search_and_validate);
criterion_main!(benches);
