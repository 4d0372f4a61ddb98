//! # Model Benchmarks
//!
//! Performance benchmarks for stack queries, cloning, repair and archives.
//!
//! Run with: `cargo bench -p lithos-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lithos_core::{
    ArchiveConfig, ArchiveFormat, CloneEngine, ComponentId, ComponentType, HorizonsStack,
    IdentityPolicy, Model, NativeFormat, RelationshipsBuilder,
};
use std::hint::black_box;
use uuid::Uuid;

/// A column of `units` units between `units + 1` horizons, bottom first.
fn create_column(units: usize) -> (HorizonsStack, Vec<Uuid>) {
    let mut stack = HorizonsStack::named("bench");
    let mut builder = stack.builder();
    let horizons: Vec<Uuid> = (0..=units).map(|_| builder.add_horizon().expect("h")).collect();
    for i in 0..units {
        let unit = builder.add_stratigraphic_unit().expect("u");
        builder.set_horizon_under(&horizons[i], &unit).expect("under");
        builder.set_horizon_above(&horizons[i + 1], &unit).expect("above");
    }
    (stack, horizons)
}

fn horizon(id: Uuid) -> ComponentId {
    ComponentId::new(ComponentType::Horizon, id)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_build_column(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_column");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_column(size)));
        });
    }

    group.finish();
}

fn bench_is_above(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_above");

    for size in [10, 100, 1000].iter() {
        let (stack, horizons) = create_column(*size);
        let bottom = horizon(horizons[0]);
        let top = horizon(horizons[*size]);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(stack.ordering().is_above(&bottom, &top)));
        });
    }

    group.finish();
}

fn bench_stack_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_order");

    for size in [10, 100, 1000].iter() {
        let (stack, _) = create_column(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(stack.stack_order()));
        });
    }

    group.finish();
}

fn bench_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("clone_instance");
    let engine = CloneEngine::uniform(IdentityPolicy::Instance);

    for size in [10, 100, 1000].iter() {
        let (stack, _) = create_column(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(engine.clone_model(&stack)));
        });
    }

    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("repair_missing_mirrors");

    for size in [10, 100, 1000].iter() {
        let (stack, _) = create_column(*size);
        // Keep only the Above half of every relation.
        let mut broken = stack.relationships().clone();
        let unders: Vec<_> = broken
            .edges()
            .filter(|e| e.kind == lithos_core::EdgeKind::Under)
            .collect();
        for edge in unders {
            RelationshipsBuilder::new(&mut broken)
                .remove_edge(&edge.from, &edge.to, edge.kind)
                .expect("remove");
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut graph = broken.clone();
                let inserted = RelationshipsBuilder::new(&mut graph)
                    .ordering()
                    .repair_if_possible();
                black_box(inserted)
            });
        });
    }

    group.finish();
}

fn bench_archive_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_round_trip");
    group.sample_size(20);
    let dir = tempfile::tempdir().expect("tempdir");

    for (label, parallel_write) in [("parallel", true), ("sequential", false)] {
        let format = NativeFormat::<HorizonsStack>::new(
            "lt_hst",
            ArchiveConfig {
                parallel_write,
                ..ArchiveConfig::default()
            },
        );
        for size in [100, 1000].iter() {
            let (stack, _) = create_column(*size);
            let path = dir.path().join(format!("{label}_{size}.lt_hst"));

            group.bench_with_input(BenchmarkId::new(label, size), size, |b, _| {
                b.iter(|| {
                    format.write(&stack, &path).expect("write");
                    black_box(format.read(&path).expect("read"))
                });
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build_column,
    bench_is_above,
    bench_stack_order,
    bench_clone,
    bench_repair,
    bench_archive_round_trip,
);

criterion_main!(benches);
