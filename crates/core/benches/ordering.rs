// Benchmarks for sorting and grouping output objects

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use osmtile_core::ordering::{dedup_output_objects, mergeable_groups, resolve_all, sort_output_objects};
use osmtile_core::{AttributeSet, AttributeSetRef, EntityId, GeometryKind, MemoryAttributeStore, OutputObject};

fn objects(count: u64, store: &mut MemoryAttributeStore) -> Vec<OutputObject> {
    let sets: Vec<AttributeSetRef> = ["motorway", "primary", "secondary", "residential", "service", "track"]
        .iter()
        .map(|kind| store.insert(AttributeSet::new().with("highway", *kind).with("oneway", false)))
        .collect();

    (0..count)
        .map(|i| {
            OutputObject::new(
                GeometryKind::LineString,
                (i % 4) as u8,
                EntityId::Way((i * 2_654_435_761) % 1_000_000_007),
                sets[(i % sets.len() as u64) as usize],
            )
        })
        .collect()
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_output_objects");
    for count in [1_000u64, 100_000] {
        let mut store = MemoryAttributeStore::new();
        let objects = objects(count, &mut store);
        group.bench_with_input(BenchmarkId::from_parameter(count), &objects, |b, objects| {
            b.iter(|| {
                let mut refs = resolve_all(objects, &store);
                sort_output_objects(&mut refs);
                black_box(refs.len())
            })
        });
    }
    group.finish();
}

fn bench_dedup_and_group(c: &mut Criterion) {
    let mut store = MemoryAttributeStore::new();
    let objects = objects(50_000, &mut store);
    c.bench_function("dedup_and_group_50k", |b| {
        b.iter(|| {
            let mut refs = resolve_all(&objects, &store);
            dedup_output_objects(&mut refs);
            black_box(mergeable_groups(&refs).count())
        })
    });
}

criterion_group!(benches, bench_sort, bench_dedup_and_group);
criterion_main!(benches);
