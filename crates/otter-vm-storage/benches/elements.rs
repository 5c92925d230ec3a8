//! Element storage benchmarks
//!
//! Compares indexed access on dense and sparse element stores, and measures
//! the typed array sort paths.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use otter_vm_storage::{
    ArrayObject, IndexedProperties, JsTypedArray, ObjectHandle, StorageConfig, StorageResult,
    TransitionPolicy, TypedArrayKind, Value,
};
use std::hint::black_box;

fn filled(policy: TransitionPolicy, stride: u32, count: u32) -> ArrayObject {
    let mut array = ArrayObject::new(ObjectHandle(0), policy);
    for i in 0..count {
        let _ = array.set_own_indexed(i * stride, Value::int32(i as i32), true);
    }
    array
}

/// Benchmark: appending to dense vs. scattered writes that go sparse
fn bench_element_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("element_writes");
    for &count in &[100u32, 1000] {
        group.bench_with_input(BenchmarkId::new("dense_append", count), &count, |b, &count| {
            b.iter(|| black_box(filled(TransitionPolicy::default(), 1, count)));
        });
        group.bench_with_input(BenchmarkId::new("sparse_stride", count), &count, |b, &count| {
            b.iter(|| black_box(filled(TransitionPolicy::default(), 10_000, count)));
        });
    }
    group.finish();
}

/// Benchmark: reads from each representation
fn bench_element_reads(c: &mut Criterion) {
    let dense = filled(TransitionPolicy::default(), 1, 1000);
    let sparse = filled(TransitionPolicy::default(), 10_000, 1000);

    c.bench_function("dense_get_1000", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..1000 {
                sum += dense.get_indexed_value(i).map_or(0.0, |v| v.to_number());
            }
            black_box(sum)
        });
    });

    c.bench_function("sparse_get_1000", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..1000 {
                sum += sparse.get_indexed_value(i * 10_000).map_or(0.0, |v| v.to_number());
            }
            black_box(sum)
        });
    });
}

/// Benchmark: far define forcing dense -> sparse -> dense
fn bench_transition_round_trip(c: &mut Criterion) {
    c.bench_function("transition_round_trip_5000", |b| {
        b.iter(|| {
            let mut array = ArrayObject::new(ObjectHandle(0), TransitionPolicy::default());
            let _ = array.set_own_indexed(5000, Value::int32(1), true);
            for i in 0..5000 {
                let _ = array.set_own_indexed(i, Value::int32(i as i32), true);
            }
            black_box(array.elements().is_dense())
        });
    });
}

/// Benchmark: bit-pattern heapsort vs. comparator merge sort
fn bench_typed_array_sort(c: &mut Criterion) {
    let config = StorageConfig::default();
    let numbers: Vec<f64> = (0..10_000)
        .map(|i| ((i * 7919) % 10_007) as f64 - 5000.0)
        .collect();

    c.bench_function("float64_sort_default_10k", |b| {
        b.iter(|| {
            let arr = JsTypedArray::from_numbers(TypedArrayKind::Float64, &numbers, &config)
                .expect("allocation");
            arr.sort().expect("sort");
            black_box(arr)
        });
    });

    c.bench_function("float64_sort_comparator_10k", |b| {
        b.iter(|| {
            let arr = JsTypedArray::from_numbers(TypedArrayKind::Float64, &numbers, &config)
                .expect("allocation");
            arr.sort_by(|a: &Value, b: &Value| -> StorageResult<f64> {
                Ok(a.to_number() - b.to_number())
            })
            .expect("sort");
            black_box(arr)
        });
    });
}

criterion_group!(
    benches,
    bench_element_writes,
    bench_element_reads,
    bench_transition_round_trip,
    bench_typed_array_sort
);
criterion_main!(benches);
