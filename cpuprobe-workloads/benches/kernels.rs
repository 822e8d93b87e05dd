// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Criterion cross-check of the stock workload kernels.
//!
//! Runs the same kernels the harness measures so results from both tools can
//! be compared side by side.

use cpuprobe_workloads::branch::{count_hinted, count_nohint};
use cpuprobe_workloads::input;
use cpuprobe_workloads::stride::{stride_sum, STRIDES};
use cpuprobe_workloads::vector::vector_add;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

/// Elements per input buffer.
const ELEMENTS: usize = 1_000_000;

/// Benchmark sequential and strided sums.
fn bench_stride_sum(c: &mut Criterion) {
    let data = input::iota(ELEMENTS).expect("Failed to allocate input");
    let mut group = c.benchmark_group("stride_sum");
    group.measurement_time(Duration::from_secs(3));

    for stride in std::iter::once(1).chain(STRIDES) {
        group.throughput(Throughput::Bytes((ELEMENTS / stride * 8) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(stride), &stride, |b, &stride| {
            b.iter(|| black_box(stride_sum(black_box(&data), stride)));
        });
    }

    group.finish();
}

/// Benchmark element-wise vector addition.
fn bench_vector_add(c: &mut Criterion) {
    let a = input::iota(ELEMENTS).expect("Failed to allocate input");
    let b = input::iota(ELEMENTS).expect("Failed to allocate input");
    let mut out = input::zeroed(ELEMENTS).expect("Failed to allocate output");

    let mut group = c.benchmark_group("vector_add");
    group.throughput(Throughput::Bytes((ELEMENTS * 3 * 8) as u64));
    group.bench_function("vector_add", |bench| {
        bench.iter(|| {
            vector_add(black_box(&a), black_box(&b), &mut out);
            black_box(&out);
        });
    });
    group.finish();
}

/// Benchmark branch counting on sorted and shuffled inputs.
fn bench_branches(c: &mut Criterion) {
    let sorted = input::skewed(ELEMENTS).expect("Failed to allocate input");
    let shuffled = input::shuffled(ELEMENTS, input::DEFAULT_SEED).expect("Failed to allocate input");

    let mut group = c.benchmark_group("branch");
    group.throughput(Throughput::Elements(ELEMENTS as u64));
    group.bench_function("nohint", |b| b.iter(|| black_box(count_nohint(black_box(&sorted)))));
    group.bench_function("hinted", |b| b.iter(|| black_box(count_hinted(black_box(&sorted)))));
    group.bench_function("shuffled", |b| {
        b.iter(|| black_box(count_nohint(black_box(&shuffled))))
    });
    group.finish();
}

criterion_group!(benches, bench_stride_sum, bench_vector_add, bench_branches);

criterion_main!(benches);
