//! Benchmarks for ghost-row gather and scatter
//!
//! A single rank exchanging with itself isolates the cost of staging rows
//! in the exchange buffers from the cost of moving them between ranks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use partensor_dist::{
    ExchangeBuffers, ExchangeConfig, LocalCluster, LocalComm, ModeLayout, PartitionDescriptor,
    RowExchange, RowManifest,
};
use scirs2_core::ndarray_ext::Array2;
use std::hint::black_box;

const NFACTORS: usize = 16;

/// One rank owning `nowned` rows, half of which it also caches as ghosts
fn self_partition(nowned: usize) -> PartitionDescriptor<LocalComm> {
    let send: Vec<usize> = (0..nowned).step_by(2).collect();
    let recv: Vec<usize> = (0..send.len()).map(|k| nowned + k).collect();
    let layout = ModeLayout {
        mat_start: 0,
        mat_end: nowned,
        own_start: 0,
        nowned,
        send: RowManifest::from_neighbor_lists(vec![send]),
        recv: RowManifest::from_neighbor_lists(vec![recv]),
    };
    let layer = LocalCluster::new(1).into_comms().remove(0);
    let grid = LocalCluster::new(1).into_comms().remove(0);
    PartitionDescriptor::new(vec![layout], vec![layer], grid).expect("valid layout")
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_rows");

    for &nowned in &[1_000, 50_000] {
        let part = self_partition(nowned);
        let nlocal = nowned + part.mode(0).expect("mode 0").recv.total();
        let global = Array2::from_shape_fn((nowned, NFACTORS), |(i, j)| (i + j) as f64);
        let mut local = Array2::<f64>::zeros((nlocal, NFACTORS));
        let mut bufs = ExchangeBuffers::for_partition(&part, NFACTORS);

        group.throughput(Throughput::Elements(nlocal as u64));
        for (label, min_rows) in [("sequential", usize::MAX), ("parallel", 0)] {
            let ex = RowExchange::new(&part).with_config(
                ExchangeConfig::default()
                    .with_check_manifests(false)
                    .with_parallel_min_rows(min_rows),
            );
            group.bench_with_input(BenchmarkId::new(label, nowned), &global, |b, global| {
                b.iter(|| {
                    ex.update_rows(0, &mut bufs, &mut local, global)
                        .expect("self update");
                    black_box(&local);
                });
            });
        }
    }

    group.finish();
}

fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_rows");

    for &nowned in &[1_000, 50_000] {
        let part = self_partition(nowned);
        let nlocal = nowned + part.mode(0).expect("mode 0").recv.total();
        let local = Array2::from_elem((nlocal, NFACTORS), 1.0);
        let mut global = Array2::<f64>::zeros((nowned, NFACTORS));
        let mut bufs = ExchangeBuffers::for_partition(&part, NFACTORS);
        let ex = RowExchange::new(&part);

        group.throughput(Throughput::Elements(nlocal as u64));
        group.bench_function(BenchmarkId::from_parameter(nowned), |b| {
            b.iter(|| {
                ex.add_my_partials(0, None, &local, &mut global)
                    .expect("owned copy");
                ex.reduce_rows(0, &mut bufs, &local, &mut global)
                    .expect("self reduce");
                black_box(&global);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_update, bench_reduce);
criterion_main!(benches);
