#[macro_use]
extern crate criterion;

use criterion::Criterion;

use minnespool_core::{PlacementPolicy, Pool};

fn bench_allocate_release_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_churn");

    for policy in [PlacementPolicy::FirstFit, PlacementPolicy::BestFit] {
        group.bench_function(policy.to_string(), |b| {
            b.iter(|| {
                let mut pool = Pool::open(1 << 20, policy).unwrap();
                let mut handles = Vec::with_capacity(192);
                for i in 0..128usize {
                    handles.push(pool.allocate(512 + (i % 7) * 128).unwrap());
                }
                // free every other span, then refill the gaps
                for handle in handles.iter().step_by(2) {
                    pool.release(*handle).unwrap();
                }
                for _ in 0..64 {
                    handles.push(pool.allocate(256).unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_allocate_release_churn);
criterion_main!(benches);
