use criterion::*;

use archetype_ecs::prelude::*;

mod common;
use common::{Position, Velocity, AGENTS_MED};

fn iterate_benchmark(c: &mut Criterion) {
    let mut world = common::setup_world(AGENTS_MED).expect("world setup failed");
    let moving = world
        .query()
        .with::<Position>()
        .and_then(|q| q.with::<Velocity>())
        .and_then(|q| q.build())
        .expect("query build failed");

    let mut group = c.benchmark_group("iterate");
    group.throughput(Throughput::Elements(AGENTS_MED as u64));

    group.bench_function("sequential_write", |b| {
        b.iter(|| {
            world
                .for_each_write1(moving, |_, position: &mut Position| {
                    position.x += 1.0;
                    position.y += 0.5;
                })
                .expect("iteration failed");
        })
    });

    group.bench_function("parallel_read_write", |b| {
        b.iter(|| {
            world
                .par_for_each_read1_write1(
                    moving,
                    |_, velocity: &Velocity, position: &mut Position| {
                        position.x += velocity.dx;
                        position.y += velocity.dy;
                    },
                )
                .expect("iteration failed");
        })
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
