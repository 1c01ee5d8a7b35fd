use criterion::*;

use archetype_ecs::prelude::*;

mod common;
use common::{Position, Velocity, AGENTS_SMALL};

fn spawn_and_playback(count: usize) -> EcsResult<usize> {
    let mut manager = WorldManager::new(World::new(
        common::registry()?,
        WorldConfig { entity_capacity: count, ..WorldConfig::default() },
    )?);

    for _ in 0..count {
        let e = manager.world_mut().create_entity()?;
        let world = manager.world_ref();
        world.defer_add(e, Position { x: 0.0, y: 0.0 })?;
        world.defer_add(e, Velocity { dx: 1.0, dy: 0.0 })?;
    }
    manager.playback()?;
    Ok(manager.world_mut().live_count())
}

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");
    group.throughput(Throughput::Elements(AGENTS_SMALL as u64));

    group.bench_function("spawn_playback_10k", |b| {
        b.iter(|| {
            let live = spawn_and_playback(AGENTS_SMALL).expect("spawn failed in benchmark");
            std::hint::black_box(live)
        })
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
