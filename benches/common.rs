#![allow(dead_code)]

use archetype_ecs::prelude::*;

pub const AGENTS_SMALL: usize = 10_000;
pub const AGENTS_MED: usize = 100_000;

#[derive(Clone, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}
impl Component for Position {}

#[derive(Clone, Default)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}
impl Component for Velocity {}

pub fn registry() -> EcsResult<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    registry.register::<Position>()?;
    registry.register::<Velocity>()?;
    Ok(registry)
}

/// A world holding `count` moving entities, structure already settled.
pub fn setup_world(count: usize) -> EcsResult<World> {
    let mut world = World::new(
        registry()?,
        WorldConfig { entity_capacity: count, ..WorldConfig::default() },
    )?;
    for i in 0..count {
        let e = world.create_entity()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
        world.add_component(e, Velocity { dx: 1.0, dy: 0.5 })?;
    }
    Ok(world)
}
