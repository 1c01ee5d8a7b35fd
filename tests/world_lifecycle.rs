use archetype_ecs::engine::component::{ChildOf, Children};
use archetype_ecs::prelude::*;

#[derive(Clone, Default, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Clone, Default, Debug, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}
impl Component for Velocity {}

#[derive(Clone, Default)]
struct Frozen;
impl Component for Frozen {}

fn build_world() -> EcsResult<World> {
    let mut registry = ComponentRegistry::new();
    registry.register::<Position>()?;
    registry.register::<Velocity>()?;
    registry.register::<Frozen>()?;
    World::new(
        registry,
        WorldConfig { entity_capacity: 256, command_lanes: 2 },
    )
}

#[test]
fn end_to_end_lifecycle() -> EcsResult<()> {
    let mut manager = WorldManager::new(build_world()?);
    let (moving, positioned, e) = {
        let world = manager.world_mut();
        let moving = world.query().with::<Position>()?.with::<Velocity>()?.build()?;
        let positioned = world.query().with::<Position>()?.build()?;
        let e = world.create_entity()?;
        (moving, positioned, e)
    };

    {
        let world = manager.world_ref();
        world.defer_add(e, Position { x: 1.0, y: 2.0 })?;
        world.defer_add(e, Velocity { dx: 0.5, dy: 0.0 })?;
    }
    assert_eq!(manager.world_mut().pending_commands(), 2);
    manager.playback()?;

    let world = manager.world_mut();
    assert!(world.query_entities(moving)?.contains(&e));
    assert!(world.query_entities(positioned)?.contains(&e));
    assert_eq!(world.get::<Position>(e)?, &Position { x: 1.0, y: 2.0 });

    manager.world_ref().defer_remove::<Velocity>(e)?;
    manager.playback()?;

    let world = manager.world_mut();
    assert!(!world.query_entities(moving)?.contains(&e));
    assert!(world.query_entities(positioned)?.contains(&e));
    assert!(!world.has::<Velocity>(e)?);

    manager.world_ref().defer_destroy(e);
    manager.playback()?;

    let world = manager.world_mut();
    assert!(!world.is_alive(e));
    assert!(world.query_entities(positioned)?.is_empty());
    assert!(world.get::<Position>(e).is_err());

    // the slot is recycled with a bumped generation
    let recycled = world.create_entity()?;
    assert_eq!(recycled.index(), e.index());
    assert_eq!(recycled.version(), e.version() + 1);
    Ok(())
}

#[test]
fn archetypes_are_canonical_over_add_order() -> EcsResult<()> {
    let mut world = build_world()?;
    let a = world.create_entity()?;
    let b = world.create_entity()?;

    world.add_component(a, Position::default())?;
    world.add_component(a, Velocity::default())?;
    world.add_component(b, Velocity::default())?;
    world.add_component(b, Position::default())?;

    assert_eq!(world.archetype_of(a)?, world.archetype_of(b)?);
    // root, {Position}, {Velocity}, {Position, Velocity}
    assert_eq!(world.archetype_count(), 4);
    Ok(())
}

#[test]
fn add_remove_round_trip_restores_archetype_and_membership() -> EcsResult<()> {
    let mut world = build_world()?;
    let moving = world.query().with::<Position>()?.with::<Velocity>()?.build()?;

    let e = world.create_entity()?;
    world.add_component(e, Position::default())?;
    world.add_component(e, Velocity::default())?;
    let home = world.archetype_of(e)?;
    let nodes = world.archetype_count();

    for _ in 0..3 {
        world.remove_component::<Velocity>(e)?;
        assert!(!world.query_entities(moving)?.contains(&e));
        world.add_component(e, Velocity::default())?;
        assert_eq!(world.archetype_of(e)?, home);
        assert!(world.query_entities(moving)?.contains(&e));
    }
    // round trips ride cached edges; no new nodes appear
    assert_eq!(world.archetype_count(), nodes);
    Ok(())
}

#[test]
fn duplicate_add_and_absent_remove_are_no_ops() -> EcsResult<()> {
    let mut world = build_world()?;
    let e = world.create_entity()?;
    world.add_component(e, Position { x: 7.0, y: 7.0 })?;
    let home = world.archetype_of(e)?;

    world.add_component(e, Position { x: 0.0, y: 0.0 })?;
    assert_eq!(world.get::<Position>(e)?, &Position { x: 7.0, y: 7.0 });
    assert_eq!(world.archetype_of(e)?, home);

    world.remove_component::<Velocity>(e)?;
    assert_eq!(world.archetype_of(e)?, home);
    Ok(())
}

#[test]
fn late_query_sees_existing_entities() -> EcsResult<()> {
    let mut world = build_world()?;
    let a = world.create_entity()?;
    let b = world.create_entity()?;
    world.add_component(a, Position::default())?;
    world.add_component(b, Position::default())?;
    world.add_component(b, Frozen)?;

    let active = world.query().with::<Position>()?.none::<Frozen>()?.build()?;
    let members = world.query_entities(active)?;
    assert!(members.contains(&a));
    assert!(!members.contains(&b));

    // edges were invalidated; transitions still maintain the new query
    world.remove_component::<Frozen>(b)?;
    assert!(world.query_entities(active)?.contains(&b));
    Ok(())
}

#[test]
fn copy_duplicates_children_and_rehomes_child_of() -> EcsResult<()> {
    let mut world = build_world()?;
    let parent = world.create_entity()?;
    let child = world.create_entity()?;
    world.add_component(parent, Position { x: 1.0, y: 0.0 })?;
    world.add_component(parent, Children::default())?;
    world.add_component(child, Position { x: 2.0, y: 0.0 })?;
    world.add_component(child, ChildOf(parent))?;
    world.get_mut::<Children>(parent)?.push(child).unwrap();

    let clone = world.copy_entity(parent)?;
    assert_ne!(clone, parent);
    assert_eq!(world.get::<Position>(clone)?, &Position { x: 1.0, y: 0.0 });

    let cloned_children = world.get::<Children>(clone)?;
    assert_eq!(cloned_children.len(), 1);
    let child_clone = *cloned_children.get(0).unwrap();
    assert_ne!(child_clone, child);

    assert_eq!(world.get::<ChildOf>(child_clone)?, &ChildOf(clone));
    assert_eq!(world.get::<ChildOf>(child)?, &ChildOf(parent));
    assert_eq!(world.get::<Position>(child_clone)?, &Position { x: 2.0, y: 0.0 });
    Ok(())
}

#[test]
fn cyclic_child_graphs_terminate() -> EcsResult<()> {
    let mut world = build_world()?;

    // self cycle
    let solo = world.create_entity()?;
    world.add_component(solo, Children::default())?;
    world.get_mut::<Children>(solo)?.push(solo).unwrap();
    let solo_clone = world.copy_entity(solo)?;
    assert!(world.get::<Children>(solo_clone)?.is_empty());

    // mutual cycle
    let a = world.create_entity()?;
    let b = world.create_entity()?;
    world.add_component(a, Children::default())?;
    world.add_component(b, Children::default())?;
    world.get_mut::<Children>(a)?.push(b).unwrap();
    world.get_mut::<Children>(b)?.push(a).unwrap();

    let a_clone = world.copy_entity(a)?;
    let a_children = world.get::<Children>(a_clone)?;
    assert_eq!(a_children.len(), 1);
    let b_clone = *a_children.get(0).unwrap();
    // the back edge to `a` is truncated at the cycle guard
    assert!(world.get::<Children>(b_clone)?.is_empty());
    Ok(())
}

#[test]
fn world_capacity_is_a_checked_error() -> EcsResult<()> {
    let mut registry = ComponentRegistry::new();
    registry.register::<Position>()?;
    let mut world = World::new(
        registry,
        WorldConfig { entity_capacity: 2, command_lanes: 1 },
    )?;
    world.create_entity()?;
    let keep = world.create_entity()?;
    assert!(matches!(world.create_entity(), Err(EcsError::Capacity(_))));
    world.destroy_entity(keep)?;
    assert!(world.create_entity().is_ok());
    Ok(())
}
