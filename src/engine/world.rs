//! World: Storage Façade, Transitions, Playback, and Parallel Access
//!
//! ## Role
//!
//! [`World`] owns every storage structure of the engine and is the only type
//! that composes them:
//!
//! - the frozen [`ComponentRegistry`] and one pool per registered type,
//! - the [`EntityTable`] (ids, generations, archetype pointers),
//! - the archetype graph with its cached transition edges,
//! - the registered [`QueryState`]s,
//! - the per-lane [`CommandBuffer`].
//!
//! Structural operations here drive the transition protocol: look up the
//! cached edge for the component being added or removed, on a miss resolve
//! or create the target archetype and memoize the query delta, then apply
//! the delta and repoint the entity. Component pools are world-global and
//! indexed by entity slot, so **no component data moves** on a transition.
//!
//! ## Concurrency model
//!
//! The world is internally mutable behind [`WorldManager`], an `UnsafeCell`
//! wrapper shared across worker threads. Safety comes from API phase
//! discipline, not the borrow checker:
//!
//! - during a stage, systems only *read* storage and *record* structural
//!   intent into the command buffer (their own lane, no contention),
//! - structural mutation happens exclusively in [`World::playback`], which
//!   the schedule runs single-threaded between stages,
//! - parallel iteration writes disjoint pool rows (one row per entity, one
//!   entity per query), packaged behind raw column pointers.
//!
//! Violating the phase discipline (mutating structure from inside a stage,
//! or overlapping read and write columns of one component) is undefined
//! behavior; the scheduler upholds it for all schedule-driven code.

use std::any::Any;
use std::cell::UnsafeCell;
use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::engine::archetype::{archetype_hash, edge_key, Archetype, Edge};
use crate::engine::bitmask::Bitmask;
use crate::engine::commands::{Command, CommandBuffer};
use crate::engine::component::{ChildOf, Children, Component, ComponentRegistry};
use crate::engine::entity::EntityTable;
use crate::engine::error::{EcsError, EcsResult, MissingComponentError};
use crate::engine::pool::{Pool, TypeErasedPool};
use crate::engine::query::{QueryBuilder, QueryState};
use crate::engine::types::{ArchetypeId, ComponentId, Entity, QueryId};

/// The root archetype (empty signature) is always node zero.
const ROOT: ArchetypeId = 0;

/// Chunk size for parallel iteration over a query's member list.
const PAR_CHUNK: usize = 1024;


/// Construction parameters for a [`World`].
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Hard ceiling on live entities; sizes every pool.
    pub entity_capacity: usize,
    /// Worker lanes in the command buffer (an overflow lane is always
    /// added).
    pub command_lanes: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 4096,
            command_lanes: rayon::current_num_threads(),
        }
    }
}

/// Raw pointer to a pool column, shippable to rayon tasks.
///
/// Tasks touch disjoint rows (one row per entity, one entity per query), so
/// sharing the base pointer is sound.
struct ColumnPtr<T>(*mut T);

unsafe impl<T: Send> Send for ColumnPtr<T> {}
unsafe impl<T: Sync> Sync for ColumnPtr<T> {}

/// The storage engine: entities, pools, archetype graph, queries, commands.
pub struct World {
    registry: ComponentRegistry,
    entities: EntityTable,
    pools: Vec<Box<dyn TypeErasedPool>>,
    archetypes: Vec<Archetype>,
    archetype_index: HashMap<u64, ArchetypeId>,
    queries: Vec<QueryState>,
    commands: CommandBuffer,
    child_of_id: ComponentId,
    children_id: ComponentId,
}

impl World {
    /// Builds a world from a registry, freezing it.
    ///
    /// The hierarchy components ([`ChildOf`], [`Children`]) are registered
    /// automatically. One pool per registered type is allocated up front at
    /// `entity_capacity` rows, and the root archetype is created.
    pub fn new(mut registry: ComponentRegistry, config: WorldConfig) -> EcsResult<World> {
        let child_of_id = registry.register::<ChildOf>()?;
        let children_id = registry.register::<Children>()?;
        registry.freeze();

        let pools = registry.build_pools(config.entity_capacity);
        let root = Archetype::new(ROOT, Vec::new(), registry.len());
        let mut archetype_index = HashMap::new();
        archetype_index.insert(root.hash, ROOT);

        tracing::debug!(
            components = registry.len(),
            capacity = config.entity_capacity,
            "world created"
        );

        Ok(World {
            registry,
            entities: EntityTable::new(config.entity_capacity),
            pools,
            archetypes: vec![root],
            archetype_index,
            queries: Vec::new(),
            commands: CommandBuffer::new(config.command_lanes),
            child_of_id,
            children_id,
        })
    }

    /// The frozen component registry.
    #[inline]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Number of live entities.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.entities.live_count()
    }

    /// Returns `true` for a currently-valid handle.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Current archetype node of a live entity.
    #[inline]
    pub fn archetype_of(&self, entity: Entity) -> EcsResult<ArchetypeId> {
        Ok(self.entities.archetype_of(entity)?)
    }

    /// Number of archetype nodes, the root included. Nodes are never
    /// collected, so this only grows.
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    // ---- entity lifecycle -------------------------------------------------

    /// Allocates an entity in the root archetype.
    ///
    /// # Errors
    /// [`EcsError::Capacity`] when the world is full.
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        let entity = self.entities.allocate(ROOT)?;
        for &q in &self.archetypes[ROOT as usize].matched_queries {
            self.queries[q as usize].insert(entity);
        }
        Ok(entity)
    }

    /// Destroys an entity: resets its pool rows, removes it from every
    /// matched query, and recycles the id with a bumped generation.
    ///
    /// # Errors
    /// [`EcsError::StaleEntity`] for dead or outdated handles.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        let slot = self.entities.check(entity)? as usize;
        let arch = self.entities.archetype_of(entity)?;
        let component_ids = self.archetypes[arch as usize].component_ids.clone();
        for &cid in &component_ids {
            self.pools[cid as usize].remove(slot);
        }
        let matched = self.archetypes[arch as usize].matched_queries.clone();
        for &q in &matched {
            self.queries[q as usize].remove(entity);
        }
        self.entities.free(entity)?;
        Ok(())
    }

    /// Duplicates an entity within its archetype, cloning every component
    /// row and joining every matched query.
    ///
    /// Entities listed in the source's [`Children`] are duplicated
    /// recursively and each clone's [`ChildOf`] is re-homed to its new
    /// parent. A visited set truncates self-referential child graphs
    /// instead of recursing forever.
    pub fn copy_entity(&mut self, source: Entity) -> EcsResult<Entity> {
        let mut visited = HashSet::new();
        match self.copy_subtree(source, None, &mut visited)? {
            Some(clone) => Ok(clone),
            // first visit always inserts; only reachable through a stale root
            None => Err(EcsError::StaleEntity),
        }
    }

    fn copy_subtree(
        &mut self,
        source: Entity,
        new_parent: Option<Entity>,
        visited: &mut HashSet<Entity>,
    ) -> EcsResult<Option<Entity>> {
        if !visited.insert(source) {
            tracing::warn!(entity = source.0, "cycle in child graph, truncating duplication");
            return Ok(None);
        }
        let src_slot = self.entities.check(source)? as usize;
        let arch = self.entities.archetype_of(source)?;
        let clone = self.entities.allocate(arch)?;
        let dst_slot = clone.index() as usize;

        let component_ids = self.archetypes[arch as usize].component_ids.clone();
        for &cid in &component_ids {
            self.pools[cid as usize].copy_row(src_slot, dst_slot)?;
        }
        let matched = self.archetypes[arch as usize].matched_queries.clone();
        for &q in &matched {
            self.queries[q as usize].insert(clone);
        }

        if let Some(parent) = new_parent {
            if component_ids.binary_search(&self.child_of_id).is_ok() {
                let pool = self.pool_mut::<ChildOf>(self.child_of_id)?;
                if let Some(row) = pool.get_mut(dst_slot) {
                    *row = ChildOf(parent);
                }
            }
        }

        if component_ids.binary_search(&self.children_id).is_ok() {
            let child_list: Vec<Entity> = self
                .pool_ref::<Children>(self.children_id)?
                .get(src_slot)
                .map(|list| list.iter().copied().collect())
                .unwrap_or_default();
            let mut new_children = Children::default();
            for child in child_list {
                if !self.entities.is_alive(child) {
                    continue;
                }
                if let Some(child_clone) = self.copy_subtree(child, Some(clone), visited)? {
                    // clone's list can only shrink relative to the source's
                    let _ = new_children.push(child_clone);
                }
            }
            let pool = self.pool_mut::<Children>(self.children_id)?;
            if let Some(row) = pool.get_mut(dst_slot) {
                *row = new_children;
            }
        }

        Ok(Some(clone))
    }

    // ---- structural operations --------------------------------------------

    /// Attaches a component value to an entity, transitioning its
    /// archetype.
    ///
    /// Adding a component the entity already has is a no-op; a disposable
    /// value is disposed before being dropped.
    pub fn add_component<T: Component>(&mut self, entity: Entity, mut value: T) -> EcsResult<()> {
        let cid = self.registry.id_of::<T>()?;
        let slot = self.entities.check(entity)? as usize;
        let arch = self.entities.archetype_of(entity)?;
        if self.archetypes[arch as usize].contains(cid) {
            tracing::warn!(entity = entity.0, component = cid, "duplicate add ignored");
            if T::DISPOSABLE {
                value.dispose();
            }
            return Ok(());
        }
        self.pool_mut::<T>(cid)?.set(slot, value)?;
        self.transition(entity, cid, true)
    }

    /// Type-erased variant of [`World::add_component`], for playback and
    /// inspector tooling.
    pub fn add_component_dyn(
        &mut self,
        entity: Entity,
        component_id: ComponentId,
        value: Box<dyn Any + Send>,
    ) -> EcsResult<()> {
        self.registry.info(component_id)?;
        let slot = self.entities.check(entity)? as usize;
        let arch = self.entities.archetype_of(entity)?;
        if self.archetypes[arch as usize].contains(component_id) {
            tracing::warn!(entity = entity.0, component = component_id, "duplicate add ignored");
            self.pools[component_id as usize].dispose_boxed(value);
            return Ok(());
        }
        self.pools[component_id as usize].set_object(slot, value)?;
        self.transition(entity, component_id, true)
    }

    /// Attaches a component without writing a value; the row keeps its
    /// default image. This is the tag path. No-op when already present.
    pub fn add_no_data(&mut self, entity: Entity, component_id: ComponentId) -> EcsResult<()> {
        self.registry.info(component_id)?;
        let arch = self.entities.archetype_of(entity)?;
        if self.archetypes[arch as usize].contains(component_id) {
            return Ok(());
        }
        self.transition(entity, component_id, true)
    }

    /// Detaches component `T` from an entity. No-op when absent.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> EcsResult<()> {
        let cid = self.registry.id_of::<T>()?;
        self.remove_component_id(entity, cid)
    }

    /// Detaches a component by id. No-op when absent.
    pub fn remove_component_id(
        &mut self,
        entity: Entity,
        component_id: ComponentId,
    ) -> EcsResult<()> {
        self.registry.info(component_id)?;
        let slot = self.entities.check(entity)? as usize;
        let arch = self.entities.archetype_of(entity)?;
        if !self.archetypes[arch as usize].contains(component_id) {
            return Ok(());
        }
        self.pools[component_id as usize].remove(slot);
        self.transition(entity, component_id, false)
    }

    /// Applies one structural step: cached edge lookup, miss resolution,
    /// query delta, archetype repoint. No component data moves.
    fn transition(&mut self, entity: Entity, component_id: ComponentId, add: bool) -> EcsResult<()> {
        let current = self.entities.archetype_of(entity)?;
        let key = edge_key(component_id, add);

        let cached = self.archetypes[current as usize].edges.get(&key).cloned();
        let edge = match cached {
            Some(edge) => edge,
            None => {
                let ids = {
                    let node = &self.archetypes[current as usize];
                    if add {
                        node.ids_with(component_id)
                    } else {
                        node.ids_without(component_id)
                    }
                };
                let target = self.get_or_create_archetype(ids)?;
                let edge = {
                    let from = &self.archetypes[current as usize].matched_queries;
                    let to = &self.archetypes[target as usize].matched_queries;
                    Edge {
                        target,
                        queries_to_add: to.iter().copied().filter(|q| !from.contains(q)).collect(),
                        queries_to_remove: from
                            .iter()
                            .copied()
                            .filter(|q| !to.contains(q))
                            .collect(),
                    }
                };
                self.archetypes[current as usize].edges.insert(key, edge.clone());
                edge
            }
        };

        for &q in &edge.queries_to_remove {
            self.queries[q as usize].remove(entity);
        }
        for &q in &edge.queries_to_add {
            self.queries[q as usize].insert(entity);
        }
        self.entities.set_archetype(entity, edge.target)?;
        Ok(())
    }

    /// Resolves a sorted id list to its archetype node, creating the node
    /// on first sight. New nodes are matched against every registered query
    /// exactly once.
    fn get_or_create_archetype(&mut self, sorted_ids: Vec<ComponentId>) -> EcsResult<ArchetypeId> {
        let hash = archetype_hash(&sorted_ids);
        if let Some(&id) = self.archetype_index.get(&hash) {
            if self.archetypes[id as usize].component_ids != sorted_ids {
                return Err(EcsError::Internal(format!(
                    "archetype hash collision on {hash:#018x}"
                )));
            }
            return Ok(id);
        }

        let id = self.archetypes.len() as ArchetypeId;
        let mut node = Archetype::new(id, sorted_ids, self.registry.len());
        for (qid, query) in self.queries.iter().enumerate() {
            if query.matches(&node.signature) {
                node.matched_queries.push(qid as QueryId);
            }
        }
        tracing::debug!(
            archetype = id,
            components = node.component_ids.len(),
            matched = node.matched_queries.len(),
            "created archetype node"
        );
        self.archetype_index.insert(hash, id);
        self.archetypes.push(node);
        Ok(id)
    }

    // ---- typed and reflected access ---------------------------------------

    /// Returns `true` when the entity currently has component `T`.
    pub fn has<T: Component>(&self, entity: Entity) -> EcsResult<bool> {
        let cid = self.registry.id_of::<T>()?;
        let arch = self.entities.archetype_of(entity)?;
        Ok(self.archetypes[arch as usize].contains(cid))
    }

    /// Shared access to an entity's component.
    ///
    /// # Errors
    /// Stale handles, unregistered types, and absent components are all
    /// reported.
    pub fn get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        let cid = self.registry.id_of::<T>()?;
        let slot = self.entities.check(entity)? as usize;
        let arch = self.entities.archetype_of(entity)?;
        if !self.archetypes[arch as usize].contains(cid) {
            return Err(self.missing(cid));
        }
        self.pool_ref::<T>(cid)?
            .get(slot)
            .ok_or_else(|| EcsError::Internal(format!("pool row {slot} out of bounds")))
    }

    /// Exclusive access to an entity's component.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        let cid = self.registry.id_of::<T>()?;
        let slot = self.entities.check(entity)? as usize;
        let arch = self.entities.archetype_of(entity)?;
        if !self.archetypes[arch as usize].contains(cid) {
            return Err(self.missing(cid));
        }
        self.pool_mut::<T>(cid)?
            .get_mut(slot)
            .ok_or_else(|| EcsError::Internal(format!("pool row {slot} out of bounds")))
    }

    /// Clones a component out as a boxed value, for inspector tooling.
    pub fn get_object(
        &self,
        entity: Entity,
        component_id: ComponentId,
    ) -> EcsResult<Box<dyn Any + Send>> {
        self.registry.info(component_id)?;
        let slot = self.entities.check(entity)? as usize;
        let arch = self.entities.archetype_of(entity)?;
        if !self.archetypes[arch as usize].contains(component_id) {
            return Err(self.missing(component_id));
        }
        self.pools[component_id as usize]
            .get_object(slot)
            .ok_or_else(|| EcsError::Internal(format!("pool row {slot} out of bounds")))
    }

    /// Overwrites a *present* component from a boxed value after a dynamic
    /// type check. Attaching a new component goes through the command
    /// buffer instead.
    pub fn set_object(
        &mut self,
        entity: Entity,
        component_id: ComponentId,
        value: Box<dyn Any + Send>,
    ) -> EcsResult<()> {
        self.registry.info(component_id)?;
        let slot = self.entities.check(entity)? as usize;
        let arch = self.entities.archetype_of(entity)?;
        if !self.archetypes[arch as usize].contains(component_id) {
            return Err(self.missing(component_id));
        }
        self.pools[component_id as usize].set_object(slot, value)
    }

    fn missing(&self, component_id: ComponentId) -> EcsError {
        let name = self
            .registry
            .info(component_id)
            .map(|info| info.name)
            .unwrap_or("<unknown>");
        EcsError::MissingComponent(MissingComponentError { component_id, name })
    }

    fn pool_ref<T: Component>(&self, component_id: ComponentId) -> EcsResult<&Pool<T>> {
        self.pools
            .get(component_id as usize)
            .and_then(|p| p.as_any().downcast_ref::<Pool<T>>())
            .ok_or_else(|| {
                EcsError::Internal(format!("pool type mismatch for component {component_id}"))
            })
    }

    fn pool_mut<T: Component>(&mut self, component_id: ComponentId) -> EcsResult<&mut Pool<T>> {
        self.pools
            .get_mut(component_id as usize)
            .and_then(|p| p.as_any_mut().downcast_mut::<Pool<T>>())
            .ok_or_else(|| {
                EcsError::Internal(format!("pool type mismatch for component {component_id}"))
            })
    }

    // ---- queries ----------------------------------------------------------

    /// Begins construction of a registered query.
    pub fn query(&mut self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    /// Registers a query, matching existing archetypes and populating the
    /// member set from live entities.
    ///
    /// Every cached edge is invalidated: deltas computed before this query
    /// existed would omit it.
    pub(crate) fn register_query(&mut self, with: Bitmask, none: Bitmask) -> EcsResult<QueryId> {
        let id = self.queries.len() as QueryId;
        let mut state = QueryState::new(with, none);

        let mut matched: HashSet<ArchetypeId> = HashSet::new();
        for node in &mut self.archetypes {
            node.invalidate_edges();
            if state.matches(&node.signature) {
                node.matched_queries.push(id);
                matched.insert(node.id);
            }
        }
        for (entity, arch) in self.entities.iter_live() {
            if matched.contains(&arch) {
                state.insert(entity);
            }
        }

        tracing::debug!(query = id, archetypes = matched.len(), "registered query");
        self.queries.push(state);
        Ok(id)
    }

    pub(crate) fn query_state(&self, id: QueryId) -> EcsResult<&QueryState> {
        self.queries
            .get(id as usize)
            .ok_or(EcsError::UnknownQuery(id))
    }

    /// Current members of a query. Order is unspecified; the slice is a
    /// snapshot only for as long as no structural operation runs.
    pub fn query_entities(&self, id: QueryId) -> EcsResult<&[Entity]> {
        Ok(self.query_state(id)?.entities())
    }

    fn require_query_component(&self, query: QueryId, component_id: ComponentId) -> EcsResult<()> {
        let state = self.query_state(query)?;
        if state.with.has(component_id as usize)? {
            Ok(())
        } else {
            Err(self.missing(component_id))
        }
    }

    // ---- iteration --------------------------------------------------------

    /// Runs `f` over every member with shared access to its `T` row.
    ///
    /// The member list is snapshotted before iteration. `T` must be in the
    /// query's `with` set.
    pub fn for_each_read1<T: Component>(
        &self,
        query: QueryId,
        mut f: impl FnMut(Entity, &T),
    ) -> EcsResult<()> {
        let cid = self.registry.id_of::<T>()?;
        self.require_query_component(query, cid)?;
        let members = self.query_state(query)?.entities().to_vec();
        let pool = self.pool_ref::<T>(cid)?;
        for entity in members {
            if let Some(row) = pool.get(entity.index() as usize) {
                f(entity, row);
            }
        }
        Ok(())
    }

    /// Runs `f` over every member with exclusive access to its `T` row.
    pub fn for_each_write1<T: Component>(
        &mut self,
        query: QueryId,
        mut f: impl FnMut(Entity, &mut T),
    ) -> EcsResult<()> {
        let cid = self.registry.id_of::<T>()?;
        self.require_query_component(query, cid)?;
        let members = self.query_state(query)?.entities().to_vec();
        let pool = self.pool_mut::<T>(cid)?;
        for entity in members {
            if let Some(row) = pool.get_mut(entity.index() as usize) {
                f(entity, row);
            }
        }
        Ok(())
    }

    /// Parallel variant of [`World::for_each_write1`].
    ///
    /// The member list is chunked across rayon tasks. Each entity appears in
    /// a query exactly once, so tasks write disjoint rows of the column.
    pub fn par_for_each_write1<T: Component>(
        &mut self,
        query: QueryId,
        f: impl Fn(Entity, &mut T) + Send + Sync,
    ) -> EcsResult<()> {
        let cid = self.registry.id_of::<T>()?;
        self.require_query_component(query, cid)?;
        let members = self.query_state(query)?.entities().to_vec();
        let column = ColumnPtr(self.pool_mut::<T>(cid)?.base_ptr());

        members.par_chunks(PAR_CHUNK).for_each(|chunk| {
            // capture the whole wrapper, not its raw-pointer field
            let column = &column;
            for &entity in chunk {
                // rows are disjoint across the whole member list
                unsafe { f(entity, &mut *column.0.add(entity.index() as usize)) }
            }
        });
        Ok(())
    }

    /// Parallel iteration reading one column and writing another.
    ///
    /// The two components must differ; aliasing a column as both read and
    /// write is rejected.
    pub fn par_for_each_read1_write1<R: Component, W: Component>(
        &mut self,
        query: QueryId,
        f: impl Fn(Entity, &R, &mut W) + Send + Sync,
    ) -> EcsResult<()> {
        let rid = self.registry.id_of::<R>()?;
        let wid = self.registry.id_of::<W>()?;
        if rid == wid {
            return Err(EcsError::Internal(
                "parallel read and write over the same component column".into(),
            ));
        }
        self.require_query_component(query, rid)?;
        self.require_query_component(query, wid)?;
        let members = self.query_state(query)?.entities().to_vec();
        let read = ColumnPtr(self.pool_mut::<R>(rid)?.base_ptr());
        let write = ColumnPtr(self.pool_mut::<W>(wid)?.base_ptr());

        members.par_chunks(PAR_CHUNK).for_each(|chunk| {
            // capture the whole wrappers, not their raw-pointer fields
            let (read, write) = (&read, &write);
            for &entity in chunk {
                let slot = entity.index() as usize;
                // distinct pools; write rows disjoint across the member list
                unsafe { f(entity, &*read.0.add(slot), &mut *write.0.add(slot)) }
            }
        });
        Ok(())
    }

    // ---- deferred commands ------------------------------------------------

    /// Records a command into the calling thread's lane.
    #[inline]
    pub fn defer(&self, command: Command) {
        self.commands.record(command);
    }

    /// Number of commands waiting for playback.
    #[inline]
    pub fn pending_commands(&self) -> usize {
        self.commands.pending()
    }

    /// Replays every buffered command single-threaded: lanes in index
    /// order, append order within a lane.
    ///
    /// Records whose target died earlier in the same playback (or whose
    /// handle was already stale when recorded) are skipped silently; a
    /// skipped `Add` still disposes its staged payload.
    pub fn playback(&mut self) -> EcsResult<()> {
        let records = self.commands.drain();
        if records.is_empty() {
            return Ok(());
        }
        tracing::trace!(count = records.len(), "command playback");

        for record in records {
            match record {
                Command::Add { entity, component_id, value } => {
                    if !self.entities.is_alive(entity) {
                        self.registry.info(component_id)?;
                        self.pools[component_id as usize].dispose_boxed(value);
                        continue;
                    }
                    self.add_component_dyn(entity, component_id, value)?;
                }
                Command::AddNoData { entity, component_id } => {
                    if !self.entities.is_alive(entity) {
                        continue;
                    }
                    self.add_no_data(entity, component_id)?;
                }
                Command::Remove { entity, component_id } => {
                    if !self.entities.is_alive(entity) {
                        continue;
                    }
                    self.remove_component_id(entity, component_id)?;
                }
                Command::Destroy { entity } => {
                    if !self.entities.is_alive(entity) {
                        continue;
                    }
                    self.destroy_entity(entity)?;
                }
                Command::Copy { source } => {
                    if !self.entities.is_alive(source) {
                        continue;
                    }
                    self.copy_entity(source)?;
                }
            }
        }
        Ok(())
    }
}

/// Thread-safe entry point to the world.
///
/// ## Role
/// `WorldManager` owns the entire engine state and hands out lightweight
/// [`WorldRef`] handles to worker threads. It is `Sync`; all mutation goes
/// through `UnsafeCell<World>`.
///
/// ## Safety
/// Soundness rests on the phase discipline documented at the module level:
/// stages record, playback mutates, and the two never overlap in time.
pub struct WorldManager {
    inner: UnsafeCell<World>,
}

unsafe impl Sync for WorldManager {}

impl WorldManager {
    /// Wraps a world for shared access.
    pub fn new(world: World) -> Self {
        Self { inner: UnsafeCell::new(world) }
    }

    /// Hands out a shared handle for use inside a stage.
    #[inline]
    pub fn world_ref(&self) -> WorldRef<'_> {
        WorldRef { inner: &self.inner }
    }

    /// Exclusive access to the world between stages.
    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        self.inner.get_mut()
    }

    /// Replays buffered commands. Requires exclusive access, which is what
    /// makes it the synchronization point.
    pub fn playback(&mut self) -> EcsResult<()> {
        self.inner.get_mut().playback()
    }

    /// Unwraps the world.
    pub fn into_inner(self) -> World {
        self.inner.into_inner()
    }
}

/// Shared handle to the world, used by systems inside a stage.
///
/// ## Safety contract
/// During a stage, callers may read storage and record commands through the
/// `defer_*` methods. [`WorldRef::world_mut`] exists for single-threaded
/// callers (setup code, tests) and must never be used while another handle
/// is active on a different thread.
#[derive(Clone, Copy)]
pub struct WorldRef<'a> {
    inner: &'a UnsafeCell<World>,
}

impl<'a> WorldRef<'a> {
    /// Shared view of the world.
    #[inline]
    pub fn world(&self) -> &World {
        unsafe { &*self.inner.get() }
    }

    /// Exclusive view of the world.
    ///
    /// # Safety (by convention)
    /// Sound only while no other thread holds a view. The scheduler never
    /// calls this from a stage; it exists for single-threaded phases.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub fn world_mut(&self) -> &mut World {
        unsafe { &mut *self.inner.get() }
    }

    /// Records a typed component add.
    pub fn defer_add<T: Component>(&self, entity: Entity, value: T) -> EcsResult<()> {
        let component_id = self.world().registry().id_of::<T>()?;
        self.world().defer(Command::Add { entity, component_id, value: Box::new(value) });
        Ok(())
    }

    /// Records a tag-style add (no value written).
    pub fn defer_add_no_data<T: Component>(&self, entity: Entity) -> EcsResult<()> {
        let component_id = self.world().registry().id_of::<T>()?;
        self.world().defer(Command::AddNoData { entity, component_id });
        Ok(())
    }

    /// Records a component removal.
    pub fn defer_remove<T: Component>(&self, entity: Entity) -> EcsResult<()> {
        let component_id = self.world().registry().id_of::<T>()?;
        self.world().defer(Command::Remove { entity, component_id });
        Ok(())
    }

    /// Records an entity destruction.
    pub fn defer_destroy(&self, entity: Entity) {
        self.world().defer(Command::Destroy { entity });
    }

    /// Records an entity duplication.
    pub fn defer_copy(&self, source: Entity) {
        self.world().defer(Command::Copy { source });
    }
}
