//! Entity Table: Allocation, Generations, and Archetype Pointers
//!
//! ## Purpose
//!
//! The [`EntityTable`] owns the identity of every entity in a world:
//!
//! - a **free list** of recycled slot indices,
//! - a **generation counter** per slot, bumped on free so stale handles are
//!   detected instead of aliasing whatever entity reused the slot,
//! - a per-slot **archetype pointer** recording the entity's current node in
//!   the transition graph.
//!
//! ## Behavior
//!
//! Allocation pops the free list when possible, otherwise appends a fresh
//! slot. The backing vectors grow by doubling up to the world's configured
//! entity capacity; past that, allocation fails with a checked
//! [`CapacityError`] rather than outgrowing the fixed-size pools.
//!
//! ## Invariants
//!
//! - A slot index is on the free list iff `alive[index]` is false and the
//!   slot was allocated at least once.
//!   A handle is valid iff `alive[index] && versions[index] == version`.
//! - `archetype[index]` is meaningful only while the slot is alive.

use crate::engine::error::{CapacityError, StaleEntityError};
use crate::engine::types::{ArchetypeId, Entity, IndexId, VersionId, INDEX_CAP};


/// Identity store for every entity slot in a world.
pub struct EntityTable {
    versions: Vec<VersionId>,
    alive: Vec<bool>,
    archetype: Vec<ArchetypeId>,
    free_store: Vec<IndexId>,
    capacity: usize,
    live: usize,
}

impl EntityTable {
    /// Creates a table bounded by `capacity` slots.
    ///
    /// Vectors start small and double on demand; `capacity` is the hard
    /// ceiling matching the pools' fixed size.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(INDEX_CAP as usize);
        Self {
            versions: Vec::new(),
            alive: Vec::new(),
            archetype: Vec::new(),
            free_store: Vec::new(),
            capacity,
            live: 0,
        }
    }

    fn grow_for(&mut self, index: usize) {
        if index < self.versions.len() {
            return;
        }
        let mut target = self.versions.len().max(16);
        while target <= index {
            target *= 2;
        }
        let target = target.min(self.capacity);
        self.versions.resize(target, 0);
        self.alive.resize(target, false);
        self.archetype.resize(target, 0);
    }

    /// Allocates an entity in archetype `root`.
    ///
    /// # Errors
    /// [`CapacityError`] when every slot up to the configured capacity is
    /// live.
    pub fn allocate(&mut self, root: ArchetypeId) -> Result<Entity, CapacityError> {
        let index = match self.free_store.pop() {
            Some(index) => index,
            None => {
                let next = self.high_water();
                if next >= self.capacity {
                    return Err(CapacityError {
                        requested: next as u64 + 1,
                        capacity: self.capacity as u64,
                    });
                }
                self.grow_for(next);
                next as IndexId
            }
        };
        let slot = index as usize;
        self.alive[slot] = true;
        self.archetype[slot] = root;
        self.live += 1;
        Ok(Entity::new(index, self.versions[slot]))
    }

    // Highest slot index ever allocated, live or not.
    fn high_water(&self) -> usize {
        self.live + self.free_store.len()
    }

    /// Frees an entity, bumping its slot's generation.
    ///
    /// # Errors
    /// [`StaleEntityError`] when the handle is dead or outdated.
    pub fn free(&mut self, entity: Entity) -> Result<(), StaleEntityError> {
        let slot = self.check(entity)? as usize;
        self.alive[slot] = false;
        self.versions[slot] = self.versions[slot].wrapping_add(1);
        self.free_store.push(entity.index());
        self.live -= 1;
        Ok(())
    }

    /// Validates a handle, returning its slot index.
    ///
    /// # Errors
    /// [`StaleEntityError`] when the slot is dead or the generation does not
    /// match.
    #[inline]
    pub fn check(&self, entity: Entity) -> Result<IndexId, StaleEntityError> {
        let slot = entity.index() as usize;
        if slot < self.alive.len()
            && self.alive[slot]
            && self.versions[slot] == entity.version()
        {
            Ok(entity.index())
        } else {
            Err(StaleEntityError)
        }
    }

    /// Returns `true` for a currently-valid handle.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.check(entity).is_ok()
    }

    /// Current archetype of a live entity.
    #[inline]
    pub fn archetype_of(&self, entity: Entity) -> Result<ArchetypeId, StaleEntityError> {
        let slot = self.check(entity)? as usize;
        Ok(self.archetype[slot])
    }

    /// Repoints a live entity's archetype.
    #[inline]
    pub fn set_archetype(
        &mut self,
        entity: Entity,
        archetype: ArchetypeId,
    ) -> Result<(), StaleEntityError> {
        let slot = self.check(entity)? as usize;
        self.archetype[slot] = archetype;
        Ok(())
    }

    /// Number of live entities.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Iterates every live entity with its current archetype.
    pub fn iter_live(&self) -> impl Iterator<Item = (Entity, ArchetypeId)> + '_ {
        self.alive.iter().enumerate().filter_map(|(slot, &alive)| {
            alive.then(|| {
                (
                    Entity::new(slot as IndexId, self.versions[slot]),
                    self.archetype[slot],
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_free_recycles_with_bumped_generation() {
        let mut table = EntityTable::new(8);
        let a = table.allocate(0).unwrap();
        let b = table.allocate(0).unwrap();
        assert_ne!(a.index(), b.index());
        table.free(a).unwrap();
        assert!(!table.is_alive(a));
        let c = table.allocate(0).unwrap();
        assert_eq!(c.index(), a.index());
        assert_eq!(c.version(), a.version() + 1);
        assert!(table.is_alive(c));
        assert!(table.check(a).is_err());
    }

    #[test]
    fn double_free_is_stale() {
        let mut table = EntityTable::new(4);
        let a = table.allocate(0).unwrap();
        table.free(a).unwrap();
        assert!(table.free(a).is_err());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut table = EntityTable::new(2);
        table.allocate(0).unwrap();
        table.allocate(0).unwrap();
        let err = table.allocate(0).unwrap_err();
        assert_eq!(err.capacity, 2);
        // freeing opens a slot again
        let e = Entity::new(0, 0);
        table.free(e).unwrap();
        assert!(table.allocate(0).is_ok());
    }

    #[test]
    fn archetype_pointer_tracks_entity() {
        let mut table = EntityTable::new(4);
        let a = table.allocate(3).unwrap();
        assert_eq!(table.archetype_of(a).unwrap(), 3);
        table.set_archetype(a, 7).unwrap();
        assert_eq!(table.archetype_of(a).unwrap(), 7);
        let live: Vec<_> = table.iter_live().collect();
        assert_eq!(live, vec![(a, 7)]);
    }
}
