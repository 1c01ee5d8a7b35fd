//! Incrementally-Maintained Queries
//!
//! ## Purpose
//!
//! A query is a long-lived, registered filter over entities: a set of
//! required component types (`with`) and a set of excluded ones (`none`).
//! Rather than scanning archetypes at iteration time, each query keeps its
//! member list up to date incrementally: structural transitions apply the
//! owning archetype's cached query delta, so iteration is a walk over a
//! dense, precomputed entity list.
//!
//! ## Storage
//!
//! [`QueryState`] pairs a dense member list with a sparse index:
//!
//! - `dense` — the members, contiguous, iterated directly,
//! - `sparse` — indexed by entity slot, holding `position + 1` into `dense`
//!   (zero means absent), so membership tests and removals are O(1).
//!
//! Removal is swap-remove: the last member fills the vacated position and
//! its sparse slot is re-pointed. Member order is therefore unspecified.
//!
//! ## Matching
//!
//! An archetype matches iff its signature contains every `with` bit and none
//! of the `none` bits. An empty `with` matches every archetype not excluded,
//! including the root.
//!
//! ## Invariants
//!
//! - `dense[sparse[slot] - 1].index() == slot` for every member.
//! - `sparse[slot] == 0` for every non-member slot.

use crate::engine::bitmask::Bitmask;
use crate::engine::component::Component;
use crate::engine::error::EcsResult;
use crate::engine::types::{Entity, QueryId};
use crate::engine::world::World;


/// Dense member set of one registered query.
pub struct QueryState {
    /// Required component bits.
    pub with: Bitmask,
    /// Excluded component bits.
    pub none: Bitmask,
    dense: Vec<Entity>,
    sparse: Vec<u32>,
}

impl QueryState {
    /// Creates an empty member set with the given filters.
    pub fn new(with: Bitmask, none: Bitmask) -> Self {
        Self { with, none, dense: Vec::new(), sparse: Vec::new() }
    }

    /// Returns `true` when `signature` satisfies the filters.
    #[inline]
    pub fn matches(&self, signature: &Bitmask) -> bool {
        signature.contains_all(&self.with) && signature.disjoint_with(&self.none)
    }

    /// Adds an entity to the member set. Re-adding a member is a no-op.
    pub fn insert(&mut self, entity: Entity) {
        let slot = entity.index() as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, 0);
        }
        if self.sparse[slot] != 0 {
            return;
        }
        self.dense.push(entity);
        self.sparse[slot] = self.dense.len() as u32;
    }

    /// Removes an entity by swap-remove. Removing a non-member is a no-op.
    pub fn remove(&mut self, entity: Entity) {
        let slot = entity.index() as usize;
        let Some(&mark) = self.sparse.get(slot) else { return };
        if mark == 0 {
            return;
        }
        let position = (mark - 1) as usize;
        self.dense.swap_remove(position);
        if position < self.dense.len() {
            let moved = self.dense[position];
            self.sparse[moved.index() as usize] = mark;
        }
        self.sparse[slot] = 0;
    }

    /// Membership test, O(1).
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.sparse
            .get(entity.index() as usize)
            .is_some_and(|&mark| mark != 0 && self.dense[(mark - 1) as usize] == entity)
    }

    /// Current members. Order is unspecified and changes on removal.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    /// Number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` when the query has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }
}

/// Consuming builder for registering a query against a world.
///
/// ```ignore
/// let moving = world.query().with::<Position>()?.with::<Velocity>()?.build()?;
/// ```
pub struct QueryBuilder<'w> {
    world: &'w mut World,
    with: Bitmask,
    none: Bitmask,
}

impl<'w> QueryBuilder<'w> {
    pub(crate) fn new(world: &'w mut World) -> Self {
        let bits = world.registry().len();
        Self { world, with: Bitmask::new(bits), none: Bitmask::new(bits) }
    }

    /// Requires component `T`.
    ///
    /// # Errors
    /// Registry lookup failure when `T` was never registered.
    pub fn with<T: Component>(mut self) -> EcsResult<Self> {
        let id = self.world.registry().id_of::<T>()?;
        self.with.add(id as usize)?;
        Ok(self)
    }

    /// Excludes component `T`.
    ///
    /// # Errors
    /// Registry lookup failure when `T` was never registered.
    pub fn none<T: Component>(mut self) -> EcsResult<Self> {
        let id = self.world.registry().id_of::<T>()?;
        self.none.add(id as usize)?;
        Ok(self)
    }

    /// Registers the query, populating it from existing entities.
    pub fn build(self) -> EcsResult<QueryId> {
        self.world.register_query(self.with, self.none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(width: usize) -> QueryState {
        QueryState::new(Bitmask::new(width), Bitmask::new(width))
    }

    #[test]
    fn insert_is_idempotent() {
        let mut q = state(8);
        let e = Entity::new(3, 0);
        q.insert(e);
        q.insert(e);
        assert_eq!(q.len(), 1);
        assert!(q.contains(e));
    }

    #[test]
    fn swap_remove_repoints_moved_member() {
        let mut q = state(8);
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        let c = Entity::new(2, 0);
        q.insert(a);
        q.insert(b);
        q.insert(c);
        q.remove(a);
        assert!(!q.contains(a));
        assert!(q.contains(b));
        assert!(q.contains(c));
        assert_eq!(q.len(), 2);
        for &member in q.entities() {
            assert!(q.contains(member));
        }
        // removing a non-member is a no-op
        q.remove(a);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn matching_rule_with_none_and_empty_with() {
        let mut with = Bitmask::new(8);
        with.add(1).unwrap();
        let mut none = Bitmask::new(8);
        none.add(2).unwrap();
        let q = QueryState::new(with, none);

        let mut sig = Bitmask::new(8);
        sig.add(1).unwrap();
        assert!(q.matches(&sig));
        sig.add(2).unwrap();
        assert!(!q.matches(&sig));

        let everything = state(8);
        let empty_sig = Bitmask::new(8);
        assert!(everything.matches(&empty_sig));
        assert!(everything.matches(&sig));
    }
}
