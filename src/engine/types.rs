//! Core identifier types and bit-level layouts.
//!
//! This module defines the **fundamental types, identifiers, and bit layouts**
//! shared by every subsystem of the storage engine: entity handles, component
//! identifiers, archetype and query identifiers, and the access-set structure
//! used by the scheduler.
//!
//! ## Entity Representation
//!
//! Entities are encoded as a packed 64-bit integer:
//!
//! ```text
//! | version | index |
//! ```
//!
//! - **Index** is the entity's slot in the world's entity table and the row
//!   index into every component pool.
//! - **Version** is a generation counter bumped on destroy, allowing stale
//!   handles to be detected instead of silently aliasing a recycled slot.
//!
//! The bit widths are compile-time constants validated with static
//! assertions.
//!
//! ## Components, Archetypes, Queries
//!
//! Components are identified by compact [`ComponentId`] values assigned in
//! registration order. Archetypes and queries use plain dense indices into
//! their owning world's tables. Archetype *identity* (order-independent over
//! the component set) is a separate canonical hash, see `engine::archetype`.

use crate::engine::bitmask::Bitmask;


/// Bit-width type used for compile-time layout calculations.
pub type Bits = u8;

/// Packed 64-bit entity value (index + version).
pub type EntityId = u64;
/// Index into the entity table and into every component pool.
pub type IndexId = u32;
/// Generation counter used to detect stale entity handles.
pub type VersionId = u32;

/// Unique identifier for a registered component type.
pub type ComponentId = u16;
/// Dense index of an archetype node within a world.
pub type ArchetypeId = u32;
/// Dense index of a registered query within a world.
pub type QueryId = u32;
/// Unique identifier for a system.
pub type SystemId = u16;

/// Total number of bits in an [`EntityId`].
pub const ENTITY_BITS: Bits = 64;
/// Number of bits reserved for the entity version.
pub const VERSION_BITS: Bits = 32;
/// Number of bits reserved for the entity index.
pub const INDEX_BITS: Bits = ENTITY_BITS - VERSION_BITS;

const _: [(); 1] = [(); (VERSION_BITS < ENTITY_BITS) as usize];
const _: [(); 1] = [(); (INDEX_BITS > 0) as usize];
const _: [(); 1] = [(); (INDEX_BITS < ENTITY_BITS) as usize];

const fn mask(bits: Bits) -> EntityId {
    if bits == 0 { 0 } else { ((1 as EntityId) << bits) - 1 }
}

/// Mask selecting the index portion of an [`EntityId`].
pub const INDEX_MASK: EntityId = mask(INDEX_BITS);
/// Maximum number of entity slots addressable by an index.
pub const INDEX_CAP: IndexId = INDEX_MASK as IndexId;

/// Maximum number of registered component types.
pub const COMPONENT_CAP: usize = 1024;

/// Maximum number of children tracked by the built-in `Children` component.
pub const MAX_CHILDREN: usize = 16;

/// Opaque handle to an entity.
///
/// A handle is only a name: the entity's data lives in the world's component
/// pools and its classification in the archetype graph. Handles carry a
/// version so that a handle held across the entity's destruction fails with
/// a stale-entity error rather than resolving to whatever entity recycled
/// the slot.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Entity(pub EntityId);

#[inline]
const fn make_id(index: IndexId, version: VersionId) -> EntityId {
    ((version as EntityId) << INDEX_BITS) | (index as EntityId)
}

impl Entity {
    /// Packs an index and version into an entity handle.
    #[inline]
    pub fn new(index: IndexId, version: VersionId) -> Self {
        debug_assert!((index as EntityId) <= INDEX_MASK);
        Entity(make_id(index, version))
    }

    /// Returns the slot index of this handle.
    #[inline]
    pub const fn index(self) -> IndexId {
        (self.0 & INDEX_MASK) as IndexId
    }

    /// Returns the generation counter of this handle.
    #[inline]
    pub const fn version(self) -> VersionId {
        (self.0 >> INDEX_BITS) as VersionId
    }
}

/// Declares the component access set of a system.
///
/// Used by the scheduler to detect conflicts: two systems conflict when one
/// writes a component the other reads or writes.
#[derive(Clone, Debug)]
pub struct AccessSets {
    /// Components read by the system.
    pub read: Bitmask,
    /// Components written by the system.
    pub write: Bitmask,
}

impl Default for AccessSets {
    fn default() -> Self {
        Self {
            read: Bitmask::new(COMPONENT_CAP),
            write: Bitmask::new(COMPONENT_CAP),
        }
    }
}

impl AccessSets {
    /// Returns `true` if this access set conflicts with another.
    ///
    /// Conflicts if: (W ∩ W) or (W ∩ R) or (R ∩ W).
    #[inline]
    pub fn conflicts_with(&self, other: &AccessSets) -> bool {
        !self.write.disjoint_with(&other.write)
            || !self.write.disjoint_with(&other.read)
            || !self.read.disjoint_with(&other.write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_packing_round_trips() {
        let e = Entity::new(123_456, 789);
        assert_eq!(e.index(), 123_456);
        assert_eq!(e.version(), 789);
    }

    #[test]
    fn access_sets_detect_write_read_overlap() {
        let mut a = AccessSets::default();
        let mut b = AccessSets::default();
        a.write.add(3).unwrap();
        b.read.add(3).unwrap();
        assert!(a.conflicts_with(&b));
        assert!(b.conflicts_with(&a));

        let mut c = AccessSets::default();
        c.read.add(3).unwrap();
        let mut d = AccessSets::default();
        d.read.add(3).unwrap();
        assert!(!c.conflicts_with(&d));
    }
}
