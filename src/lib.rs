//! # Archetype ECS
//!
//! An Entity-Component-System storage engine built around an archetype
//! transition graph with cached edges.
//!
//! ## Design Goals
//! - World-global dense pools indexed by entity slot: structural
//!   transitions move no component data
//! - Memoized transition edges carrying precomputed query deltas
//! - Incrementally-maintained queries with O(1) membership
//! - Deferred structural mutation through per-thread command lanes,
//!   replayed at explicit synchronization points
//! - Deterministic, conflict-staged parallel execution on rayon

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::world::{
    World,
    WorldConfig,
    WorldManager,
    WorldRef,
};

pub use engine::component::{
    ChildOf,
    Children,
    Component,
    ComponentArray,
    ComponentInfo,
    ComponentRegistry,
};

pub use engine::bitmask::Bitmask;

pub use engine::query::{QueryBuilder, QueryState};

pub use engine::systems::{FnSystem, System};
pub use engine::scheduler::{
    make_stages,
    run_schedule,
    Stage,
};

pub use engine::commands::{Command, CommandBuffer};

pub use engine::error::{
    CapacityError,
    EcsError,
    EcsResult,
    MissingComponentError,
    OutOfRangeError,
    RegistryError,
    StaleEntityError,
    TypeMismatchError,
};

pub use engine::types::{
    AccessSets,
    ArchetypeId,
    ComponentId,
    Entity,
    QueryId,
    SystemId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used engine types.
///
/// Import with:
/// ```rust
/// use archetype_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AccessSets,
        Component,
        ComponentRegistry,
        EcsError,
        EcsResult,
        Entity,
        FnSystem,
        System,
        World,
        WorldConfig,
        WorldManager,
        WorldRef,
    };
}
