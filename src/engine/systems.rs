//! System Abstractions
//!
//! A **system** is a unit of logic run against the world each frame.
//! Systems:
//! - declare which components they read and write via [`AccessSets`],
//! - are grouped into conflict-free stages by the scheduler,
//! - operate through a [`WorldRef`] rather than direct world access,
//! - report failures through [`EcsResult`] so a broken system stops the
//!   schedule instead of corrupting state silently.
//!
//! ## Function-backed systems
//!
//! [`FnSystem`] wraps a closure with an id, a name, and an access set. Most
//! simulation logic should use it; a hand-written `System` impl is only
//! worthwhile for systems carrying their own state.
//!
//! Systems must be `Send + Sync` so stages can run them on worker threads.

use crate::engine::error::EcsResult;
use crate::engine::types::{AccessSets, SystemId};
use crate::engine::world::WorldRef;


/// A unit of executable logic operating on the world.
pub trait System: Send + Sync {
    /// Stable identifier; stage construction sorts by it.
    fn id(&self) -> SystemId;

    /// Human-readable name, for logs.
    fn name(&self) -> &'static str;

    /// Declared component access, used for conflict staging.
    fn access(&self) -> &AccessSets;

    /// Executes the system against the world.
    fn run(&self, world: WorldRef<'_>) -> EcsResult<()>;
}

/// A [`System`] backed by a function or closure.
pub struct FnSystem<F>
where
    F: Fn(WorldRef<'_>) -> EcsResult<()> + Send + Sync + 'static,
{
    id: SystemId,
    name: &'static str,
    access: AccessSets,
    f: F,
}

impl<F> FnSystem<F>
where
    F: Fn(WorldRef<'_>) -> EcsResult<()> + Send + Sync + 'static,
{
    /// Creates a function-backed system.
    pub fn new(id: SystemId, name: &'static str, access: AccessSets, f: F) -> Self {
        Self { id, name, access, f }
    }
}

impl<F> System for FnSystem<F>
where
    F: Fn(WorldRef<'_>) -> EcsResult<()> + Send + Sync + 'static,
{
    fn id(&self) -> SystemId {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn access(&self) -> &AccessSets {
        &self.access
    }

    fn run(&self, world: WorldRef<'_>) -> EcsResult<()> {
        (self.f)(world)
    }
}
