//! System Scheduling and Stage Execution
//!
//! This module is responsible for:
//! * grouping systems into execution stages based on access compatibility,
//! * running compatible systems in parallel using rayon,
//! * enforcing structural synchronization points between stages.
//!
//! ## Scheduling model
//!
//! Systems are assigned to **stages** such that:
//! * systems within the same stage do **not** conflict on component access,
//! * all systems in a stage may run in parallel,
//! * stages are executed sequentially.
//!
//! Two systems conflict when one writes a component the other reads or
//! writes.
//!
//! ## Structural synchronization
//!
//! Deferred commands recorded by systems are played back **before** each
//! stage begins and **after** it completes, so structural changes never race
//! with system execution and each stage observes the structural effects of
//! the previous one.

use rayon::prelude::*;

use crate::engine::error::EcsResult;
use crate::engine::systems::System;
use crate::engine::world::WorldManager;


/// A group of systems that can be executed in parallel.
///
/// ## Invariants
/// * All systems within a `Stage` have non-conflicting access sets.
///
/// Stages themselves must be executed sequentially.
pub struct Stage {
    /// Systems scheduled to run in this stage.
    pub systems: Vec<Box<dyn System>>,
}

/// Partitions systems into parallel execution stages.
///
/// ## Algorithm
/// Systems are processed in deterministic order (by system id) and assigned
/// greedily: each system lands in the first stage where it conflicts with
/// nothing already placed, or opens a new stage.
///
/// ## Determinism
/// Sorting by system id makes stage construction reproducible across runs.
///
/// ## Complexity
/// O(n²) in the worst case; small for typical workloads.
pub fn make_stages(mut systems: Vec<Box<dyn System>>) -> Vec<Stage> {
    let mut stages: Vec<Stage> = Vec::new();

    systems.sort_by_key(|s| s.id());

    'next_system: for sys in systems.into_iter() {
        for stage in stages.iter_mut() {
            let conflict = stage
                .systems
                .iter()
                .any(|other| sys.access().conflicts_with(other.access()));
            if !conflict {
                stage.systems.push(sys);
                continue 'next_system;
            }
        }
        stages.push(Stage { systems: vec![sys] });
    }
    stages
}

/// Runs stages sequentially, systems within a stage in parallel.
///
/// Commands are played back before and after every stage. The first system
/// error aborts the schedule after its stage completes.
pub fn run_schedule(manager: &mut WorldManager, stages: &[Stage]) -> EcsResult<()> {
    for stage in stages {
        manager.playback()?;

        stage.systems.par_iter().try_for_each(|sys| {
            tracing::trace!(system = sys.name(), "running system");
            sys.run(manager.world_ref())
        })?;

        manager.playback()?;
    }
    Ok(())
}
