//! Deferred Structural Commands
//!
//! ## Purpose
//!
//! Structural mutation (adding or removing components, destroying or
//! duplicating entities) cannot run while systems iterate: it changes query
//! membership and archetype pointers mid-walk. Systems therefore *record*
//! structural intent as [`Command`] values into a [`CommandBuffer`] and the
//! world replays the records single-threaded at a synchronization barrier.
//!
//! ## Lanes
//!
//! The buffer holds one lane per rayon worker thread plus one overflow lane
//! for threads outside the pool. A recording thread locks only its own lane,
//! so workers never contend with each other. Playback drains lanes in lane
//! index order and each lane in append order, which gives a firm per-thread
//! ordering guarantee: records from one thread apply in the order that
//! thread submitted them. There is no ordering promise *between* lanes;
//! structurally mutating the same entity from two threads in one frame is a
//! caller error.

use std::any::Any;
use std::sync::Mutex;

use crate::engine::types::{ComponentId, Entity};


/// One deferred structural operation.
pub enum Command {
    /// Attach a component value to an entity.
    ///
    /// If the entity already has the component the record is a no-op, except
    /// that a disposable payload is disposed before being dropped.
    Add {
        /// Target entity.
        entity: Entity,
        /// Registered component type.
        component_id: ComponentId,
        /// Boxed value written into the pool at playback.
        value: Box<dyn Any + Send>,
    },
    /// Attach a component without writing a value (tag path; the row keeps
    /// its default image).
    AddNoData {
        /// Target entity.
        entity: Entity,
        /// Registered component type.
        component_id: ComponentId,
    },
    /// Detach a component. No-op when the entity lacks it.
    Remove {
        /// Target entity.
        entity: Entity,
        /// Registered component type.
        component_id: ComponentId,
    },
    /// Destroy an entity. Stale handles are skipped silently.
    Destroy {
        /// Target entity.
        entity: Entity,
    },
    /// Duplicate an entity and its child subtree. The clone's id is
    /// allocated at playback.
    Copy {
        /// Entity to duplicate.
        source: Entity,
    },
}

/// Per-thread lanes of deferred commands.
pub struct CommandBuffer {
    lanes: Vec<Mutex<Vec<Command>>>,
}

impl CommandBuffer {
    /// Creates a buffer with `worker_lanes` worker lanes plus the overflow
    /// lane.
    pub fn new(worker_lanes: usize) -> Self {
        let lanes = (0..worker_lanes + 1).map(|_| Mutex::new(Vec::new())).collect();
        Self { lanes }
    }

    /// Creates a buffer with one lane per current rayon worker.
    pub fn for_current_pool() -> Self {
        Self::new(rayon::current_num_threads())
    }

    #[inline]
    fn lane_index(&self) -> usize {
        let overflow = self.lanes.len() - 1;
        match rayon::current_thread_index() {
            Some(worker) if worker < overflow => worker,
            _ => overflow,
        }
    }

    /// Appends a record to the calling thread's lane.
    ///
    /// Lock poisoning cannot propagate panics here in any meaningful way, so
    /// a poisoned lane is taken over rather than failing the recording side.
    pub fn record(&self, command: Command) {
        let lane = &self.lanes[self.lane_index()];
        match lane.lock() {
            Ok(mut records) => records.push(command),
            Err(poisoned) => poisoned.into_inner().push(command),
        }
    }

    /// Takes every record, lanes in index order, append order within a lane.
    pub fn drain(&self) -> Vec<Command> {
        let mut out = Vec::new();
        for lane in &self.lanes {
            let mut records = match lane.lock() {
                Ok(records) => records,
                Err(poisoned) => poisoned.into_inner(),
            };
            out.append(&mut records);
        }
        out
    }

    /// Total records currently buffered.
    pub fn pending(&self) -> usize {
        self.lanes
            .iter()
            .map(|lane| match lane.lock() {
                Ok(records) => records.len(),
                Err(poisoned) => poisoned.into_inner().len(),
            })
            .sum()
    }

    /// Number of lanes, overflow included.
    #[inline]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}
