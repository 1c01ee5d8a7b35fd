//! Error types for the storage engine.
//!
//! This module declares focused, composable error types used across the
//! registry, pool, archetype, and command layers. Each error carries enough
//! context to make failures actionable while remaining small and cheap to
//! pass around or convert into the aggregate [`EcsError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (bitmask
//!   bound violations, exhausted capacity, stale entity handles, missing
//!   components).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`EcsError`]
//!   so call sites can use `?`.
//! * **Actionability:** Structured fields (requested vs. available capacity,
//!   offending positions, expected vs. actual types) make logs useful
//!   without reproducing the issue.
//!
//! ## Taxonomy
//! Duplicate structural operations (adding a component an entity already
//! has, removing one it lacks) are deliberate **no-ops**, not errors; this
//! keeps command-buffer replay idempotent. Errors here cover the genuinely
//! recoverable conditions (capacity, stale handles, unregistered types);
//! violated internal invariants surface as [`EcsError::Internal`].

use std::fmt;
use std::any::TypeId;

use crate::engine::types::{ComponentId, QueryId};


/// Returned when a bit position falls outside a bitmask's configured width.
///
/// Callers must size masks to the registry's total component count at
/// construction; a position at or beyond `max_bits` is rejected rather than
/// silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRangeError {
    /// Offending bit position.
    pub position: usize,
    /// Configured width of the mask.
    pub max_bits: usize,
}

impl fmt::Display for OutOfRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bit position {} out of range (mask width {})",
            self.position, self.max_bits
        )
    }
}

impl std::error::Error for OutOfRangeError {}

/// Returned when the entity table or a component pool cannot satisfy a
/// request because the world's configured capacity is exhausted.
///
/// Pools are pre-sized at world creation and never grow; exceeding that size
/// is reported here instead of becoming an out-of-bounds write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    /// Slot count the operation attempted to reach.
    pub requested: u64,
    /// Configured capacity limiting the operation.
    pub capacity: u64,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity exhausted ({} requested; capacity {})",
            self.requested, self.capacity
        )
    }
}

impl std::error::Error for CapacityError {}

/// Returned when an `Entity` handle is no longer valid, typically because
/// it was destroyed and its generation no longer matches the live slot.
///
/// Use this to prevent use-after-free style logic errors at the API
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleEntityError;

impl fmt::Display for StaleEntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("stale or dead entity handle")
    }
}

impl std::error::Error for StaleEntityError {}

/// Errors raised by the component registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration was attempted after the registry was frozen.
    Frozen {
        /// Rust type name of the component being registered.
        name: &'static str,
    },
    /// The registry's component-id space is exhausted.
    CapacityExceeded {
        /// Configured maximum number of component types.
        capacity: usize,
    },
    /// A type or id was looked up that was never registered.
    Unregistered {
        /// Rust type name of the component, when known.
        name: &'static str,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Frozen { name } => {
                write!(f, "cannot register component {name}: registry is frozen")
            }
            RegistryError::CapacityExceeded { capacity } => {
                write!(f, "component capacity exceeded (max {capacity})")
            }
            RegistryError::Unregistered { name } => {
                write!(f, "component type not registered: {name}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Returned when a typed access expects a component the entity does not
/// currently have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingComponentError {
    /// Identifier of the missing component type.
    pub component_id: ComponentId,
    /// Human-readable component name.
    pub name: &'static str,
}

impl fmt::Display for MissingComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entity has no component {} (id {})",
            self.name, self.component_id
        )
    }
}

impl std::error::Error for MissingComponentError {}

/// Returned when a type-erased write targets a pool whose element type does
/// not match the provided value's type.
///
/// This is a logic/configuration error surfaced by the reflection boundary
/// (e.g. writing a `Velocity` object into the `Position` pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatchError {
    /// Destination pool's declared element type.
    pub expected: TypeId,
    /// Provided value's dynamic type.
    pub actual: TypeId,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type mismatch: expected {:?}, actual {:?}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for TypeMismatchError {}

/// Aggregate error for all storage-engine operations.
///
/// `From<T>` conversions are implemented for the focused error types so
/// callers can write `?` and still return a single, expressive type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A bit position fell outside a bitmask's configured width.
    OutOfRange(OutOfRangeError),
    /// Configured world capacity was exhausted.
    Capacity(CapacityError),
    /// An entity handle was stale or referred to a destroyed entity.
    StaleEntity,
    /// A registry operation failed.
    Registry(RegistryError),
    /// A typed access expected a component the entity lacks.
    MissingComponent(MissingComponentError),
    /// A reflection write carried a value of the wrong dynamic type.
    TypeMismatch(TypeMismatchError),
    /// An operation referenced a query id that was never registered.
    UnknownQuery(QueryId),
    /// An internal invariant was violated.
    ///
    /// This indicates corruption rather than a recoverable runtime
    /// condition.
    Internal(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::OutOfRange(e) => write!(f, "{e}"),
            EcsError::Capacity(e) => write!(f, "{e}"),
            EcsError::StaleEntity => f.write_str("stale or dead entity handle"),
            EcsError::Registry(e) => write!(f, "{e}"),
            EcsError::MissingComponent(e) => write!(f, "{e}"),
            EcsError::TypeMismatch(e) => write!(f, "{e}"),
            EcsError::UnknownQuery(id) => write!(f, "unknown query id {id}"),
            EcsError::Internal(message) => write!(f, "internal invariant violated: {message}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<OutOfRangeError> for EcsError {
    fn from(e: OutOfRangeError) -> Self { EcsError::OutOfRange(e) }
}
impl From<CapacityError> for EcsError {
    fn from(e: CapacityError) -> Self { EcsError::Capacity(e) }
}
impl From<StaleEntityError> for EcsError {
    fn from(_: StaleEntityError) -> Self { EcsError::StaleEntity }
}
impl From<RegistryError> for EcsError {
    fn from(e: RegistryError) -> Self { EcsError::Registry(e) }
}
impl From<MissingComponentError> for EcsError {
    fn from(e: MissingComponentError) -> Self { EcsError::MissingComponent(e) }
}
impl From<TypeMismatchError> for EcsError {
    fn from(e: TypeMismatchError) -> Self { EcsError::TypeMismatch(e) }
}

/// Convenience result alias used across the engine.
pub type EcsResult<T> = Result<T, EcsError>;
