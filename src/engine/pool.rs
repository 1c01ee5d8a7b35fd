//! Dense Per-Type Component Pools
//!
//! ## Purpose
//!
//! A [`Pool<T>`] is one column of component storage: a vector of `T` with one
//! row per entity slot, indexed directly by entity index. Every world owns
//! one pool per registered component type, all sized identically at world
//! construction.
//!
//! ## Behavior
//!
//! Rows are *dense by entity index*: an entity's row in every pool is its
//! slot index in the entity table, so a structural transition between
//! archetypes moves **no data**. Rows are never compacted or relocated; a
//! freed row is reset to the default image and reused when the entity slot
//! is recycled.
//!
//! Pools are pre-sized once and never grow. An access past the configured
//! capacity is a checked [`CapacityError`], never a reallocation.
//!
//! Whether a row is *occupied* is not the pool's concern: occupancy is
//! defined by the owning archetype's signature. The `count` field is an
//! advisory occupancy figure kept for logging and diagnostics only.
//!
//! ## Type Erasure
//!
//! [`TypeErasedPool`] lets the world hold a uniform `Vec<Box<dyn
//! TypeErasedPool>>` while structural operations (row reset, row clone,
//! boxed-value reads and writes for inspector tooling) dispatch to the
//! concrete element type.

use std::any::{Any, TypeId, type_name};

use crate::engine::component::Component;
use crate::engine::error::{CapacityError, EcsError, EcsResult, TypeMismatchError};


/// A dense column of `T`, one row per entity slot.
pub struct Pool<T: Component> {
    rows: Vec<T>,
    count: usize,
}

impl<T: Component> Pool<T> {
    /// Creates a pool with `capacity` default-initialized rows.
    pub fn new(capacity: usize) -> Self {
        Self { rows: vec![T::default(); capacity], count: 0 }
    }

    #[inline]
    fn check(&self, row: usize) -> Result<(), CapacityError> {
        if row >= self.rows.len() {
            return Err(CapacityError {
                requested: row as u64 + 1,
                capacity: self.rows.len() as u64,
            });
        }
        Ok(())
    }

    /// Writes `value` into `row`.
    ///
    /// # Errors
    /// [`CapacityError`] when `row` is beyond the pool's fixed size.
    #[inline]
    pub fn set(&mut self, row: usize, value: T) -> Result<(), CapacityError> {
        self.check(row)?;
        self.rows[row] = value;
        self.count += 1;
        Ok(())
    }

    /// Bounds-checked shared access to a row.
    #[inline]
    pub fn get(&self, row: usize) -> Option<&T> {
        self.rows.get(row)
    }

    /// Bounds-checked exclusive access to a row.
    #[inline]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut T> {
        self.rows.get_mut(row)
    }

    /// Base pointer to the row storage, for parallel iteration.
    #[inline]
    pub(crate) fn base_ptr(&mut self) -> *mut T {
        self.rows.as_mut_ptr()
    }

    /// Fixed row capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.rows.len()
    }
}

/// Uniform interface over pools of any element type.
pub trait TypeErasedPool: Send + Sync {
    /// Disposes (when the type requires it) and resets a row to the default
    /// image. Out-of-range rows are ignored; the caller's bounds were
    /// checked when the row was populated.
    fn remove(&mut self, row: usize);

    /// Clones row `src` into row `dst`.
    fn copy_row(&mut self, src: usize, dst: usize) -> Result<(), CapacityError>;

    /// Clones a row out as a boxed value. `None` when out of range.
    fn get_object(&self, row: usize) -> Option<Box<dyn Any + Send>>;

    /// Writes a boxed value into a row after a dynamic type check.
    fn set_object(&mut self, row: usize, value: Box<dyn Any + Send>) -> EcsResult<()>;

    /// Disposes a staged boxed value that will never reach a row.
    fn dispose_boxed(&self, value: Box<dyn Any + Send>);

    /// `TypeId` of the element type.
    fn element_type(&self) -> TypeId;

    /// Rust name of the element type.
    fn element_name(&self) -> &'static str;

    /// Advisory occupancy figure, for logging only.
    fn count(&self) -> usize;

    /// Downcast hook.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast hook.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> TypeErasedPool for Pool<T> {
    fn remove(&mut self, row: usize) {
        if let Some(slot) = self.rows.get_mut(row) {
            if T::DISPOSABLE {
                slot.dispose();
            }
            *slot = T::default();
            self.count = self.count.saturating_sub(1);
        }
    }

    fn copy_row(&mut self, src: usize, dst: usize) -> Result<(), CapacityError> {
        self.check(src)?;
        self.check(dst)?;
        let value = self.rows[src].clone();
        self.rows[dst] = value;
        self.count += 1;
        Ok(())
    }

    fn get_object(&self, row: usize) -> Option<Box<dyn Any + Send>> {
        self.rows.get(row).map(|v| Box::new(v.clone()) as Box<dyn Any + Send>)
    }

    fn set_object(&mut self, row: usize, value: Box<dyn Any + Send>) -> EcsResult<()> {
        self.check(row)?;
        match value.downcast::<T>() {
            Ok(typed) => {
                self.rows[row] = *typed;
                Ok(())
            }
            Err(original) => Err(EcsError::TypeMismatch(TypeMismatchError {
                expected: TypeId::of::<T>(),
                actual: original.as_ref().type_id(),
            })),
        }
    }

    fn dispose_boxed(&self, value: Box<dyn Any + Send>) {
        if T::DISPOSABLE {
            if let Ok(mut typed) = value.downcast::<T>() {
                typed.dispose();
            }
        }
    }

    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn count(&self) -> usize {
        self.count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DISPOSED: AtomicU32 = AtomicU32::new(0);

    #[derive(Clone, Default)]
    struct Handle(u64);
    impl Component for Handle {
        const DISPOSABLE: bool = true;
        fn dispose(&mut self) {
            DISPOSED.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default, PartialEq, Debug)]
    struct Pos {
        x: f32,
        y: f32,
    }
    impl Component for Pos {}

    #[test]
    fn set_and_get_are_bounds_checked() {
        let mut pool = Pool::<Pos>::new(4);
        pool.set(3, Pos { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(pool.get(3), Some(&Pos { x: 1.0, y: 2.0 }));
        assert!(pool.get(4).is_none());
        let err = pool.set(4, Pos::default()).unwrap_err();
        assert_eq!(err.requested, 5);
        assert_eq!(err.capacity, 4);
    }

    #[test]
    fn remove_resets_row_to_default() {
        let mut pool = Pool::<Pos>::new(2);
        pool.set(0, Pos { x: 9.0, y: 9.0 }).unwrap();
        TypeErasedPool::remove(&mut pool, 0);
        assert_eq!(pool.get(0), Some(&Pos::default()));
    }

    #[test]
    fn dispose_runs_once_per_remove() {
        DISPOSED.store(0, Ordering::SeqCst);
        let mut pool = Pool::<Handle>::new(2);
        pool.set(0, Handle(7)).unwrap();
        TypeErasedPool::remove(&mut pool, 0);
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);
        // removing an already-default row still disposes the default image;
        // occupancy is the archetype's concern, not the pool's
        TypeErasedPool::remove(&mut pool, 1);
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn boxed_round_trip_and_type_check() {
        let mut pool = Pool::<Pos>::new(2);
        pool.set_object(1, Box::new(Pos { x: 3.0, y: 4.0 })).unwrap();
        let out = pool.get_object(1).unwrap();
        let pos = out.downcast::<Pos>().unwrap();
        assert_eq!(*pos, Pos { x: 3.0, y: 4.0 });

        let err = pool.set_object(0, Box::new(1u32)).unwrap_err();
        assert!(matches!(err, EcsError::TypeMismatch(_)));
    }

    #[test]
    fn copy_row_clones_in_place() {
        let mut pool = Pool::<Pos>::new(3);
        pool.set(0, Pos { x: 5.0, y: 6.0 }).unwrap();
        pool.copy_row(0, 2).unwrap();
        assert_eq!(pool.get(2), Some(&Pos { x: 5.0, y: 6.0 }));
        assert!(pool.copy_row(0, 3).is_err());
    }
}
