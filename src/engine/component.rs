//! Component Trait, Registry, and Built-In Component Types
//!
//! ## Purpose
//!
//! This module defines what a component *is* and how component types become
//! known to the engine:
//!
//! - [`Component`] — the trait every component type implements. The trait's
//!   associated constants and `dispose` hook form a closed dispatch table:
//!   everything the engine needs to know about a type (default image, clone,
//!   teardown, inline-array flag) is carried by the trait rather than by
//!   registered function pointers.
//! - [`ComponentRegistry`] — an explicit value mapping types to dense
//!   [`ComponentId`]s. Worlds are built *from* a registry; there is no global
//!   state and no registration-order coupling between translation units.
//! - [`ComponentArray`] — a fixed-capacity inline array component, used for
//!   small per-entity collections such as child lists.
//!
//! ## Behavior
//!
//! Ids are assigned densely in registration order. Registration is
//! idempotent: registering the same type twice returns the existing id.
//! Once a registry is frozen (which happens automatically when a world is
//! built from it) further registration fails, so every pool table and
//! bitmask sized from `len()` stays valid for the registry's lifetime.
//!
//! ## Errors
//!
//! [`RegistryError`] covers registration after freeze, id-space exhaustion,
//! and lookups of unregistered types.

use std::any::{TypeId, type_name};
use std::collections::HashMap;

use crate::engine::error::RegistryError;
use crate::engine::pool::{Pool, TypeErasedPool};
use crate::engine::types::{ComponentId, Entity, COMPONENT_CAP, MAX_CHILDREN};


/// A type that can be attached to entities.
///
/// The `Default` bound supplies the image freed pool rows are reset to, and
/// `Clone` drives entity duplication. Types that own external resources set
/// [`Component::DISPOSABLE`] and release them in [`Component::dispose`],
/// which runs exactly once before a row is reset or a staged duplicate value
/// is dropped.
pub trait Component: Default + Clone + Send + Sync + 'static {
    /// Whether [`Component::dispose`] must run before a value is discarded.
    const DISPOSABLE: bool = false;
    /// Marks inline-array components such as [`ComponentArray`].
    const ARRAY: bool = false;

    /// Releases resources owned by the value. Default: nothing.
    fn dispose(&mut self) {}
}

/// Metadata recorded for each registered component type.
#[derive(Clone, Debug)]
pub struct ComponentInfo {
    /// Dense id assigned at registration.
    pub component_id: ComponentId,
    /// Rust type name, for logs and error messages.
    pub name: &'static str,
    /// `TypeId` of the component type.
    pub type_id: TypeId,
    /// Size of one value in bytes.
    pub size: usize,
    /// Alignment of one value in bytes.
    pub align: usize,
    /// Zero-sized marker type; tag rows store no data.
    pub tag: bool,
    /// Whether values require a dispose call before discard.
    pub disposable: bool,
    /// Whether the type is an inline-array component.
    pub array: bool,
}

impl ComponentInfo {
    fn of<T: Component>(component_id: ComponentId) -> Self {
        Self {
            component_id,
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            tag: std::mem::size_of::<T>() == 0,
            disposable: T::DISPOSABLE,
            array: T::ARRAY,
        }
    }
}

type PoolFactory = fn(usize) -> Box<dyn TypeErasedPool>;

fn make_pool<T: Component>(capacity: usize) -> Box<dyn TypeErasedPool> {
    Box::new(Pool::<T>::new(capacity))
}

/// Explicit table of registered component types.
///
/// Build one, register every component the application uses, then hand it to
/// `World::new`, which freezes it. `len()` sizes every pool table and the
/// width of every signature bitmask.
pub struct ComponentRegistry {
    infos: Vec<ComponentInfo>,
    factories: Vec<PoolFactory>,
    by_type: HashMap<TypeId, ComponentId>,
    frozen: bool,
}

impl ComponentRegistry {
    /// Creates an empty, unfrozen registry.
    pub fn new() -> Self {
        Self {
            infos: Vec::new(),
            factories: Vec::new(),
            by_type: HashMap::new(),
            frozen: false,
        }
    }

    /// Registers `T`, returning its dense id.
    ///
    /// Idempotent: a second registration of the same type returns the
    /// original id.
    ///
    /// # Errors
    /// [`RegistryError::Frozen`] after [`ComponentRegistry::freeze`];
    /// [`RegistryError::CapacityExceeded`] when the id space is exhausted.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, RegistryError> {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.by_type.get(&type_id) {
            return Ok(id);
        }
        if self.frozen {
            return Err(RegistryError::Frozen { name: type_name::<T>() });
        }
        if self.infos.len() >= COMPONENT_CAP {
            return Err(RegistryError::CapacityExceeded { capacity: COMPONENT_CAP });
        }
        let id = self.infos.len() as ComponentId;
        self.infos.push(ComponentInfo::of::<T>(id));
        self.factories.push(make_pool::<T>);
        self.by_type.insert(type_id, id);
        Ok(id)
    }

    /// Forbids further registration.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns `true` once the registry is frozen.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Looks up the id assigned to `T`.
    ///
    /// # Errors
    /// [`RegistryError::Unregistered`] when `T` was never registered.
    pub fn id_of<T: Component>(&self) -> Result<ComponentId, RegistryError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(RegistryError::Unregistered { name: type_name::<T>() })
    }

    /// Metadata for a registered id.
    ///
    /// # Errors
    /// [`RegistryError::Unregistered`] for ids never assigned. Internal
    /// tables never hold such ids; reaching this from inside the engine is
    /// an invariant violation.
    pub fn info(&self, id: ComponentId) -> Result<&ComponentInfo, RegistryError> {
        self.infos
            .get(id as usize)
            .ok_or(RegistryError::Unregistered { name: "<unknown id>" })
    }

    /// Number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` when no type has been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Builds one pool per registered type, each sized to `capacity` rows.
    pub(crate) fn build_pools(&self, capacity: usize) -> Vec<Box<dyn TypeErasedPool>> {
        self.factories.iter().map(|make| make(capacity)).collect()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity inline array component.
///
/// Holds up to `N` values of `T` directly in the component row. Pushing past
/// capacity returns the value back to the caller instead of spilling to the
/// heap.
#[derive(Clone, Debug)]
pub struct ComponentArray<T: Clone + Default + Send + Sync + 'static, const N: usize> {
    items: [T; N],
    len: usize,
}

impl<T: Clone + Default + Send + Sync + 'static, const N: usize> Default
    for ComponentArray<T, N>
{
    fn default() -> Self {
        Self { items: std::array::from_fn(|_| T::default()), len: 0 }
    }
}

impl<T: Clone + Default + Send + Sync + 'static, const N: usize> Component
    for ComponentArray<T, N>
{
    const ARRAY: bool = true;
}

impl<T: Clone + Default + Send + Sync + 'static, const N: usize> ComponentArray<T, N> {
    /// Appends a value; returns it back when the array is full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.len == N {
            return Err(value);
        }
        self.items[self.len] = value;
        self.len += 1;
        Ok(())
    }

    /// Returns the value at `index`, if occupied.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        (index < self.len).then(|| &self.items[index])
    }

    /// Iterates occupied slots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items[..self.len].iter()
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no slot is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resets every slot to the default image.
    pub fn clear(&mut self) {
        for item in &mut self.items[..self.len] {
            *item = T::default();
        }
        self.len = 0;
    }

    /// Removes the first slot equal to `value`, compacting the tail.
    pub fn remove_value(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        if let Some(at) = self.items[..self.len].iter().position(|v| v == value) {
            for i in at..self.len - 1 {
                self.items[i] = self.items[i + 1].clone();
            }
            self.len -= 1;
            self.items[self.len] = T::default();
            true
        } else {
            false
        }
    }
}

/// Parent link used by the entity hierarchy.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ChildOf(pub Entity);

impl Component for ChildOf {}

/// Child list used by the entity hierarchy.
pub type Children = ComponentArray<Entity, MAX_CHILDREN>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Mass(f64);
    impl Component for Mass {}

    #[derive(Clone, Default)]
    struct Tag;
    impl Component for Tag {}

    #[test]
    fn registration_is_idempotent_and_dense() {
        let mut reg = ComponentRegistry::new();
        let a = reg.register::<Mass>().unwrap();
        let b = reg.register::<Tag>().unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(reg.register::<Mass>().unwrap(), a);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.id_of::<Mass>().unwrap(), a);
        assert!(reg.info(b).unwrap().tag);
        assert!(!reg.info(a).unwrap().tag);
    }

    #[test]
    fn frozen_registry_rejects_new_types() {
        let mut reg = ComponentRegistry::new();
        let a = reg.register::<Mass>().unwrap();
        reg.freeze();
        assert_eq!(reg.register::<Mass>().unwrap(), a);
        assert!(matches!(
            reg.register::<Tag>(),
            Err(RegistryError::Frozen { .. })
        ));
    }

    #[test]
    fn component_array_push_get_clear() {
        let mut arr: ComponentArray<u32, 4> = ComponentArray::default();
        assert!(arr.is_empty());
        for v in 0..4 {
            arr.push(v).unwrap();
        }
        assert_eq!(arr.push(9), Err(9));
        assert_eq!(arr.len(), 4);
        assert_eq!(arr.get(2), Some(&2));
        assert_eq!(arr.get(4), None);
        assert!(arr.remove_value(&1));
        assert_eq!(arr.iter().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
        arr.clear();
        assert!(arr.is_empty());
    }
}
