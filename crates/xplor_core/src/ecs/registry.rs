//! # Component Registry
//!
//! Owns one [`ComponentStore`] per registered component type.
//!
//! Each type gets a [`ComponentTypeId`] at registration, counting up from 0
//! in registration order. Stores are kept behind the
//! [`AnyComponentStore`] trait so that unrelated component types share a
//! single collection; the generic accessors downcast back to the concrete
//! store, which they know statically.
//!
//! The registry does not touch entity masks. Keeping masks and system
//! membership in step with the stores is the caller's job (see
//! [`World`](crate::World)). System bodies get a [`ComponentView`]
//! instead, which can change values but not which entities hold them.

use std::any::TypeId;
use std::collections::HashMap;

use crate::config::MAX_COMPONENTS;
use crate::error::{EcsError, EcsResult};

use super::component::{Component, ComponentTypeId};
use super::entity::EntityId;
use super::storage::{AnyComponentStore, ComponentStore};

/// Registry of component types and their stores.
pub struct ComponentRegistry {
    /// Entity capacity of every store.
    capacity: usize,
    /// Rust type -> assigned component type ID.
    type_ids: HashMap<TypeId, ComponentTypeId>,
    /// Stores indexed by component type ID.
    stores: Vec<Box<dyn AnyComponentStore>>,
}

impl ComponentRegistry {
    /// Creates an empty registry whose stores serve `capacity` entities.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            capacity,
            type_ids: HashMap::with_capacity(MAX_COMPONENTS),
            stores: Vec::with_capacity(MAX_COMPONENTS),
        }
    }

    /// Returns the entity capacity of every store.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Checks whether no component type is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Registers a component type and allocates its store.
    ///
    /// # Returns
    ///
    /// The newly assigned component type ID.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentAlreadyRegistered`] if `T` is already
    /// registered, or [`EcsError::ComponentTypeLimit`] if every mask bit is
    /// taken.
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        let key = TypeId::of::<T>();
        if self.type_ids.contains_key(&key) {
            return Err(EcsError::ComponentAlreadyRegistered(T::name()));
        }
        if self.stores.len() >= MAX_COMPONENTS {
            return Err(EcsError::ComponentTypeLimit {
                limit: MAX_COMPONENTS,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = ComponentTypeId::new(self.stores.len() as u8);
        self.type_ids.insert(key, id);
        self.stores.push(Box::new(ComponentStore::<T>::new(self.capacity)));

        tracing::debug!(component = T::name(), id = id.index(), "component type registered");
        Ok(id)
    }

    /// Checks whether `T` is registered.
    #[inline]
    #[must_use]
    pub fn is_registered<T: Component>(&self) -> bool {
        self.type_ids.contains_key(&TypeId::of::<T>())
    }

    /// Returns the component type ID assigned to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` was never
    /// registered.
    #[inline]
    pub fn type_id<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.type_ids
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::ComponentNotRegistered(T::name()))
    }

    /// Returns the store for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` was never
    /// registered.
    pub fn store<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        let id = self.type_id::<T>()?;
        self.stores[usize::from(id.index())]
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
            .ok_or(EcsError::ComponentNotRegistered(T::name()))
    }

    /// Returns the store for `T` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` was never
    /// registered.
    pub fn store_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentStore<T>> {
        let id = self.type_id::<T>()?;
        self.stores[usize::from(id.index())]
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or(EcsError::ComponentNotRegistered(T::name()))
    }

    /// Adds a `T` value for an entity.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the store rejects the value (see
    /// [`ComponentStore::add`]).
    pub fn add<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<()> {
        self.store_mut::<T>()?.add(entity, value)
    }

    /// Removes the entity's `T` value.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the entity has no `T`.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> EcsResult<T> {
        self.store_mut::<T>()?.remove(entity)
    }

    /// Gets the entity's `T` value.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the entity has no `T`.
    pub fn get<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        self.store::<T>()?.get(entity)
    }

    /// Gets the entity's `T` value mutably.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the entity has no `T`.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        self.store_mut::<T>()?.get_mut(entity)
    }

    /// Checks whether the entity has a `T` value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` was never
    /// registered.
    pub fn contains<T: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        Ok(self.store::<T>()?.contains(entity))
    }

    /// Removes the entity's value from every store that has one.
    ///
    /// # Returns
    ///
    /// The number of values removed. Calling this again for the same
    /// entity removes nothing.
    pub fn notify_entity_destroyed(&mut self, entity: EntityId) -> usize {
        self.stores
            .iter_mut()
            .map(|store| store.on_entity_destroyed(entity))
            .filter(|&removed| removed)
            .count()
    }

    /// Iterates over registered component types in ID order.
    pub fn registered(&self) -> impl Iterator<Item = (ComponentTypeId, &'static str)> + '_ {
        self.stores.iter().enumerate().map(|(index, store)| {
            #[allow(clippy::cast_possible_truncation)]
            let id = ComponentTypeId::new(index as u8);
            (id, store.component_name())
        })
    }
}

/// Value-level access to the component stores, handed to system bodies.
///
/// Reads and in-place writes only. Attaching, detaching and destroying
/// have to go through [`World`](crate::World) so that masks and system
/// sets follow, and none of them is reachable from here:
///
/// ```compile_fail
/// use xplor_core::{EntityId, Position, System, World};
///
/// struct Mover;
/// impl System for Mover {}
///
/// let mut world = World::with_capacity(4);
/// world.register_component::<Position>().unwrap();
/// world.insert_system(Mover).unwrap();
/// world
///     .run_system::<Mover, _, _>(|_, _, components| {
///         components.remove::<Position>(EntityId::new(0))
///     })
///     .unwrap();
/// ```
pub struct ComponentView<'a> {
    registry: &'a mut ComponentRegistry,
}

impl<'a> ComponentView<'a> {
    pub(crate) fn new(registry: &'a mut ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Gets the entity's `T` value.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the entity has no `T`.
    #[inline]
    pub fn get<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        self.registry.get::<T>(entity)
    }

    /// Gets the entity's `T` value mutably.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the entity has no `T`.
    #[inline]
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        self.registry.get_mut::<T>(entity)
    }

    /// Checks whether the entity has a `T` value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` was never
    /// registered.
    #[inline]
    pub fn contains<T: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        self.registry.contains::<T>(entity)
    }

    /// Returns the store for `T`, read-only.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` was never
    /// registered.
    #[inline]
    pub fn store<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        self.registry.store::<T>()
    }

    /// Returns every stored `T` value as a dense mutable slice.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` was never
    /// registered.
    #[inline]
    pub fn values_mut<T: Component>(&mut self) -> EcsResult<&mut [T]> {
        Ok(self.registry.store_mut::<T>()?.as_mut_slice())
    }

    /// Iterates over `(entity, &mut value)` pairs of the `T` store.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` was never
    /// registered.
    pub fn iter_mut<T: Component>(
        &mut self,
    ) -> EcsResult<impl Iterator<Item = (EntityId, &mut T)> + '_> {
        Ok(self.registry.store_mut::<T>()?.iter_mut())
    }
}
