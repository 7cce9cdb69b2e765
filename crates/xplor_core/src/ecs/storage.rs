//! # Component Storage
//!
//! Pre-allocated, densely packed storage for a single component type.
//!
//! The storage keeps three fixed-size arrays:
//! - `components`: the packed values, active in `[0, len)`
//! - `entity_to_index`: entity ID -> slot holding that entity's value
//! - `index_to_entity`: slot -> entity owning the value
//!
//! Removal moves the last active value into the vacated slot, so the
//! active range never has holes. Slot indices are therefore not stable
//! across removals.
//!
//! ```text
//! remove(e1):   [v0 v1 v2 v3 | . .]      e1 -> 1, e3 -> 3
//!                     ^------'
//!               [v0 v3 v2 | . . .]       e3 -> 1
//! ```

use std::any::Any;

use bytemuck::Pod;

use crate::error::{EcsError, EcsResult};

use super::component::Component;
use super::entity::EntityId;

/// Marker stored in `entity_to_index` for entities without a value.
const NO_INDEX: u32 = u32::MAX;

/// Type-erased view of a [`ComponentStore`].
///
/// This is what the [`ComponentRegistry`](super::ComponentRegistry) holds,
/// so that it can keep stores of unrelated component types in one
/// collection and broadcast entity destruction to all of them. Typed
/// access goes through [`as_any`](Self::as_any) and a downcast back to the
/// concrete `ComponentStore<T>`.
pub trait AnyComponentStore: Any + Send + Sync {
    /// Drops the entity's value if it has one.
    ///
    /// # Returns
    ///
    /// `true` if a value was removed.
    fn on_entity_destroyed(&mut self, entity: EntityId) -> bool;

    /// Name of the stored component type.
    fn component_name(&self) -> &'static str;

    /// Upcast for downcasting to the concrete store.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete store.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Pre-allocated dense storage for a single component type.
///
/// This storage guarantees:
/// - Zero allocations after initialization
/// - O(1) add, remove and lookup by entity ID
/// - No gaps: the values of all `len()` holders are packed at the front
///
/// # Example
///
/// ```rust
/// use xplor_core::{ComponentStore, EntityId, Position};
///
/// let mut store: ComponentStore<Position> = ComponentStore::new(16);
/// store.add(EntityId::new(3), Position::new(1.0, 2.0, 3.0))?;
/// assert_eq!(store.get(EntityId::new(3))?.x, 1.0);
/// # Ok::<(), xplor_core::EcsError>(())
/// ```
pub struct ComponentStore<T: Component> {
    /// Packed component values.
    components: Box<[T]>,
    /// Slot of each entity's value, or `NO_INDEX`.
    entity_to_index: Box<[u32]>,
    /// Owner of each active slot.
    index_to_entity: Box<[EntityId]>,
    /// Number of active slots.
    active_size: usize,
}

impl<T: Component> ComponentStore<T> {
    /// Creates a store able to hold one value per entity for `capacity`
    /// entities.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or not below `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            capacity < NO_INDEX as usize,
            "Capacity must be less than u32::MAX"
        );

        Self {
            components: vec![T::default(); capacity].into_boxed_slice(),
            entity_to_index: vec![NO_INDEX; capacity].into_boxed_slice(),
            index_to_entity: vec![EntityId::new(0); capacity].into_boxed_slice(),
            active_size: 0,
        }
    }

    /// Returns the number of entities this store can serve.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.components.len()
    }

    /// Returns the number of entities currently holding a value.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.active_size
    }

    /// Checks whether no entity holds a value.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.active_size == 0
    }

    /// Checks whether the entity holds a value.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.index_of(entity).is_some()
    }

    /// Returns the slot currently holding the entity's value.
    #[inline]
    #[must_use]
    pub fn index_of(&self, entity: EntityId) -> Option<usize> {
        match self.entity_to_index.get(entity.as_usize()) {
            Some(&index) if index != NO_INDEX => Some(index as usize),
            _ => None,
        }
    }

    /// Returns the entity owning an active slot.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, index: usize) -> Option<EntityId> {
        self.entities().get(index).copied()
    }

    /// Appends a value for an entity at the end of the active range.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`] if the entity is not below
    /// capacity, or [`EcsError::ComponentAlreadyPresent`] if it already
    /// holds a value.
    pub fn add(&mut self, entity: EntityId, value: T) -> EcsResult<()> {
        let Some(&current) = self.entity_to_index.get(entity.as_usize()) else {
            return Err(EcsError::EntityOutOfRange {
                entity,
                capacity: self.capacity(),
            });
        };
        if current != NO_INDEX {
            return Err(EcsError::ComponentAlreadyPresent {
                entity,
                component: T::name(),
            });
        }

        // One value per in-range entity, so the active range cannot be full
        let index = self.active_size;
        self.components[index] = value;
        #[allow(clippy::cast_possible_truncation)]
        let slot = index as u32;
        self.entity_to_index[entity.as_usize()] = slot;
        self.index_to_entity[index] = entity;
        self.active_size += 1;
        Ok(())
    }

    /// Removes the entity's value, moving the last active value into its
    /// slot.
    ///
    /// # Returns
    ///
    /// The removed value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentMissing`] if the entity holds no value.
    pub fn remove(&mut self, entity: EntityId) -> EcsResult<T> {
        let index = self.index_of(entity).ok_or_else(|| Self::missing(entity))?;
        let last = self.active_size - 1;
        let removed = self.components[index];

        self.components[index] = self.components[last];
        let moved = self.index_to_entity[last];
        #[allow(clippy::cast_possible_truncation)]
        let slot = index as u32;
        self.entity_to_index[moved.as_usize()] = slot;
        self.index_to_entity[index] = moved;

        // When index == last, moved == entity and this clears it again
        self.entity_to_index[entity.as_usize()] = NO_INDEX;
        self.active_size = last;
        Ok(removed)
    }

    /// Gets the entity's value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentMissing`] if the entity holds no value.
    #[inline]
    pub fn get(&self, entity: EntityId) -> EcsResult<&T> {
        match self.index_of(entity) {
            Some(index) => Ok(&self.components[index]),
            None => Err(Self::missing(entity)),
        }
    }

    /// Gets the entity's value mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentMissing`] if the entity holds no value.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        match self.index_of(entity) {
            Some(index) => Ok(&mut self.components[index]),
            None => Err(Self::missing(entity)),
        }
    }

    /// Returns the packed active values.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.components[..self.active_size]
    }

    /// Returns the packed active values mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.components[..self.active_size]
    }

    /// Returns the owners of the packed values, slot for slot.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.index_to_entity[..self.active_size]
    }

    /// Iterates over `(owner, value)` pairs in slot order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities().iter().copied().zip(self.as_slice())
    }

    /// Iterates mutably over `(owner, value)` pairs in slot order.
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        let n = self.active_size;
        self.index_to_entity[..n]
            .iter()
            .copied()
            .zip(self.components[..n].iter_mut())
    }

    /// Removes every value.
    ///
    /// This is a **zero-allocation** operation.
    pub fn clear(&mut self) {
        for entity in &self.index_to_entity[..self.active_size] {
            self.entity_to_index[entity.as_usize()] = NO_INDEX;
        }
        self.active_size = 0;
    }

    fn missing(entity: EntityId) -> EcsError {
        EcsError::ComponentMissing {
            entity,
            component: T::name(),
        }
    }
}

impl<T: Component + Pod> ComponentStore<T> {
    /// Returns the packed active values as raw bytes, ready for upload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }
}

impl<T: Component> AnyComponentStore for ComponentStore<T> {
    fn on_entity_destroyed(&mut self, entity: EntityId) -> bool {
        if self.contains(entity) {
            self.remove(entity).is_ok()
        } else {
            false
        }
    }

    fn component_name(&self) -> &'static str {
        T::name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
