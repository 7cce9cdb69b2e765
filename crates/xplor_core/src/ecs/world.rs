//! # ECS World
//!
//! The coordinator tying the three managers together.
//!
//! Every mutation that affects more than one manager goes through here so
//! that stores, masks and system sets never drift apart:
//!
//! ```text
//! add_component     store.add ──> mask |= bit ──> systems.notify_mask_changed
//! remove_component  store.remove ──> mask &= !bit ──> systems.notify_mask_changed
//! delete_entity     components.notify ──> systems.notify ──> entities.delete
//! ```
//!
//! Each operation validates everything it needs before mutating anything,
//! so a returned error leaves the world unchanged.

use crate::config::{EcsConfig, MAX_ENTITIES};
use crate::error::EcsResult;

use super::component::{Component, ComponentTypeId};
use super::entity::{EntityId, EntityManager, EntityMask};
use super::registry::{ComponentRegistry, ComponentView};
use super::system::{EntitySet, System, SystemRegistry};

/// The ECS World - container for entities, components and systems.
///
/// All entity and component memory is pre-allocated at creation.
///
/// # Example
///
/// ```rust
/// use xplor_core::{EntityMask, Position, System, World};
///
/// #[derive(Default)]
/// struct Mover;
/// impl System for Mover {}
///
/// let mut world = World::with_capacity(64);
/// let position = world.register_component::<Position>()?;
/// world.register_system::<Mover>()?;
/// world.set_system_mask::<Mover>(EntityMask::EMPTY.with(position))?;
///
/// let e = world.create_entity()?;
/// world.add_component(e, Position::new(0.0, 0.0, 0.0))?;
/// assert!(world.system_entities::<Mover>()?.contains(&e));
/// # Ok::<(), xplor_core::EcsError>(())
/// ```
pub struct World {
    /// Entity ID space and masks.
    entities: EntityManager,
    /// Component stores.
    components: ComponentRegistry,
    /// Systems and their matching sets.
    systems: SystemRegistry,
}

impl World {
    /// Creates a world with the default capacity of [`MAX_ENTITIES`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }

    /// Creates a world for at most `capacity` simultaneously live entities.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or not below `u32::MAX`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        tracing::debug!(capacity, "creating world");
        Self {
            entities: EntityManager::new(capacity),
            components: ComponentRegistry::new(capacity),
            systems: SystemRegistry::new(),
        }
    }

    /// Creates a world from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`](crate::EcsError::InvalidConfig)
    /// if the configuration does not validate.
    pub fn from_config(config: &EcsConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::with_capacity(config.max_entities))
    }

    /// Returns the maximum number of simultaneously live entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Returns the number of currently live entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Returns the entity manager.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Returns the component registry.
    #[inline]
    #[must_use]
    pub const fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Returns the system registry.
    #[inline]
    #[must_use]
    pub const fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// The entity joins every system whose required mask is empty.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExceeded`](crate::EcsError::CapacityExceeded)
    /// if every entity ID is live.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        let id = self.entities.create_entity()?;
        self.systems.notify_mask_changed(id, EntityMask::EMPTY);
        Ok(id)
    }

    /// Deletes an entity, dropping its components and system memberships.
    ///
    /// # Returns
    ///
    /// `true` if the entity was deleted, `false` if it was already free.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`](crate::EcsError::EntityOutOfRange)
    /// if `id` is not below capacity.
    pub fn delete_entity(&mut self, id: EntityId) -> EcsResult<bool> {
        // Range check first so nothing is touched on error
        self.entities.mask(id)?;

        let removed = self.components.notify_entity_destroyed(id);
        self.systems.notify_entity_destroyed(id);
        let freed = self.entities.delete_entity(id)?;
        if freed {
            tracing::trace!(entity = id.index(), components = removed, "entity destroyed");
        }
        Ok(freed)
    }

    /// Checks whether an entity is currently live.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Returns an entity's component mask.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`](crate::EcsError::EntityOutOfRange)
    /// if `id` is not below capacity.
    pub fn mask(&self, id: EntityId) -> EcsResult<EntityMask> {
        self.entities.mask(id)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers a component type.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register`].
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        self.components.register::<T>()
    }

    /// Returns the component type ID assigned to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`](crate::EcsError::ComponentNotRegistered)
    /// if `T` was never registered.
    pub fn component_type_id<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.components.type_id::<T>()
    }

    /// Returns the mask with only `T`'s bit set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`](crate::EcsError::ComponentNotRegistered)
    /// if `T` was never registered.
    pub fn component_mask<T: Component>(&self) -> EcsResult<EntityMask> {
        Ok(EntityMask::EMPTY.with(self.component_type_id::<T>()?))
    }

    /// Attaches a component to a live entity.
    ///
    /// Stores the value, sets the entity's mask bit and updates every
    /// system's entity set.
    ///
    /// # Errors
    ///
    /// Fails if the entity is not live, `T` is not registered, or the entity
    /// already has a `T`.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<()> {
        self.entities.ensure_alive(entity)?;
        let type_id = self.components.type_id::<T>()?;

        self.components.add(entity, value)?;
        let mask = self.entities.mask(entity)?.with(type_id);
        self.entities.set_mask(entity, mask)?;
        self.systems.notify_mask_changed(entity, mask);

        tracing::trace!(entity = entity.index(), component = T::name(), "component added");
        Ok(())
    }

    /// Detaches a component from a live entity.
    ///
    /// Removes the value, clears the entity's mask bit and updates every
    /// system's entity set.
    ///
    /// # Returns
    ///
    /// The detached value.
    ///
    /// # Errors
    ///
    /// Fails if the entity is not live, `T` is not registered, or the entity
    /// has no `T`.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> EcsResult<T> {
        self.entities.ensure_alive(entity)?;
        let type_id = self.components.type_id::<T>()?;

        let value = self.components.remove::<T>(entity)?;
        let mask = self.entities.mask(entity)?.without(type_id);
        self.entities.set_mask(entity, mask)?;
        self.systems.notify_mask_changed(entity, mask);

        tracing::trace!(entity = entity.index(), component = T::name(), "component removed");
        Ok(value)
    }

    /// Gets an entity's component.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the entity has no `T`.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        self.components.get::<T>(entity)
    }

    /// Gets an entity's component mutably.
    ///
    /// # Errors
    ///
    /// Fails if `T` is not registered or the entity has no `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        self.components.get_mut::<T>(entity)
    }

    /// Checks whether an entity has a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`](crate::EcsError::ComponentNotRegistered)
    /// if `T` was never registered.
    pub fn has_component<T: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        self.components.contains::<T>(entity)
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Constructs and registers a default `S`.
    ///
    /// The new system requires no components, so it starts out matching
    /// every live entity.
    ///
    /// # Errors
    ///
    /// See [`SystemRegistry::register`].
    pub fn register_system<S: System + Default>(&mut self) -> EcsResult<&mut S> {
        self.insert_system(S::default())
    }

    /// Registers an already constructed system.
    ///
    /// # Errors
    ///
    /// See [`SystemRegistry::insert`].
    pub fn insert_system<S: System>(&mut self, system: S) -> EcsResult<&mut S> {
        self.systems.insert(system)?;
        self.systems.rebuild::<S, _>(self.entities.iter_alive())?;
        self.systems.get_mut::<S>()
    }

    /// Sets the component mask `S` requires and recomputes its entity set
    /// against every live entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`](crate::EcsError::SystemNotRegistered)
    /// if `S` was never registered.
    pub fn set_system_mask<S: System>(&mut self, mask: EntityMask) -> EcsResult<()> {
        self.systems.set_required_mask::<S>(mask)?;
        self.systems.rebuild::<S, _>(self.entities.iter_alive())
    }

    /// Returns the `S` instance.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`](crate::EcsError::SystemNotRegistered)
    /// if `S` was never registered.
    pub fn system<S: System>(&self) -> EcsResult<&S> {
        self.systems.get::<S>()
    }

    /// Returns the `S` instance mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`](crate::EcsError::SystemNotRegistered)
    /// if `S` was never registered.
    pub fn system_mut<S: System>(&mut self) -> EcsResult<&mut S> {
        self.systems.get_mut::<S>()
    }

    /// Returns the entities currently matching `S`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`](crate::EcsError::SystemNotRegistered)
    /// if `S` was never registered.
    pub fn system_entities<S: System>(&self) -> EcsResult<&EntitySet> {
        self.systems.entities::<S>()
    }

    /// Runs a closure as the body of system `S`.
    ///
    /// The closure receives the system instance, its matching entities and
    /// a [`ComponentView`] for reading and writing component values. The
    /// view cannot attach or detach components, so masks and entity sets
    /// stay as they were when the body started. The world does not
    /// schedule anything; this only hands out the borrows a system body
    /// needs.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`](crate::EcsError::SystemNotRegistered)
    /// if `S` was never registered.
    pub fn run_system<S, R, F>(&mut self, body: F) -> EcsResult<R>
    where
        S: System,
        F: FnOnce(&mut S, &EntitySet, &mut ComponentView<'_>) -> R,
    {
        let (system, entities) = self.systems.split_mut::<S>()?;
        let mut view = ComponentView::new(&mut self.components);
        Ok(body(system, entities, &mut view))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Position, Velocity};
    use crate::error::EcsError;

    #[derive(Default)]
    struct Mover {
        moved: usize,
    }
    impl System for Mover {}

    fn world_with_mover() -> World {
        let mut world = World::with_capacity(16);
        world.register_component::<Position>().unwrap();
        world.register_component::<Velocity>().unwrap();
        world.insert_system(Mover { moved: 0 }).unwrap();
        let mask = world.component_mask::<Position>().unwrap()
            | world.component_mask::<Velocity>().unwrap();
        world.set_system_mask::<Mover>(mask).unwrap();
        world
    }

    #[test]
    fn test_world_creation() {
        let world = World::new();
        assert_eq!(world.capacity(), MAX_ENTITIES);
        assert_eq!(world.alive_count(), 0);
    }

    #[test]
    fn test_from_config() {
        let world = World::from_config(&EcsConfig::with_max_entities(8)).unwrap();
        assert_eq!(world.capacity(), 8);
        assert!(World::from_config(&EcsConfig::with_max_entities(0)).is_err());
    }

    #[test]
    fn test_add_sets_mask_and_membership() {
        let mut world = world_with_mover();
        let e = world.create_entity().unwrap();

        world.add_component(e, Position::default()).unwrap();
        assert_eq!(world.mask(e).unwrap(), EntityMask::from_bits(0b01));
        assert!(world.system_entities::<Mover>().unwrap().is_empty());

        world.add_component(e, Velocity::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(world.mask(e).unwrap(), EntityMask::from_bits(0b11));
        assert!(world.system_entities::<Mover>().unwrap().contains(&e));

        let velocity = world.remove_component::<Velocity>(e).unwrap();
        assert_eq!(velocity.x, 1.0);
        assert_eq!(world.mask(e).unwrap(), EntityMask::from_bits(0b01));
        assert!(world.system_entities::<Mover>().unwrap().is_empty());
    }

    #[test]
    fn test_failed_add_leaves_state() {
        let mut world = world_with_mover();
        let e = world.create_entity().unwrap();
        world.add_component(e, Position::new(1.0, 0.0, 0.0)).unwrap();

        assert!(matches!(
            world.add_component(e, Position::new(2.0, 0.0, 0.0)),
            Err(EcsError::ComponentAlreadyPresent { .. })
        ));
        assert_eq!(world.get_component::<Position>(e).unwrap().x, 1.0);
        assert_eq!(world.mask(e).unwrap(), EntityMask::from_bits(0b01));
    }

    #[test]
    fn test_add_to_dead_entity() {
        let mut world = world_with_mover();
        let e = EntityId::new(3);
        assert_eq!(
            world.add_component(e, Position::default()),
            Err(EcsError::EntityNotAlive(e))
        );
        assert!(!world.has_component::<Position>(e).unwrap());
    }

    #[test]
    fn test_delete_fan_out() {
        let mut world = world_with_mover();
        let e = world.create_entity().unwrap();
        world.add_component(e, Position::default()).unwrap();
        world.add_component(e, Velocity::default()).unwrap();

        assert!(world.delete_entity(e).unwrap());
        assert!(!world.is_alive(e));
        assert!(!world.has_component::<Position>(e).unwrap());
        assert!(!world.has_component::<Velocity>(e).unwrap());
        assert!(world.system_entities::<Mover>().unwrap().is_empty());

        assert!(!world.delete_entity(e).unwrap());
        assert!(world.delete_entity(EntityId::new(16)).is_err());
    }

    #[test]
    fn test_late_system_sees_existing_entities() {
        let mut world = World::with_capacity(8);
        let a = world.create_entity().unwrap();
        let b = world.create_entity().unwrap();
        world.insert_system(Mover { moved: 0 }).unwrap();

        let matched: Vec<_> = world.system_entities::<Mover>().unwrap().iter().copied().collect();
        assert_eq!(matched, vec![a, b]);
    }

    #[test]
    fn test_set_system_mask_recomputes() {
        let mut world = world_with_mover();
        let a = world.create_entity().unwrap();
        let b = world.create_entity().unwrap();
        world.add_component(a, Position::default()).unwrap();
        world.add_component(b, Velocity::default()).unwrap();
        assert!(world.system_entities::<Mover>().unwrap().is_empty());

        let velocity_only = world.component_mask::<Velocity>().unwrap();
        world.set_system_mask::<Mover>(velocity_only).unwrap();

        let matched: Vec<_> = world.system_entities::<Mover>().unwrap().iter().copied().collect();
        assert_eq!(matched, vec![b]);
    }

    #[test]
    fn test_run_system() {
        let mut world = world_with_mover();
        for i in 0..3 {
            let e = world.create_entity().unwrap();
            world.add_component(e, Position::default()).unwrap();
            world.add_component(e, Velocity::new(i as f32, 1.0, 0.0)).unwrap();
        }

        world
            .run_system::<Mover, _, _>(|mover, entities, components| -> EcsResult<()> {
                for &e in entities {
                    let v = *components.get::<Velocity>(e)?;
                    let p = components.get_mut::<Position>(e)?;
                    p.x += v.x;
                    p.y += v.y;
                    mover.moved += 1;
                }
                Ok(())
            })
            .unwrap()
            .unwrap();

        assert_eq!(world.system::<Mover>().unwrap().moved, 3);
        let p = world.get_component::<Position>(EntityId::new(2)).unwrap();
        assert_eq!(*p, Position::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_run_system_keeps_membership() {
        let mut world = world_with_mover();
        let moving = world.create_entity().unwrap();
        let parked = world.create_entity().unwrap();
        world.add_component(moving, Position::default()).unwrap();
        world.add_component(moving, Velocity::new(1.0, 0.0, 0.0)).unwrap();
        world.add_component(parked, Position::default()).unwrap();

        let masks_before = [world.mask(moving).unwrap(), world.mask(parked).unwrap()];

        world
            .run_system::<Mover, _, _>(|_, entities, components| -> EcsResult<()> {
                assert!(components.contains::<Velocity>(moving)?);
                assert!(!components.contains::<Velocity>(parked)?);
                for p in components.values_mut::<Position>()? {
                    p.z = 5.0;
                }
                for (_, v) in components.iter_mut::<Velocity>()? {
                    v.x *= 2.0;
                }
                assert_eq!(components.store::<Position>()?.len(), 2);
                assert_eq!(entities.len(), 1);
                Ok(())
            })
            .unwrap()
            .unwrap();

        assert_eq!([world.mask(moving).unwrap(), world.mask(parked).unwrap()], masks_before);
        let matched: Vec<_> = world.system_entities::<Mover>().unwrap().iter().copied().collect();
        assert_eq!(matched, vec![moving]);
        assert_eq!(world.get_component::<Position>(parked).unwrap().z, 5.0);
        assert_eq!(world.get_component::<Velocity>(moving).unwrap().x, 2.0);

        // Structural changes still go through the world and stay consistent
        world.remove_component::<Velocity>(moving).unwrap();
        assert!(world.system_entities::<Mover>().unwrap().is_empty());
        assert!(world.delete_entity(parked).unwrap());
        assert!(!world.has_component::<Position>(parked).unwrap());
    }
}
