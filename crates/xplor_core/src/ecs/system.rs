//! # System Registry
//!
//! Owns one instance of every registered system type, the component mask
//! it requires, and the set of entities currently satisfying that mask.
//!
//! Membership is maintained incrementally: every time an entity's mask
//! changes the caller reports the new mask through
//! [`SystemRegistry::notify_mask_changed`], and each system's set is
//! updated with a single mask comparison. Nothing ever rescans the entity
//! population except [`SystemRegistry::rebuild`], which is explicit.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};

use crate::error::{EcsError, EcsResult};

use super::entity::{EntityId, EntityMask};

/// Entities matched by a system, in ID order.
pub type EntitySet = BTreeSet<EntityId>;

/// Marker trait for ECS systems.
///
/// A system is any state that wants to process the entities holding a
/// particular set of components. The registry never runs systems; it only
/// keeps their entity sets current.
///
/// # Example
///
/// ```rust
/// use xplor_core::System;
///
/// #[derive(Default)]
/// struct RenderQueue {
///     draws: usize,
/// }
///
/// impl System for RenderQueue {}
/// ```
pub trait System: Any + Send + Sync {
    /// Human-readable name of this system type, used in errors and logs.
    #[must_use]
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Registration record of one system.
struct SystemEntry {
    /// System name for logs.
    name: &'static str,
    /// Components an entity must hold to match.
    required: EntityMask,
    /// Entities currently matching `required`.
    entities: EntitySet,
    /// The system instance.
    instance: Box<dyn Any + Send + Sync>,
}

impl SystemEntry {
    /// Inserts or removes `entity` according to `mask`.
    ///
    /// Returns `true` if membership changed.
    #[inline]
    fn update(&mut self, entity: EntityId, mask: EntityMask) -> bool {
        if mask.contains(self.required) {
            self.entities.insert(entity)
        } else {
            self.entities.remove(&entity)
        }
    }
}

/// Registry of systems and their matching entity sets.
#[derive(Default)]
pub struct SystemRegistry {
    /// Rust type -> slot in `entries`.
    indices: HashMap<TypeId, usize>,
    /// Systems in registration order.
    entries: Vec<SystemEntry>,
}

impl SystemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered systems.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether no system is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks whether `S` is registered.
    #[inline]
    #[must_use]
    pub fn is_registered<S: System>(&self) -> bool {
        self.indices.contains_key(&TypeId::of::<S>())
    }

    /// Constructs and registers a default `S`.
    ///
    /// The system starts with an empty required mask and no entities.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemAlreadyRegistered`] if `S` is already
    /// registered.
    pub fn register<S: System + Default>(&mut self) -> EcsResult<&mut S> {
        self.insert(S::default())
    }

    /// Registers an already constructed system.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemAlreadyRegistered`] if `S` is already
    /// registered.
    pub fn insert<S: System>(&mut self, system: S) -> EcsResult<&mut S> {
        let key = TypeId::of::<S>();
        if self.indices.contains_key(&key) {
            return Err(EcsError::SystemAlreadyRegistered(S::name()));
        }

        let slot = self.entries.len();
        self.indices.insert(key, slot);
        self.entries.push(SystemEntry {
            name: S::name(),
            required: EntityMask::EMPTY,
            entities: EntitySet::new(),
            instance: Box::new(system),
        });
        tracing::debug!(system = S::name(), "system registered");

        self.get_mut::<S>()
    }

    /// Replaces the component mask `S` requires.
    ///
    /// Membership is **not** recomputed here: entities are re-evaluated
    /// against the new mask only when their own mask next changes. Call
    /// [`rebuild`](Self::rebuild) to bring the set up to date immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` was never
    /// registered.
    pub fn set_required_mask<S: System>(&mut self, mask: EntityMask) -> EcsResult<()> {
        let entry = self.entry_mut::<S>()?;
        entry.required = mask;
        tracing::debug!(system = entry.name, mask = mask.bits(), "system mask set");
        Ok(())
    }

    /// Returns the component mask `S` requires.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` was never
    /// registered.
    pub fn required_mask<S: System>(&self) -> EcsResult<EntityMask> {
        Ok(self.entry::<S>()?.required)
    }

    /// Recomputes the entity set of `S` from scratch.
    ///
    /// # Arguments
    ///
    /// * `entities` - Every live entity with its current mask
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` was never
    /// registered.
    pub fn rebuild<S, I>(&mut self, entities: I) -> EcsResult<()>
    where
        S: System,
        I: IntoIterator<Item = (EntityId, EntityMask)>,
    {
        let entry = self.entry_mut::<S>()?;
        let required = entry.required;
        entry.entities = entities
            .into_iter()
            .filter(|(_, mask)| mask.contains(required))
            .map(|(entity, _)| entity)
            .collect();
        tracing::debug!(
            system = entry.name,
            matched = entry.entities.len(),
            "system entities rebuilt"
        );
        Ok(())
    }

    /// Re-evaluates one entity against every system after its mask changed.
    ///
    /// The entity joins each system whose required mask is a subset of
    /// `mask` and leaves every other system.
    pub fn notify_mask_changed(&mut self, entity: EntityId, mask: EntityMask) {
        for entry in &mut self.entries {
            if entry.update(entity, mask) {
                tracing::trace!(
                    system = entry.name,
                    entity = entity.index(),
                    matched = entry.entities.contains(&entity),
                    "system membership changed"
                );
            }
        }
    }

    /// Removes a destroyed entity from every system.
    ///
    /// Calling this for an entity no system holds is a no-op.
    pub fn notify_entity_destroyed(&mut self, entity: EntityId) {
        for entry in &mut self.entries {
            entry.entities.remove(&entity);
        }
    }

    /// Returns the entities currently matching `S`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` was never
    /// registered.
    pub fn entities<S: System>(&self) -> EcsResult<&EntitySet> {
        Ok(&self.entry::<S>()?.entities)
    }

    /// Returns the `S` instance.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` was never
    /// registered.
    pub fn get<S: System>(&self) -> EcsResult<&S> {
        self.entry::<S>()?
            .instance
            .downcast_ref::<S>()
            .ok_or(EcsError::SystemNotRegistered(S::name()))
    }

    /// Returns the `S` instance mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` was never
    /// registered.
    pub fn get_mut<S: System>(&mut self) -> EcsResult<&mut S> {
        self.entry_mut::<S>()?
            .instance
            .downcast_mut::<S>()
            .ok_or(EcsError::SystemNotRegistered(S::name()))
    }

    /// Returns the `S` instance mutably together with its entities.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` was never
    /// registered.
    pub fn split_mut<S: System>(&mut self) -> EcsResult<(&mut S, &EntitySet)> {
        let entry = self.entry_mut::<S>()?;
        let system = entry
            .instance
            .downcast_mut::<S>()
            .ok_or(EcsError::SystemNotRegistered(S::name()))?;
        Ok((system, &entry.entities))
    }

    fn entry<S: System>(&self) -> EcsResult<&SystemEntry> {
        self.indices
            .get(&TypeId::of::<S>())
            .map(|&slot| &self.entries[slot])
            .ok_or(EcsError::SystemNotRegistered(S::name()))
    }

    fn entry_mut<S: System>(&mut self) -> EcsResult<&mut SystemEntry> {
        match self.indices.get(&TypeId::of::<S>()) {
            Some(&slot) => Ok(&mut self.entries[slot]),
            None => Err(EcsError::SystemNotRegistered(S::name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Mover {
        ticks: u32,
    }
    impl System for Mover {}

    #[derive(Default)]
    struct Renderer;
    impl System for Renderer {}

    fn e(index: u32) -> EntityId {
        EntityId::new(index)
    }

    fn set(ids: &[u32]) -> EntitySet {
        ids.iter().copied().map(EntityId::new).collect()
    }

    #[test]
    fn test_register_starts_empty() {
        let mut systems = SystemRegistry::new();
        systems.register::<Mover>().unwrap().ticks = 3;

        assert_eq!(systems.get::<Mover>().unwrap().ticks, 3);
        assert_eq!(systems.required_mask::<Mover>().unwrap(), EntityMask::EMPTY);
        assert!(systems.entities::<Mover>().unwrap().is_empty());
    }

    #[test]
    fn test_double_registration() {
        let mut systems = SystemRegistry::new();
        systems.register::<Mover>().unwrap();
        assert!(matches!(
            systems.register::<Mover>(),
            Err(EcsError::SystemAlreadyRegistered(_))
        ));
        assert_eq!(systems.len(), 1);
    }

    #[test]
    fn test_unregistered_system() {
        let mut systems = SystemRegistry::new();
        assert!(matches!(
            systems.entities::<Renderer>(),
            Err(EcsError::SystemNotRegistered(_))
        ));
        assert!(systems.set_required_mask::<Renderer>(EntityMask::EMPTY).is_err());
        assert!(systems.get_mut::<Renderer>().is_err());
    }

    #[test]
    fn test_mask_change_membership() {
        let mut systems = SystemRegistry::new();
        systems.insert(Mover { ticks: 0 }).unwrap();
        systems.insert(Renderer).unwrap();
        systems.set_required_mask::<Mover>(EntityMask::from_bits(0b011)).unwrap();
        systems.set_required_mask::<Renderer>(EntityMask::from_bits(0b100)).unwrap();

        systems.notify_mask_changed(e(0), EntityMask::from_bits(0b001));
        systems.notify_mask_changed(e(1), EntityMask::from_bits(0b111));
        systems.notify_mask_changed(e(2), EntityMask::from_bits(0b110));

        assert_eq!(systems.entities::<Mover>().unwrap(), &set(&[1]));
        assert_eq!(systems.entities::<Renderer>().unwrap(), &set(&[1, 2]));

        systems.notify_mask_changed(e(1), EntityMask::from_bits(0b100));
        assert!(systems.entities::<Mover>().unwrap().is_empty());
        assert_eq!(systems.entities::<Renderer>().unwrap(), &set(&[1, 2]));
    }

    #[test]
    fn test_empty_mask_matches_everything() {
        let mut systems = SystemRegistry::new();
        systems.register::<Renderer>().unwrap();

        systems.notify_mask_changed(e(4), EntityMask::EMPTY);
        assert_eq!(systems.entities::<Renderer>().unwrap(), &set(&[4]));
    }

    #[test]
    fn test_set_mask_is_not_retroactive() {
        let mut systems = SystemRegistry::new();
        systems.register::<Mover>().unwrap();
        systems.notify_mask_changed(e(0), EntityMask::from_bits(0b01));
        assert_eq!(systems.entities::<Mover>().unwrap(), &set(&[0]));

        systems.set_required_mask::<Mover>(EntityMask::from_bits(0b10)).unwrap();
        assert_eq!(systems.entities::<Mover>().unwrap(), &set(&[0]));

        systems
            .rebuild::<Mover, _>([
                (e(0), EntityMask::from_bits(0b01)),
                (e(1), EntityMask::from_bits(0b11)),
            ])
            .unwrap();
        assert_eq!(systems.entities::<Mover>().unwrap(), &set(&[1]));
    }

    #[test]
    fn test_entity_destroyed() {
        let mut systems = SystemRegistry::new();
        systems.register::<Mover>().unwrap();
        systems.register::<Renderer>().unwrap();
        systems.notify_mask_changed(e(7), EntityMask::from_bits(1));

        systems.notify_entity_destroyed(e(7));
        systems.notify_entity_destroyed(e(7));
        assert!(systems.entities::<Mover>().unwrap().is_empty());
        assert!(systems.entities::<Renderer>().unwrap().is_empty());
    }

    #[test]
    fn test_split_mut() {
        let mut systems = SystemRegistry::new();
        systems.register::<Mover>().unwrap();
        systems.notify_mask_changed(e(1), EntityMask::EMPTY);
        systems.notify_mask_changed(e(2), EntityMask::EMPTY);

        let (mover, entities) = systems.split_mut::<Mover>().unwrap();
        mover.ticks += u32::try_from(entities.len()).unwrap();
        assert_eq!(systems.get::<Mover>().unwrap().ticks, 2);
    }
}
