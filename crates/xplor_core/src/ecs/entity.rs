//! # Entity Management
//!
//! Entities are bare integer identifiers in `[0, capacity)`. IDs are
//! recycled first-in first-out: a deleted ID goes to the back of the free
//! queue, so it is handed out again only after every other free ID.
//!
//! Each entity slot carries an [`EntityMask`] recording which component
//! types are attached to it.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use crate::config::MAX_COMPONENTS;
use crate::error::{EcsError, EcsResult};

use super::component::ComponentTypeId;

/// Identifier of an entity.
///
/// IDs are recycled, so an `EntityId` is only meaningful while the entity
/// it was issued for is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an entity ID from a raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this entity.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize`, for addressing per-entity arrays.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bitmask of attached component types.
///
/// Bit `i` is set when the entity holds a component whose
/// [`ComponentTypeId`] is `i`. The width is [`MAX_COMPONENTS`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EntityMask(u32);

impl EntityMask {
    /// The mask with no bits set.
    pub const EMPTY: Self = Self(0);

    /// Creates a mask from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns a copy of this mask with the bit for `id` set.
    #[inline]
    #[must_use]
    pub const fn with(self, id: ComponentTypeId) -> Self {
        Self(self.0 | (1 << id.index()))
    }

    /// Returns a copy of this mask with the bit for `id` cleared.
    #[inline]
    #[must_use]
    pub const fn without(self, id: ComponentTypeId) -> Self {
        Self(self.0 & !(1 << id.index()))
    }

    /// Sets the bit for `id`.
    #[inline]
    pub fn set(&mut self, id: ComponentTypeId) {
        *self = self.with(id);
    }

    /// Clears the bit for `id`.
    #[inline]
    pub fn clear(&mut self, id: ComponentTypeId) {
        *self = self.without(id);
    }

    /// Checks whether the bit for `id` is set.
    #[inline]
    #[must_use]
    pub const fn has(self, id: ComponentTypeId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    /// Checks whether every bit of `required` is also set in `self`.
    ///
    /// This is the system membership test `(mask & required) == required`.
    /// The empty mask is satisfied by every mask.
    #[inline]
    #[must_use]
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Checks whether no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the number of set bits.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates over the component type IDs whose bits are set, lowest first.
    pub fn iter(self) -> impl Iterator<Item = ComponentTypeId> {
        (0..MAX_COMPONENTS as u8)
            .map(ComponentTypeId::new)
            .filter(move |&id| self.has(id))
    }
}

impl FromIterator<ComponentTypeId> for EntityMask {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl BitAnd for EntityMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for EntityMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Not for EntityMask {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Owner of the entity ID space.
///
/// Tracks which IDs are live, which are free, and the component mask of
/// every slot. All storage is allocated at construction.
///
/// The manager never touches component stores or system sets; deleting an
/// entity here only frees the ID. See [`World`](crate::World) for the full
/// destroy fan-out.
pub struct EntityManager {
    /// Free IDs in reuse order.
    free_ids: VecDeque<EntityId>,
    /// Component mask per entity slot.
    masks: Box<[EntityMask]>,
    /// Liveness flag per entity slot.
    alive: Box<[bool]>,
    /// Number of currently live entities.
    alive_count: usize,
}

impl EntityManager {
    /// Creates a manager for `capacity` entities with every ID free.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or not below `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            capacity < u32::MAX as usize,
            "Capacity must be less than u32::MAX"
        );

        #[allow(clippy::cast_possible_truncation)]
        let free_ids = (0..capacity as u32).map(EntityId::new).collect();

        Self {
            free_ids,
            masks: vec![EntityMask::EMPTY; capacity].into_boxed_slice(),
            alive: vec![false; capacity].into_boxed_slice(),
            alive_count: 0,
        }
    }

    /// Returns the maximum number of simultaneously live entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.masks.len()
    }

    /// Returns the number of currently live entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Takes the oldest free ID and marks it live.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExceeded`] if every ID is already live.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        let Some(id) = self.free_ids.pop_front() else {
            tracing::warn!(capacity = self.capacity(), "entity capacity exceeded");
            return Err(EcsError::CapacityExceeded {
                capacity: self.capacity(),
            });
        };

        self.alive[id.as_usize()] = true;
        self.alive_count += 1;
        tracing::trace!(entity = id.index(), "entity created");
        Ok(id)
    }

    /// Frees an entity ID, resetting its mask and queueing it for reuse.
    ///
    /// # Returns
    ///
    /// `true` if the entity was freed, `false` if it was already free.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`] if `id` is not below capacity.
    pub fn delete_entity(&mut self, id: EntityId) -> EcsResult<bool> {
        let idx = self.check_range(id)?;
        if !self.alive[idx] {
            return Ok(false);
        }

        self.masks[idx] = EntityMask::EMPTY;
        self.alive[idx] = false;
        self.alive_count -= 1;
        self.free_ids.push_back(id);
        tracing::trace!(entity = id.index(), "entity deleted");
        Ok(true)
    }

    /// Overwrites the component mask of a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`] or [`EcsError::EntityNotAlive`].
    pub fn set_mask(&mut self, id: EntityId, mask: EntityMask) -> EcsResult<()> {
        let idx = self.check_alive(id)?;
        self.masks[idx] = mask;
        Ok(())
    }

    /// Returns the component mask of an entity.
    ///
    /// Free entities always report [`EntityMask::EMPTY`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`] if `id` is not below capacity.
    pub fn mask(&self, id: EntityId) -> EcsResult<EntityMask> {
        let idx = self.check_range(id)?;
        Ok(self.masks[idx])
    }

    /// Checks whether an entity is currently live.
    ///
    /// Out-of-range IDs are never live.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.get(id.as_usize()).copied().unwrap_or(false)
    }

    /// Fails unless `id` names a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`] or [`EcsError::EntityNotAlive`].
    pub fn ensure_alive(&self, id: EntityId) -> EcsResult<()> {
        self.check_alive(id).map(|_| ())
    }

    /// Iterates over live entities and their masks, in ID order.
    pub fn iter_alive(&self) -> impl Iterator<Item = (EntityId, EntityMask)> + '_ {
        self.alive
            .iter()
            .zip(self.masks.iter())
            .enumerate()
            .filter(|(_, (alive, _))| **alive)
            .map(|(idx, (_, mask))| {
                #[allow(clippy::cast_possible_truncation)]
                let id = EntityId::new(idx as u32);
                (id, *mask)
            })
    }

    /// Returns the free IDs in the order they will be reused.
    pub fn free_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.free_ids.iter().copied()
    }

    fn check_range(&self, id: EntityId) -> EcsResult<usize> {
        let idx = id.as_usize();
        if idx >= self.capacity() {
            return Err(EcsError::EntityOutOfRange {
                entity: id,
                capacity: self.capacity(),
            });
        }
        Ok(idx)
    }

    fn check_alive(&self, id: EntityId) -> EcsResult<usize> {
        let idx = self.check_range(id)?;
        if !self.alive[idx] {
            return Err(EcsError::EntityNotAlive(id));
        }
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_bits() {
        let a = ComponentTypeId::new(0);
        let b = ComponentTypeId::new(5);

        let mut mask = EntityMask::EMPTY;
        assert!(!mask.has(b));

        mask.set(b);
        assert!(mask.has(b));
        assert!(!mask.has(a));
        assert_eq!(mask.bits(), 1 << 5);

        mask.clear(b);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_mask_contains() {
        let required: EntityMask = [ComponentTypeId::new(0), ComponentTypeId::new(2)]
            .into_iter()
            .collect();

        assert!(EntityMask::from_bits(0b111).contains(required));
        assert!(EntityMask::from_bits(0b101).contains(required));
        assert!(!EntityMask::from_bits(0b001).contains(required));
        assert!(EntityMask::EMPTY.contains(EntityMask::EMPTY));
        assert!(EntityMask::from_bits(0b1000).contains(EntityMask::EMPTY));
    }

    #[test]
    fn test_mask_iter() {
        let mask = EntityMask::from_bits(0b1000_0101);
        let ids: Vec<u8> = mask.iter().map(ComponentTypeId::index).collect();
        assert_eq!(ids, vec![0, 2, 7]);
        assert_eq!(mask.count(), 3);

        let top = EntityMask::EMPTY.with(ComponentTypeId::new(31));
        assert_eq!(top.iter().count(), 1);
    }

    #[test]
    fn test_create_sequential_ids() {
        let mut manager = EntityManager::new(4);
        for expected in 0..4 {
            assert_eq!(manager.create_entity().unwrap(), EntityId::new(expected));
        }
        assert_eq!(manager.alive_count(), 4);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut manager = EntityManager::new(2);
        manager.create_entity().unwrap();
        manager.create_entity().unwrap();
        assert_eq!(
            manager.create_entity(),
            Err(EcsError::CapacityExceeded { capacity: 2 })
        );
        assert_eq!(manager.alive_count(), 2);
    }

    #[test]
    fn test_fifo_recycling() {
        let mut manager = EntityManager::new(3);
        let e0 = manager.create_entity().unwrap();
        let _e1 = manager.create_entity().unwrap();

        assert!(manager.delete_entity(e0).unwrap());

        // e2 was already queued ahead of the recycled e0
        assert_eq!(manager.create_entity().unwrap(), EntityId::new(2));
        assert_eq!(manager.create_entity().unwrap(), e0);
    }

    #[test]
    fn test_delete_resets_mask() {
        let mut manager = EntityManager::new(4);
        let e = manager.create_entity().unwrap();
        manager.set_mask(e, EntityMask::from_bits(0b11)).unwrap();
        assert_eq!(manager.mask(e).unwrap(), EntityMask::from_bits(0b11));

        manager.delete_entity(e).unwrap();
        assert_eq!(manager.mask(e).unwrap(), EntityMask::EMPTY);
        assert!(!manager.is_alive(e));
    }

    #[test]
    fn test_delete_twice_is_noop() {
        let mut manager = EntityManager::new(4);
        let e = manager.create_entity().unwrap();

        assert!(manager.delete_entity(e).unwrap());
        assert!(!manager.delete_entity(e).unwrap());
        assert_eq!(manager.alive_count(), 0);
        assert_eq!(manager.free_ids().filter(|&id| id == e).count(), 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut manager = EntityManager::new(4);
        let bad = EntityId::new(4);

        assert_eq!(
            manager.delete_entity(bad),
            Err(EcsError::EntityOutOfRange {
                entity: bad,
                capacity: 4
            })
        );
        assert!(manager.mask(bad).is_err());
        assert!(!manager.is_alive(bad));
    }

    #[test]
    fn test_set_mask_on_free_entity() {
        let mut manager = EntityManager::new(4);
        let e = EntityId::new(1);
        assert_eq!(
            manager.set_mask(e, EntityMask::from_bits(1)),
            Err(EcsError::EntityNotAlive(e))
        );
    }

    #[test]
    fn test_iter_alive() {
        let mut manager = EntityManager::new(8);
        let e0 = manager.create_entity().unwrap();
        let e1 = manager.create_entity().unwrap();
        let e2 = manager.create_entity().unwrap();
        manager.set_mask(e2, EntityMask::from_bits(4)).unwrap();
        manager.delete_entity(e1).unwrap();

        let alive: Vec<_> = manager.iter_alive().collect();
        assert_eq!(
            alive,
            vec![(e0, EntityMask::EMPTY), (e2, EntityMask::from_bits(4))]
        );
    }
}
