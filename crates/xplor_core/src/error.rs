//! # ECS Error Types
//!
//! Every precondition the ECS core checks is reported through [`EcsError`].
//! None of these are transient: they all indicate a caller bug, and no
//! operation mutates state before returning one of them.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the ECS core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Every entity ID is already live.
    #[error("entity capacity exceeded: all {capacity} entity ids are live")]
    CapacityExceeded {
        /// Maximum number of simultaneously live entities.
        capacity: usize,
    },

    /// The entity ID lies outside `[0, capacity)`.
    #[error("entity {entity} is out of range (capacity {capacity})")]
    EntityOutOfRange {
        /// The offending entity.
        entity: EntityId,
        /// Maximum number of simultaneously live entities.
        capacity: usize,
    },

    /// The entity ID is in range but currently free.
    #[error("entity {0} is not alive")]
    EntityNotAlive(EntityId),

    /// `register_component` was called twice for the same type.
    #[error("component type already registered: {0}")]
    ComponentAlreadyRegistered(&'static str),

    /// The component type was never registered.
    #[error("component type not registered: {0}")]
    ComponentNotRegistered(&'static str),

    /// No bit left in the entity mask for another component type.
    #[error("component type limit reached: at most {limit} component types")]
    ComponentTypeLimit {
        /// Width of the entity mask.
        limit: usize,
    },

    /// The entity holds no value in this component store.
    #[error("entity {entity} has no {component} component")]
    ComponentMissing {
        /// The entity that was queried.
        entity: EntityId,
        /// Name of the component type.
        component: &'static str,
    },

    /// The entity already holds a value in this component store.
    #[error("entity {entity} already has a {component} component")]
    ComponentAlreadyPresent {
        /// The entity that was written.
        entity: EntityId,
        /// Name of the component type.
        component: &'static str,
    },

    /// `register_system` was called twice for the same type.
    #[error("system type already registered: {0}")]
    SystemAlreadyRegistered(&'static str),

    /// The system type was never registered.
    #[error("system type not registered: {0}")]
    SystemNotRegistered(&'static str),

    /// Invalid configuration document or values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
