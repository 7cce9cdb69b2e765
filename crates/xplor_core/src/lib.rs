//! # Xplor Core Engine
//!
//! Entity Component System (ECS) core of the Xplor engine:
//! - Entity identity with first-in first-out ID recycling
//! - Dense, pre-allocated component storage with O(1) add/remove/lookup
//! - Systems whose entity sets track component masks incrementally
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in hot path** - Entity and component memory is pre-allocated
//! 2. **Data-oriented design** - Components are stored in contiguous arrays
//! 3. **No silent corruption** - Every broken precondition is an [`EcsError`]
//!
//! ## Example
//!
//! ```rust
//! use xplor_core::{Position, Velocity, World};
//!
//! let mut world = World::with_capacity(1024);
//! world.register_component::<Position>()?;
//! world.register_component::<Velocity>()?;
//!
//! let e = world.create_entity()?;
//! world.add_component(e, Position::new(0.0, 0.0, 0.0))?;
//! world.add_component(e, Velocity::new(1.0, 0.0, 0.0))?;
//! assert!(world.has_component::<Velocity>(e)?);
//! # Ok::<(), xplor_core::EcsError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::{EcsConfig, MAX_COMPONENTS, MAX_ENTITIES};
pub use ecs::{
    AnyComponentStore, Component, ComponentRegistry, ComponentStore, ComponentTypeId,
    ComponentView, EntityId, EntityManager, EntityMask, EntitySet, Position, System,
    SystemRegistry, Transform, Velocity, World,
};
pub use error::{EcsError, EcsResult};
