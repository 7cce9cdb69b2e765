//! # Entity Component System
//!
//! A fixed-capacity ECS built from four parts:
//!
//! - [`EntityManager`]: entity ID allocation, recycling and masks
//! - [`ComponentStore`]: dense per-type component storage
//! - [`ComponentRegistry`]: type IDs and type-erased stores
//! - [`SystemRegistry`]: systems and their matching entity sets
//!
//! [`World`] drives all four so that they stay consistent.
//!
//! ## Design Philosophy
//!
//! - All entity and component storage is pre-allocated at creation
//! - Components are stored in dense arrays for cache efficiency
//! - Entity IDs are plain indices, recycled first-in first-out
//! - Dynamic dispatch only where heterogeneous stores must be visited

mod component;
mod entity;
mod registry;
mod storage;
mod system;
mod world;

pub use component::{Component, ComponentTypeId, Position, Transform, Velocity};
pub use entity::{EntityId, EntityManager, EntityMask};
pub use registry::{ComponentRegistry, ComponentView};
pub use storage::{AnyComponentStore, ComponentStore};
pub use system::{EntitySet, System, SystemRegistry};
pub use world::World;
