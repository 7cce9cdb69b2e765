//! # Component System
//!
//! Components are pure data containers with no behavior. The core never
//! inspects their contents; it only stores them densely and tracks which
//! entity owns which value.
//!
//! Component type identities are assigned at registration time by the
//! [`ComponentRegistry`](super::ComponentRegistry), starting at 0.

use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Copy`: stores move values by bitwise copy during swap-removal
/// - `Default`: every store slot is pre-filled at construction
/// - `Send + Sync + 'static`: stores are held behind type-erased handles
///
/// # Example
///
/// ```rust
/// use xplor_core::Component;
///
/// #[derive(Clone, Copy, Default)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
/// ```
pub trait Component: Copy + Default + Send + Sync + 'static {
    /// Human-readable name of this component type, used in errors and logs.
    #[must_use]
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Small integer identity of a registered component type.
///
/// Assigned once per type in registration order, never reused. The value
/// is the bit position of the type in an [`EntityMask`](super::EntityMask).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentTypeId(u8);

impl ComponentTypeId {
    /// Creates a component type ID from a raw bit index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below
    /// [`MAX_COMPONENTS`](crate::config::MAX_COMPONENTS), the bit width of an
    /// [`EntityMask`](super::EntityMask).
    #[inline]
    #[must_use]
    pub const fn new(index: u8) -> Self {
        assert!(
            (index as usize) < crate::config::MAX_COMPONENTS,
            "Component type index must be below MAX_COMPONENTS"
        );
        Self(index)
    }

    /// Returns the raw bit index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// World-space transform of an entity, as a column-major 4x4 model matrix.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Transform {
    /// Model matrix columns.
    pub model: [[f32; 4]; 4],
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        model: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a pure translation.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f32, y: f32, z: f32) -> Self {
        let mut t = Self::IDENTITY;
        t.model[3] = [x, y, z, 1.0];
        t
    }

    /// Returns the translation part of the matrix.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> [f32; 3] {
        [self.model[3][0], self.model[3][1], self.model[3][2]]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {
    fn name() -> &'static str {
        "Transform"
    }
}

/// Position component for entities.
///
/// Represents a 3D position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// X coordinate in world space.
    pub x: f32,
    /// Y coordinate in world space.
    pub y: f32,
    /// Z coordinate in world space.
    pub z: f32,
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns the squared distance to another position.
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

impl Component for Position {
    fn name() -> &'static str {
        "Position"
    }
}

/// Velocity component for entities.
///
/// Represents movement speed in world units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    /// X velocity component.
    pub x: f32,
    /// Y velocity component.
    pub y: f32,
    /// Z velocity component.
    pub z: f32,
}

impl Velocity {
    /// Creates a new velocity.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Component for Velocity {
    fn name() -> &'static str {
        "Velocity"
    }
}
