//! # ECS Configuration
//!
//! Capacity limits for the ECS core.
//!
//! The mask width ([`MAX_COMPONENTS`]) is a compile-time constant because
//! [`EntityMask`](crate::ecs::EntityMask) is a fixed-width integer. The
//! entity capacity defaults to [`MAX_ENTITIES`] and may be overridden from a
//! TOML document loaded once at startup:
//!
//! ```toml
//! max_entities = 16384
//! ```

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Default maximum number of simultaneously live entities.
pub const MAX_ENTITIES: usize = 4096;

/// Maximum number of distinct component types (the entity mask width).
pub const MAX_COMPONENTS: usize = 32;

/// Runtime configuration for a [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EcsConfig {
    /// Maximum number of simultaneously live entities.
    ///
    /// Every component store pre-allocates this many slots.
    pub max_entities: usize,
}

impl EcsConfig {
    /// Creates a configuration with the given entity capacity.
    #[must_use]
    pub const fn with_max_entities(max_entities: usize) -> Self {
        Self { max_entities }
    }

    /// Parses and validates a configuration from a TOML document.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the document cannot be parsed
    /// or the values are out of range.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configured values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `max_entities` is zero or not
    /// below `u32::MAX`, which is reserved as the empty-slot marker of
    /// component stores.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_entities == 0 {
            return Err(EcsError::InvalidConfig(
                "max_entities must be greater than zero".to_owned(),
            ));
        }
        if self.max_entities >= u32::MAX as usize {
            return Err(EcsError::InvalidConfig(format!(
                "max_entities {} must be below {}",
                self.max_entities,
                u32::MAX
            )));
        }
        Ok(())
    }
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
        }
    }
}
