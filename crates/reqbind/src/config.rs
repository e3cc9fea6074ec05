//! Binder configuration.
//!
//! [`BindConfig`] deserializes with unknown fields rejected, so it can be
//! embedded as a section of an application config file:
//!
//! ```toml
//! [binding]
//! max_memory = 8388608
//! zero_policy = "preserve"
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default in-memory budget for multipart file parts (32 MiB).
pub const DEFAULT_MAX_MEMORY: u64 = 32 << 20;

/// Extra budget for non-file multipart values on top of `max_memory`.
pub const VALUE_MEMORY_ALLOWANCE: u64 = 10 << 20;

/// Errors from validating a [`BindConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value the binder cannot use.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: &'static str,
        /// Why the value is invalid.
        reason: String,
    },
}

/// What happens to a tagged field before its source is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroPolicy {
    /// Reset the field to its zero value first. An absent or empty source
    /// value leaves the field zeroed.
    #[default]
    Reset,
    /// Keep the caller's value unless the source supplies a non-empty one.
    Preserve,
}

/// Binder configuration.
///
/// # Example
///
/// ```rust
/// use reqbind::{BindConfig, ZeroPolicy};
///
/// let config = BindConfig::default()
///     .with_max_memory(1 << 20)
///     .with_zero_policy(ZeroPolicy::Preserve);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_memory, 1 << 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindConfig {
    /// Bytes of multipart file content kept in memory before parts are
    /// spooled to temporary files.
    #[serde(default = "default_max_memory")]
    pub max_memory: u64,

    /// Field reset behavior.
    #[serde(default)]
    pub zero_policy: ZeroPolicy,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            max_memory: default_max_memory(),
            zero_policy: ZeroPolicy::default(),
        }
    }
}

fn default_max_memory() -> u64 {
    DEFAULT_MAX_MEMORY
}

impl BindConfig {
    /// Sets the multipart memory budget.
    #[must_use]
    pub fn with_max_memory(mut self, max_memory: u64) -> Self {
        self.max_memory = max_memory;
        self
    }

    /// Sets the zero policy.
    #[must_use]
    pub fn with_zero_policy(mut self, zero_policy: ZeroPolicy) -> Self {
        self.zero_policy = zero_policy;
        self
    }

    /// Total bytes non-file multipart values may occupy.
    #[must_use]
    pub fn value_memory_limit(&self) -> u64 {
        self.max_memory.saturating_add(VALUE_MEMORY_ALLOWANCE)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `max_memory` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_memory == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_memory",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
