//! Configuration for the storage layer.
//!
//! Embedders tune element-store transitions and the buffer allocation ceiling
//! here. Everything has a default, so a partial JSON document is enough.

use serde::Deserialize;

use crate::elements::TransitionPolicy;
use crate::error::{StorageError, StorageResult};

/// Largest buffer the default configuration will allocate (2 GiB)
pub const DEFAULT_MAX_BYTE_LENGTH: usize = 2 * 1024 * 1024 * 1024;

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Dense/sparse switching thresholds.
    pub transition: TransitionPolicy,

    /// Largest byte length a buffer may be allocated or resized to.
    /// Default: 2 GiB
    pub max_byte_length: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            transition: TransitionPolicy::default(),
            max_byte_length: DEFAULT_MAX_BYTE_LENGTH,
        }
    }
}

impl StorageConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transition policy.
    pub fn with_transition(mut self, transition: TransitionPolicy) -> Self {
        self.transition = transition;
        self
    }

    /// Set the buffer allocation ceiling.
    pub fn max_byte_length(mut self, max: usize) -> Self {
        self.max_byte_length = max;
        self
    }

    /// Parse a (possibly partial) JSON document and check its thresholds.
    ///
    /// # Example
    ///
    /// ```
    /// use otter_vm_storage::StorageConfig;
    ///
    /// let config = StorageConfig::from_json(r#"{"max_byte_length": 4096}"#).unwrap();
    /// assert_eq!(config.max_byte_length, 4096);
    /// ```
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;
        config.transition.validate()?;
        Ok(config)
    }
}
