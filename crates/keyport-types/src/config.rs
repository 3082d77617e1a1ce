//! Migration engine configuration with sensible defaults.
//!
//! All operational parameters are centralized here. Every value has a
//! documented default; [`MigrationConfig::load`] reads overrides from a
//! JSON file and validates them.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{EvmAddress, KeyportError, Result};

/// Global migration engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Upper bound on a single chain submission, in seconds.
    /// Exceeding it surfaces a retryable submission failure.
    pub submission_timeout_secs: u64,

    /// Capacity of the bounded channel carrying migration events.
    pub event_channel_size: usize,

    /// Key prefix under which keyrings are stored, followed by the
    /// profile id.
    pub keyring_key_prefix: String,

    /// Key holding the current-profile pointer in the user-data store.
    pub current_profile_key: String,

    /// ERC-1155 contracts known not to implement `safeBatchTransferFrom`.
    ///
    /// Token ids on these contracts are moved with one
    /// `safeTransferFrom` call each.
    pub erc1155_batch_unsupported: Vec<EvmAddress>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            submission_timeout_secs: 60,
            event_channel_size: 64,
            keyring_key_prefix: "keyring:".into(),
            current_profile_key: "currentProfileId".into(),
            erc1155_batch_unsupported: Vec::new(),
        }
    }
}

impl MigrationConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields take their default value. The result is validated
    /// before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`KeyportError::ConfigError`] if the file cannot be read,
    /// is not valid JSON, or fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KeyportError::ConfigError {
            reason: format!("failed to read config file {}: {e}", path.display()),
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| KeyportError::ConfigError {
                reason: format!("failed to parse config file: {e}"),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.submission_timeout_secs == 0 {
            return Err(KeyportError::ConfigError {
                reason: "submission_timeout_secs must be greater than 0".into(),
            });
        }

        if self.event_channel_size == 0 {
            return Err(KeyportError::ConfigError {
                reason: "event_channel_size must be greater than 0".into(),
            });
        }

        if self.keyring_key_prefix.is_empty() {
            return Err(KeyportError::ConfigError {
                reason: "keyring_key_prefix must not be empty".into(),
            });
        }

        if self.current_profile_key.is_empty() {
            return Err(KeyportError::ConfigError {
                reason: "current_profile_key must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Returns the submission timeout as a [`Duration`].
    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }
}
