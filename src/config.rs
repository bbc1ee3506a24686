//! Persisted contract-address configuration.
//!
//! A single JSON record with two independently optional fields, stored in the
//! platform configuration directory.  Loading never fails: a missing or
//! unreadable file yields an empty config.  Saving overwrites the whole
//! record (last writer wins); the [`ConfigStore::set_company`] and
//! [`ConfigStore::set_customer_satisfaction`] helpers do an explicit
//! read-modify-write so updating one field never clobbers its sibling.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// File name of the persisted record inside the config directory.
pub const CONFIG_FILE: &str = "contracts.json";

/// The two external contract addresses, both independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Address>,
    #[serde(
        default,
        rename = "customerSatisfaction",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_satisfaction: Option<Address>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine a configuration directory for this platform")]
    NoConfigDir,
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize contract config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed store for [`ContractConfig`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted at the platform config directory (e.g.
    /// `~/.config/bottleseal/contracts.json` on Linux).
    pub fn default_location() -> Result<Self, ConfigError> {
        let dirs = directories::ProjectDirs::from("", "", "bottleseal")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(dirs.config_dir().join(CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record.  Never fails: a missing file yields the
    /// empty config, and a corrupt one is logged and treated as empty.
    pub fn load(&self) -> ContractConfig {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no contract config saved yet");
                return ContractConfig::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read contract config");
                return ContractConfig::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "contract config is corrupt, ignoring it");
                ContractConfig::default()
            }
        }
    }

    /// Persist the whole record, overwriting any previous contents.
    pub fn save(&self, config: &ContractConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_vec_pretty(config)?;
        fs::write(&self.path, json).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "contract config saved");
        Ok(())
    }

    /// Update the company contract address, preserving the sibling field.
    pub fn set_company(&self, address: Address) -> Result<ContractConfig, ConfigError> {
        let mut config = self.load();
        config.company = Some(address);
        self.save(&config)?;
        Ok(config)
    }

    /// Update the satisfaction contract address, preserving the sibling field.
    pub fn set_customer_satisfaction(
        &self,
        address: Address,
    ) -> Result<ContractConfig, ConfigError> {
        let mut config = self.load();
        config.customer_satisfaction = Some(address);
        self.save(&config)?;
        Ok(config)
    }
}
