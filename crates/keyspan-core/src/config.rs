//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid config.

use crate::schema::ManualIndexDescriptor;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

pub const DEFAULT_ROOT_SUBSPACE: &str = "keyspan";
pub const DEFAULT_BUILD_BATCH_SIZE: usize = 500;
pub const DEFAULT_BUILD_MAX_RETRIES: u32 = 5;
pub const DEFAULT_SCRUB_BATCH_SIZE: usize = 1000;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// EngineConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Name of the subspace every index subspace lives under.
    pub root_subspace: String,
    pub build: BuildConfig,
    pub scrub: ScrubConfig,

    /// Descriptors merged into the schema next to the entity-declared ones.
    pub indexes: Vec<ManualIndexDescriptor>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_subspace: DEFAULT_ROOT_SUBSPACE.to_string(),
            build: BuildConfig::default(),
            scrub: ScrubConfig::default(),
            indexes: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path.as_ref())?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_subspace.is_empty() {
            return Err(ConfigError::Invalid(
                "root_subspace cannot be empty".to_string(),
            ));
        }
        if self.build.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "build.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.scrub.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "scrub.batch_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

///
/// BuildConfig
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Records indexed per bulk-build batch.
    pub batch_size: usize,
    /// Conflict retries for `MemoryStore::transact`.
    pub max_retries: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BUILD_BATCH_SIZE,
            max_retries: DEFAULT_BUILD_MAX_RETRIES,
        }
    }
}

///
/// ScrubConfig
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrubConfig {
    /// Rewrite drifted entries instead of only reporting them.
    pub repair: bool,
    /// Keys read per range request while walking an index.
    pub batch_size: usize,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            repair: false,
            batch_size: DEFAULT_SCRUB_BATCH_SIZE,
        }
    }
}

///
/// TESTS
///
