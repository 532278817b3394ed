use std::path::PathBuf;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Top-level capability engine configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CapsConfig {
    /// Durable store tier locations
    #[serde(default)]
    pub store: StoreConfig,

    /// Per-scheme enable flags
    #[serde(default)]
    pub schemes: SchemeConfig,

    /// Base under which local advertisement endpoints are mounted
    #[serde(default = "default_node_base")]
    pub node_base: String,
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            schemes: SchemeConfig::default(),
            node_base: default_node_base(),
        }
    }
}

/// Locations of the two optional disk tiers.
///
/// The system store is read-only and typically ships with a distribution;
/// the user store is read-write and accumulates runtime-verified entries.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub system_db_path: Option<PathBuf>,

    #[serde(default)]
    pub user_db_path: Option<PathBuf>,
}

/// Independent enable flags per verification scheme.
///
/// A disabled scheme is neither processed on inbound presence nor emitted
/// on outbound presence.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SchemeConfig {
    #[serde(default = "default_scheme_enabled")]
    pub sha256: bool,

    #[serde(default = "default_scheme_enabled")]
    pub sha512: bool,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            sha256: default_scheme_enabled(),
            sha512: default_scheme_enabled(),
        }
    }
}

impl CapsConfig {
    /// Load configuration with priority:
    /// 1. Hardcoded defaults
    /// 2. Optional TOML file
    /// 3. `ENTITY_CAPS__*` environment variables (highest priority)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let config: CapsConfig = builder
            .add_source(
                Environment::with_prefix("ENTITY_CAPS")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.node_base.contains('#') {
            return Err(Error::Config(ConfigError::Message(
                "node_base must not contain '#', it is the locator separator".into(),
            )));
        }
        if !self.schemes.sha256 && !self.schemes.sha512 {
            return Err(Error::Config(ConfigError::Message(
                "at least one verification scheme must be enabled".into(),
            )));
        }
        Ok(())
    }
}

fn default_node_base() -> String {
    "https://entity-caps.dev/client".to_string()
}

fn default_scheme_enabled() -> bool {
    true
}
