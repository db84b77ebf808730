//! Tool configuration
//!
//! Parses `synergy.toml`. Every key is optional:
//!
//! ```toml
//! [model]
//! uv_packing = "canonical"   # or "legacy"
//! fold_backfaces = true
//!
//! [rig]
//! clear_existing = true
//! orphans = "detach"         # or "nearest-ancestor"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::mesh::ImportOptions;
use crate::skeleton::RigOptions;

/// Default configuration file name
pub const DEFAULT_CONFIG: &str = "synergy.toml";

/// Root configuration structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub model: ImportOptions,
    #[serde(default)]
    pub rig: RigOptions,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse synergy.toml")
    }
}

/// Load the explicit config, else `synergy.toml` in the working directory
/// if present, else the defaults
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }
    let default = Path::new(DEFAULT_CONFIG);
    if default.is_file() {
        tracing::debug!("Using {}", DEFAULT_CONFIG);
        Config::load(default)
    } else {
        Ok(Config::default())
    }
}
