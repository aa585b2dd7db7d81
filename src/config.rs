//! Configuration for the evolution engine and CLI tools
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (freshet.toml)
//! - Environment variables (FRESHET_*)
//!
//! ## Example config file (freshet.toml):
//! ```toml
//! [metaschema]
//! path = "./ops/metaschema.json"
//!
//! [defaults]
//! compatibility_mode = "forward"
//! category = "undefined"
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::event_type::{Category, CompatibilityMode};

/// Main configuration for the evolution tooling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Meta-schema settings
    #[serde(default)]
    pub metaschema: MetaSchemaConfig,

    /// Defaults applied to bare schema documents
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// CLI output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Meta-schema configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaSchemaConfig {
    /// Path to a meta-schema document overriding the embedded one
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Policies assumed when a definition does not state them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Compatibility mode for ad-hoc checks
    #[serde(default)]
    pub compatibility_mode: CompatibilityMode,

    /// Category for ad-hoc checks
    #[serde(default)]
    pub category: Category,
}

/// CLI output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl EvolutionConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["freshet.toml", ".freshet.toml", "config/freshet.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "freshet", "schemas") {
            let xdg_config = config_dir.config_dir().join("freshet.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (FRESHET_*)
        builder = builder.add_source(
            Environment::with_prefix("FRESHET")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the meta-schema override path (resolves relative paths)
    pub fn metaschema_path(&self) -> Option<PathBuf> {
        self.metaschema.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(p)
            }
        })
    }
}
