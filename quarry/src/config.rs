//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `QUARRY_`, nested keys separated by `__`,
//!    e.g. `QUARRY_QUERY__DEFAULT_PAGE_SIZE=50`)
//! 2. Current working directory: ./quarry.toml
//! 3. XDG config directory: ~/.config/quarry/config.toml
//! 4. Default values

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::{Tracking, DEFAULT_PAGE_SIZE};
use crate::reflect::PathMatching;

const ENV_PREFIX: &str = "QUARRY_";
const LOCAL_CONFIG_FILE: &str = "quarry.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Pagination and sort-string defaults
    #[serde(default)]
    pub query: QueryConfig,

    /// Defaults handed to repositories by the default factory
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Tracing subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size for new pagination criteria
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// How sort-string property names are matched
    #[serde(default)]
    pub property_matching: PathMatching,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            property_matching: PathMatching::default(),
        }
    }
}

/// Repository defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Tracking mode for reads unless a query overrides it
    #[serde(default)]
    pub tracking: Tracking,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full `EnvFilter` string)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Environment variables (`QUARRY_` prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // lowest priority first
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading configuration");
                figment = figment.merge(Toml::file(path));
            }
        }

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the search path; a missing file yields the defaults.
    /// Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Candidate config files, highest priority first
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        let xdg_dirs = xdg::BaseDirectories::with_prefix("quarry");
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }
        paths
    }
}
