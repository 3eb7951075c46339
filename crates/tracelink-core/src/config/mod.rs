//! Configuration management for tracelink.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `tracelink.toml` file
//! 3. User config `~/.config/tracelink/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution cache configuration.
    pub cache: CacheConfig,

    /// Stack-trace scanning configuration.
    pub scan: ScanConfig,

    /// Source index configuration.
    pub index: IndexConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./tracelink.toml` (project local)
    /// 2. `~/.config/tracelink/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Location of the user-level config file.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Cache overrides
        if let Ok(entries) = std::env::var("TRACELINK_CACHE_MAX_ENTRIES") {
            if let Ok(n) = entries.parse() {
                self.cache.max_entries = n;
            }
        }
        if let Ok(ttl) = std::env::var("TRACELINK_CACHE_TTL_SECS") {
            if let Ok(n) = ttl.parse() {
                self.cache.ttl_secs = n;
            }
        }

        // Scan overrides
        if let Ok(length) = std::env::var("TRACELINK_MAX_LINE_LENGTH") {
            if let Ok(n) = length.parse() {
                self.scan.max_line_length = n;
            }
        }

        // Index overrides
        if let Ok(roots) = std::env::var("TRACELINK_SOURCE_ROOTS") {
            self.index.source_roots = std::env::split_paths(&roots).collect();
        }
        if let Ok(roots) = std::env::var("TRACELINK_LIBRARY_ROOTS") {
            self.index.library_roots = std::env::split_paths(&roots).collect();
        }
    }

    /// Reject values the scanner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be greater than zero".to_string(),
            ));
        }
        if self.scan.max_line_length == 0 {
            return Err(ConfigError::Invalid(
                "scan.max_line_length must be greater than zero".to_string(),
            ));
        }
        if self.index.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "index.extensions must name at least one extension".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Resolution cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries per lookup cache.
    pub max_entries: u64,

    /// Seconds before a cached lookup is dropped.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Stack-trace scanning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Longer lines are skipped and end any chase in progress.
    pub max_line_length: usize,

    /// Highlight the call of the previous frame's method on caller frames.
    pub highlight_call_sites: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            highlight_call_sites: DEFAULT_HIGHLIGHT_CALL_SITES,
        }
    }
}

/// Source index configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Project source roots.
    pub source_roots: Vec<PathBuf>,

    /// Dependency source roots; hits there are greyed out.
    pub library_roots: Vec<PathBuf>,

    /// File extensions to index (without leading dot).
    pub extensions: Vec<String>,

    /// Directory names skipped while walking roots.
    pub exclude_dirs: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            source_roots: Vec::new(),
            library_roots: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
