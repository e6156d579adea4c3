//! Configuration management for Quarry.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::date::DateNormalizer;
use crate::engine::SearchOptions;
use crate::error::{QuarryError, Result};
use crate::library::LoadOptions;
use crate::parser::QueryParser;
use crate::query::DEFAULT_FIELD;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure for Quarry.
///
/// ## Example Configuration File (quarry.toml)
///
/// ```toml
/// [general]
/// library_path = "/home/me/archive/books"
/// max_results = 500
///
/// [search]
/// default_search = "-type:separator"
/// default_field = "tcc"
/// parallel_books = true
/// cache_update_threshold_hours = 120
/// cache_size_limit_mib = 64
///
/// [time]
/// timezone = "local"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Query defaults
    pub search: SearchConfig,

    /// Timestamp interpretation
    pub time: TimeConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Library directory (None = default location)
    pub library_path: Option<PathBuf>,

    /// Maximum number of results to show per book
    pub max_results: usize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            library_path: None,
            max_results: 1000,
            log_level: "info".to_string(),
        }
    }
}

/// Query defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Terms placed before every query the user types
    pub default_search: String,

    /// Field that bare terms search before any `default:` command
    pub default_field: String,

    /// Evaluate books in parallel
    pub parallel_books: bool,

    /// Hours a fulltext cache may lag behind its book before it is
    /// reported as outdated (0 = never)
    pub cache_update_threshold_hours: u64,

    /// Fulltext cache files larger than this many MiB are not loaded
    /// (0 = no limit)
    pub cache_size_limit_mib: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            default_search: String::new(),
            default_field: DEFAULT_FIELD.to_string(),
            parallel_books: true,
            cache_update_threshold_hours: 120,
            cache_size_limit_mib: 0,
        }
    }
}

/// Time zone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// `local`, `utc`, or a fixed offset like `+08:00`
    pub timezone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            timezone: "local".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| QuarryError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self)
            .map_err(|e| QuarryError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "quarry")
            .ok_or_else(|| QuarryError::config("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("quarry.toml"))
    }

    /// Get the default data directory path.
    pub fn default_data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "quarry")
            .ok_or_else(|| QuarryError::config("Could not determine data directory"))?;

        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the library directory (from config or default).
    pub fn library_dir(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.general.library_path {
            Ok(path.clone())
        } else {
            Ok(Self::default_data_dir()?.join("books"))
        }
    }

    /// The configured time zone for date filters.
    pub fn normalizer(&self) -> Result<DateNormalizer> {
        self.time
            .timezone
            .parse()
            .map_err(|e: String| QuarryError::config(e))
    }

    /// A query parser using the configured defaults.
    pub fn parser(&self) -> Result<QueryParser> {
        Ok(QueryParser::new()
            .with_normalizer(self.normalizer()?)
            .with_default_field(self.search.default_field.clone()))
    }

    /// Fulltext cache checks for loading the library.
    pub fn load_options(&self) -> LoadOptions {
        let search = &self.search;
        LoadOptions {
            cache_update_threshold: (search.cache_update_threshold_hours > 0)
                .then(|| Duration::from_secs(search.cache_update_threshold_hours.saturating_mul(3600))),
            cache_size_limit: (search.cache_size_limit_mib > 0)
                .then(|| search.cache_size_limit_mib.saturating_mul(1024 * 1024)),
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            parallel: self.search.parallel_books,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Field;
    use chrono::FixedOffset;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.max_results, 1000);
        assert_eq!(config.search.default_field, "tcc");
        assert!(config.search.parallel_books);
        assert_eq!(config.normalizer().unwrap(), DateNormalizer::Local);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut config = Config::default();
        config.general.max_results = 50;
        config.search.default_search = "-type:separator".to_string();
        config.time.timezone = "+08:00".to_string();

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded.general.max_results, 50);
        assert_eq!(loaded.search.default_search, "-type:separator");
        assert_eq!(
            loaded.normalizer().unwrap(),
            DateNormalizer::Fixed(FixedOffset::east_opt(8 * 3600).unwrap())
        );
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.general.max_results, 1000);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[search]\ndefault_field = \"title\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.search.default_field, "title");
        assert!(config.search.parallel_books);
        assert_eq!(config.time.timezone, "local");

        let query = config.parser().unwrap().parse("needle");
        assert!(query.rule(Field::Title).is_some());
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[general\nmax_results = ").unwrap();
        assert!(matches!(
            Config::load_from(&config_path),
            Err(QuarryError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_invalid_timezone() {
        let mut config = Config::default();
        config.time.timezone = "somewhere".to_string();
        assert!(config.normalizer().is_err());
        assert!(config.parser().is_err());
    }

    #[test]
    fn test_load_options() {
        let mut config = Config::default();
        let options = config.load_options();
        assert_eq!(
            options.cache_update_threshold,
            Some(Duration::from_secs(120 * 3600))
        );
        assert_eq!(options.cache_size_limit, None);

        config.search.cache_update_threshold_hours = 0;
        config.search.cache_size_limit_mib = 64;
        let options = config.load_options();
        assert_eq!(options.cache_update_threshold, None);
        assert_eq!(options.cache_size_limit, Some(64 * 1024 * 1024));
    }

    #[test]
    fn test_library_dir_override() {
        let mut config = Config::default();
        config.general.library_path = Some(PathBuf::from("/srv/books"));
        assert_eq!(config.library_dir().unwrap(), PathBuf::from("/srv/books"));
    }
}
