//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::storage::database::default_database_path;

/// Upper bound accepted for `search.max_page_size`
pub const PAGE_SIZE_CEILING: u32 = 10_000;

/// entikit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseSection,
    pub search: SearchConfig,
    pub stamping: StampingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Paging defaults and round-trip strategy for the criteria searcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Issue the count and fetch queries on two pooled connections at once.
    /// Off by default: both run one after the other on a single connection.
    pub concurrent_round_trips: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampingConfig {
    /// Locale stamped on inserts when no provider supplies one
    pub default_locale: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 500,
            concurrent_round_trips: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseSection {
                path: default_database_path(),
                max_connections: 5,
            },
            search: SearchConfig::default(),
            stamping: StampingConfig {
                default_locale: Some("en-US".to_string()),
            },
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_page_size == 0 {
            return Err(anyhow!("search.default_page_size must be at least 1"));
        }
        if self.max_page_size > PAGE_SIZE_CEILING {
            return Err(anyhow!(
                "search.max_page_size must not exceed {}",
                PAGE_SIZE_CEILING
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(anyhow!(
                "search.default_page_size ({}) exceeds search.max_page_size ({})",
                self.default_page_size,
                self.max_page_size
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("ENTIKIT_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("entikit")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or fall back to defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be at least 1"));
        }
        if let Some(locale) = &self.stamping.default_locale {
            if locale.trim().is_empty() {
                return Err(anyhow!("stamping.default_locale must not be blank"));
            }
        }
        self.search.validate()
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(self.database.path.display().to_string()),
            "database.max_connections" => Ok(self.database.max_connections.to_string()),

            "search.default_page_size" => Ok(self.search.default_page_size.to_string()),
            "search.max_page_size" => Ok(self.search.max_page_size.to_string()),
            "search.concurrent_round_trips" => Ok(self.search.concurrent_round_trips.to_string()),

            "stamping.default_locale" => Ok(self
                .stamping
                .default_locale
                .clone()
                .unwrap_or_else(|| "(not set)".to_string())),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `entikit config show` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.path" => {
                self.database.path = PathBuf::from(value);
            }
            "database.max_connections" => {
                self.database.max_connections = value
                    .parse()
                    .with_context(|| format!("Invalid max_connections value: {}", value))?;
            }
            "search.default_page_size" => {
                self.search.default_page_size = value
                    .parse()
                    .with_context(|| format!("Invalid default_page_size value: {}", value))?;
            }
            "search.max_page_size" => {
                self.search.max_page_size = value
                    .parse()
                    .with_context(|| format!("Invalid max_page_size value: {}", value))?;
            }
            "search.concurrent_round_trips" => {
                self.search.concurrent_round_trips = value
                    .parse()
                    .with_context(|| format!("Expected true or false, got: {}", value))?;
            }
            "stamping.default_locale" => {
                self.stamping.default_locale = match value.trim() {
                    "" | "none" => None,
                    locale => Some(locale.to_string()),
                };
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `entikit config show` to see available keys.",
                    key
                ));
            }
        }
        self.validate()
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "database.path",
            "database.max_connections",
            "search.default_page_size",
            "search.max_page_size",
            "search.concurrent_round_trips",
            "stamping.default_locale",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.search.default_page_size, 20);
        assert!(!config.search.concurrent_round_trips);
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            [database]
            path = "/tmp/entikit.db"
            max_connections = 2

            [search]
            default_page_size = 10
            max_page_size = 100
            concurrent_round_trips = true

            [stamping]
            default_locale = "fr-FR"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.search.default_page_size, 10);
        assert!(config.search.concurrent_round_trips);
        assert_eq!(config.stamping.default_locale.as_deref(), Some("fr-FR"));
    }

    #[test]
    fn test_default_page_larger_than_max_is_rejected() {
        let mut config = Config::default();
        config.search.max_page_size = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();
        config.set("search.default_page_size", "50").unwrap();
        assert_eq!(config.get("search.default_page_size").unwrap(), "50");

        config.set("stamping.default_locale", "none").unwrap();
        assert_eq!(config.get("stamping.default_locale").unwrap(), "(not set)");

        assert!(config.set("search.default_page_size", "zero").is_err());
        assert!(config.set("search.default_page_size", "0").is_err());
        assert!(config.get("nope").is_err());
    }

    #[test]
    fn test_list_covers_every_key() {
        let entries = Config::default().list().unwrap();
        assert_eq!(entries.len(), 6);
        assert!(entries.iter().any(|(k, _)| k == "search.max_page_size"));
    }
}
