//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::knowledge::canonical::{Canonicalizer, SynonymTable};
use crate::knowledge::query::DEFAULT_RELATED_LIMIT;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

const KEYS: [&str; 4] = [
    "storage.graph_path",
    "canonicalization.synonyms_path",
    "query.related_limit",
    "logging.level",
];

/// Cartographer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub canonicalization: CanonicalizationConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Graph file; `<data_dir>/graph.json` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalizationConfig {
    /// TOML synonym file extending or replacing the built-in table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub related_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            related_limit: DEFAULT_RELATED_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("CARTOGRAPHER_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("cartographer")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the data directory holding the default graph file
    pub fn data_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("CARTOGRAPHER_DATA_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::data_dir()
                .ok_or_else(|| anyhow!("Could not determine data directory"))?
                .join("cartographer")
        };
        Ok(dir)
    }

    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            // Return default config without creating file
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.query.related_limit == 0 {
            return Err(
                Error::ConfigError("query.related_limit must be at least 1".to_string()).into(),
            );
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(Error::ConfigError(format!(
                "invalid logging.level '{}', expected one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ))
            .into());
        }
        Ok(())
    }

    /// Graph file in use: the configured path or `<data_dir>/graph.json`
    pub fn resolved_graph_path(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.graph_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("graph.json")),
        }
    }

    /// Build the canonicalizer, loading the configured synonym file if any
    pub fn canonicalizer(&self) -> anyhow::Result<Canonicalizer> {
        let table = match &self.canonicalization.synonyms_path {
            Some(path) => SynonymTable::load(path)?,
            None => SynonymTable::default(),
        };
        Ok(Canonicalizer::new(table))
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "storage.graph_path" => Ok(match &self.storage.graph_path {
                Some(path) => path.display().to_string(),
                None => format!("(default) {}", self.resolved_graph_path()?.display()),
            }),
            "canonicalization.synonyms_path" => Ok(match &self.canonicalization.synonyms_path {
                Some(path) => path.display().to_string(),
                None => "(built-in table)".to_string(),
            }),
            "query.related_limit" => Ok(self.query.related_limit.to_string()),
            "logging.level" => Ok(self.logging.level.clone()),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `cartographer config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key; an empty path clears it
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "storage.graph_path" => {
                self.storage.graph_path = optional_path(value);
            }
            "canonicalization.synonyms_path" => {
                let path = optional_path(value);
                if let Some(path) = &path {
                    SynonymTable::load(path)
                        .with_context(|| format!("Invalid synonym file: {}", path.display()))?;
                }
                self.canonicalization.synonyms_path = path;
            }
            "query.related_limit" => {
                let limit: usize = value
                    .parse()
                    .with_context(|| format!("Invalid related_limit value: {}", value))?;
                if limit == 0 {
                    return Err(anyhow!("Related limit must be at least 1"));
                }
                self.query.related_limit = limit;
            }
            "logging.level" => {
                let level = value.trim().to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(anyhow!(
                        "Invalid logging level: {}. Valid options: {}",
                        value,
                        LOG_LEVELS.join(", ")
                    ));
                }
                self.logging.level = level;
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `cartographer config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.into_iter()
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

fn optional_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
