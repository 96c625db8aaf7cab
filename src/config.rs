//! Configuration management
//!
//! Loads reviewer settings from a TOML file under the platform data
//! directory, creating it with defaults on first run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Review queue settings
    #[serde(default)]
    pub review: ReviewConfig,
    /// Apply-target storage settings
    #[serde(default)]
    pub targets: TargetsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// SQLite database filename inside the data directory
    #[serde(default = "default_database_file")]
    pub database_file: String,
    /// Default page size for pending listings
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Actor name recorded on CLI-driven transitions
    #[serde(default = "default_reviewer")]
    pub reviewer: String,
}

fn default_database_file() -> String {
    "proposals.db".to_string()
}

fn default_page_size() -> u64 {
    10
}

fn default_reviewer() -> String {
    "reviewer".to_string()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
            page_size: default_page_size(),
            reviewer: default_reviewer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsConfig {
    /// Subdirectory of the data dir holding the live group stores
    #[serde(default = "default_targets_dir")]
    pub directory: String,
}

fn default_targets_dir() -> String {
    "live".to_string()
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            directory: default_targets_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            review: ReviewConfig::default(),
            targets: TargetsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration, creating a default file if none exists
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config =
                toml::from_str(&content).context("Failed to parse config.toml")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Absolute path of the proposal database
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(data_dir()?.join(&self.review.database_file))
    }

    /// Absolute path of the apply-target storage root
    pub fn targets_path(&self) -> Result<PathBuf> {
        Ok(data_dir()?.join(&self.targets.directory))
    }
}

/// Application data directory (~/.local/share/persona-review on Linux)
pub fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .context("Could not determine data directory")?
        .join("persona-review");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}
