//! Per-group persona profiles
//!
//! Holds the live system prompt for each chat group as a TOML file.
//! Applying an approved persona proposal replaces the prompt; undo puts
//! the previous snapshot back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use super::{group_file_stem, ReviewTarget};

/// Live persona for one group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// System prompt the bot currently runs with
    pub system_prompt: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for PersonaProfile {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            updated_at: Utc::now(),
        }
    }
}

/// File-backed persona store
pub struct PersonaStore {
    dir: PathBuf,
}

impl PersonaStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn profile_path(&self, group_id: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", group_file_stem(group_id)))
    }

    /// Load a group's profile, or the empty default when none exists
    pub fn load(&self, group_id: &str) -> Result<PersonaProfile> {
        let path = self.profile_path(group_id);
        if !path.exists() {
            return Ok(PersonaProfile::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let profile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(profile)
    }

    fn save(&self, group_id: &str, profile: &PersonaProfile) -> Result<()> {
        let path = self.profile_path(group_id);
        let content = toml::to_string_pretty(profile)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// The system prompt currently live for a group, if any
    pub fn current_prompt(&self, group_id: &str) -> Result<Option<String>> {
        let profile = self.load(group_id)?;
        if profile.system_prompt.is_empty() {
            Ok(None)
        } else {
            Ok(Some(profile.system_prompt))
        }
    }

    fn write_prompt(&self, group_id: &str, prompt: &str) -> Result<()> {
        let mut profile = self.load(group_id)?;
        profile.system_prompt = prompt.to_string();
        profile.updated_at = Utc::now();
        self.save(group_id, &profile)
    }
}

#[async_trait]
impl ReviewTarget for PersonaStore {
    async fn apply(&self, group_id: &str, content: &str) -> Result<()> {
        self.write_prompt(group_id, content)?;
        info!("Updated persona prompt for group {}", group_id);
        Ok(())
    }

    async fn undo(&self, group_id: &str, previous_content: &str) -> Result<()> {
        self.write_prompt(group_id, previous_content)?;
        info!("Restored previous persona prompt for group {}", group_id);
        Ok(())
    }
}
