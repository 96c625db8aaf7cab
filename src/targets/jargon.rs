//! Per-group jargon vocabulary
//!
//! Plain text file per group, one vocabulary entry per line. Applying a
//! proposal replaces the vocabulary with the approved content; writes
//! normalize the lines (trimmed, de-duplicated, order preserved) so the
//! file stays clean no matter what a producer generated.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

use super::{group_file_stem, ReviewTarget};

/// File-backed jargon vocabulary store
pub struct JargonStore {
    dir: PathBuf,
}

impl JargonStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn vocab_path(&self, group_id: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", group_file_stem(group_id)))
    }

    /// Vocabulary entries for a group, in file order
    pub fn entries(&self, group_id: &str) -> Result<Vec<String>> {
        let path = self.vocab_path(group_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(normalize_lines(&content))
    }

    /// Whether the vocabulary contains an entry
    pub fn contains(&self, group_id: &str, entry: &str) -> Result<bool> {
        Ok(self.entries(group_id)?.iter().any(|e| e == entry.trim()))
    }

    fn write(&self, group_id: &str, content: &str) -> Result<()> {
        let path = self.vocab_path(group_id);
        let lines = normalize_lines(content);
        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        std::fs::write(&path, out)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Trim lines, drop empties and duplicates, keep first-seen order
fn normalize_lines(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ReviewTarget for JargonStore {
    async fn apply(&self, group_id: &str, content: &str) -> Result<()> {
        self.write(group_id, content)?;
        info!("Updated jargon vocabulary for group {}", group_id);
        Ok(())
    }

    async fn undo(&self, group_id: &str, previous_content: &str) -> Result<()> {
        self.write(group_id, previous_content)?;
        info!("Restored previous jargon vocabulary for group {}", group_id);
        Ok(())
    }
}
