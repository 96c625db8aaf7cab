//! Generic per-group text documents
//!
//! Style guides, reply rules, and social notes all share the same shape:
//! one text document per group, replaced wholesale on apply and restored
//! from the previous snapshot on undo.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::{group_file_stem, ReviewTarget};

/// One document per group under a dedicated directory
pub struct GroupDocumentStore {
    dir: PathBuf,
    /// Human-readable label used in logs ("style guide", "reply rules", ...)
    kind: &'static str,
}

impl GroupDocumentStore {
    pub fn new(dir: PathBuf, kind: &'static str) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self { dir, kind })
    }

    fn doc_path(&self, group_id: &str) -> PathBuf {
        self.dir.join(format!("{}.md", group_file_stem(group_id)))
    }

    /// Current document text, if one has been materialized
    pub fn current(&self, group_id: &str) -> Result<Option<String>> {
        let path = self.doc_path(group_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn write(&self, group_id: &str, content: &str) -> Result<()> {
        let path = self.doc_path(group_id);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl ReviewTarget for GroupDocumentStore {
    async fn apply(&self, group_id: &str, content: &str) -> Result<()> {
        self.write(group_id, content)?;
        info!("Updated {} for group {}", self.kind, group_id);
        Ok(())
    }

    async fn undo(&self, group_id: &str, previous_content: &str) -> Result<()> {
        self.write(group_id, previous_content)?;
        info!("Restored previous {} for group {}", self.kind, group_id);
        Ok(())
    }
}
