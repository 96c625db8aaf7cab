//! Live stores that approved proposals materialize into
//!
//! Each [`crate::types::ReviewSource`] maps to exactly one target. The
//! review engine only ever calls `apply` on approval and `undo` on revert;
//! how a target persists the content is its own business.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::types::ReviewSource;

pub mod docstore;
pub mod jargon;
pub mod persona;

pub use docstore::GroupDocumentStore;
pub use jargon::JargonStore;
pub use persona::PersonaStore;

/// Write interface the review engine drives.
///
/// `undo` restores the snapshot that was live before the matching `apply`;
/// it is invoked best-effort on revert and its failure never blocks the
/// status change.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewTarget: Send + Sync {
    async fn apply(&self, group_id: &str, content: &str) -> Result<()>;
    async fn undo(&self, group_id: &str, previous_content: &str) -> Result<()>;
}

/// Closed dispatch table from review source to its target store
pub struct ApplyRegistry {
    style: Arc<dyn ReviewTarget>,
    persona: Arc<dyn ReviewTarget>,
    traditional: Arc<dyn ReviewTarget>,
    jargon: Arc<dyn ReviewTarget>,
    social: Arc<dyn ReviewTarget>,
}

impl ApplyRegistry {
    /// Assemble a registry from explicit targets (used by tests)
    pub fn new(
        style: Arc<dyn ReviewTarget>,
        persona: Arc<dyn ReviewTarget>,
        traditional: Arc<dyn ReviewTarget>,
        jargon: Arc<dyn ReviewTarget>,
        social: Arc<dyn ReviewTarget>,
    ) -> Self {
        Self {
            style,
            persona,
            traditional,
            jargon,
            social,
        }
    }

    /// File-backed targets under the given root directory
    pub fn open(root: &Path) -> Result<Self> {
        Ok(Self {
            style: Arc::new(GroupDocumentStore::new(root.join("style"), "style guide")?),
            persona: Arc::new(PersonaStore::new(root.join("persona"))?),
            traditional: Arc::new(GroupDocumentStore::new(root.join("rules"), "reply rules")?),
            jargon: Arc::new(JargonStore::new(root.join("jargon"))?),
            social: Arc::new(GroupDocumentStore::new(root.join("social"), "social notes")?),
        })
    }

    /// Target store for a review source
    pub fn target(&self, source: ReviewSource) -> &dyn ReviewTarget {
        match source {
            ReviewSource::StyleLearning => self.style.as_ref(),
            ReviewSource::PersonaLearning => self.persona.as_ref(),
            ReviewSource::Traditional => self.traditional.as_ref(),
            ReviewSource::Jargon => self.jargon.as_ref(),
            ReviewSource::SocialRelation => self.social.as_ref(),
        }
    }
}

/// Turn a group id into a safe file stem
pub(crate) fn group_file_stem(group_id: &str) -> String {
    group_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
