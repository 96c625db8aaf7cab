//! Batch review operations
//!
//! Runs one review action across many proposal ids. Items are independent
//! transactions: one bad id never blocks the rest, and the caller gets a
//! single aggregate result listing what went through and what did not.

use std::sync::Arc;
use tracing::warn;

use crate::types::ReviewError;

use super::engine::ReviewEngine;
use super::store::ProposalStore;

/// The two batchable review decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
        }
    }
}

/// One item that did not go through, with the reason surfaced verbatim
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub id: String,
    pub reason: String,
}

/// Aggregate result of a batch call
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    fn success(&mut self, id: &str) {
        self.succeeded.push(id.to_string());
    }

    fn failure(&mut self, id: &str, err: &ReviewError) {
        self.failed.push(BatchFailure {
            id: id.to_string(),
            reason: err.to_string(),
        });
    }
}

/// Fans a single review action out over a set of ids
pub struct BatchCoordinator {
    engine: Arc<ReviewEngine>,
    store: Arc<ProposalStore>,
}

impl BatchCoordinator {
    pub fn new(engine: Arc<ReviewEngine>, store: Arc<ProposalStore>) -> Self {
        Self { engine, store }
    }

    /// Apply the same decision to every id.
    ///
    /// A proposal whose decision committed counts as succeeded even when
    /// its downstream apply failed; that failure is already on the audit
    /// record and gets logged here. Only transition-level errors land in
    /// `failed`.
    pub async fn review(
        &self,
        ids: &[String],
        action: ReviewAction,
        actor: &str,
        comment: Option<&str>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for id in ids {
            let result = match action {
                ReviewAction::Approve => self.engine.approve(id, actor, comment, None).await,
                ReviewAction::Reject => self.engine.reject(id, actor, comment).await,
            };
            match result {
                Ok(review) => {
                    if let Some(apply_error) = &review.apply_error {
                        warn!(
                            "Batch {}: proposal {} decided but not applied: {}",
                            action.as_str(),
                            id,
                            apply_error
                        );
                    }
                    outcome.success(id);
                }
                Err(err) => {
                    warn!("Batch {}: proposal {} failed: {}", action.as_str(), id, err);
                    outcome.failure(id, &err);
                }
            }
        }

        outcome
    }

    /// Delete every id, with the same per-item independence
    pub async fn delete(&self, ids: &[String], actor: &str) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for id in ids {
            match self.store.delete(id, actor).await {
                Ok(true) => outcome.success(id),
                Ok(false) => outcome.failure(id, &ReviewError::NotFound(id.clone())),
                Err(err) => outcome.failure(id, &err),
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::{ApplyRegistry, MockReviewTarget};
    use crate::types::{NewProposal, ProposalStatus, ReviewSource};
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, Arc<ProposalStore>, BatchCoordinator) {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            ProposalStore::open(dir.path().join("test.db")).await.unwrap(),
        );

        // rejects only in these tests; any apply call would panic
        let registry = Arc::new(ApplyRegistry::new(
            Arc::new(MockReviewTarget::new()),
            Arc::new(MockReviewTarget::new()),
            Arc::new(MockReviewTarget::new()),
            Arc::new(MockReviewTarget::new()),
            Arc::new(MockReviewTarget::new()),
        ));
        let engine = Arc::new(ReviewEngine::new(Arc::clone(&store), registry));
        let coordinator = BatchCoordinator::new(engine, Arc::clone(&store));
        (dir, store, coordinator)
    }

    async fn create(store: &ProposalStore, proposed: &str) -> String {
        store
            .create(NewProposal::new(ReviewSource::Jargon, "g1", "", proposed))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_partial_success_reports_both_sides() {
        let (_dir, store, coordinator) = setup().await;

        let a = create(&store, "a").await;
        let b = create(&store, "b").await;
        let c = create(&store, "c").await;

        // b is already decided; rejecting it again must fail alone
        coordinator
            .review(&[b.clone()], ReviewAction::Reject, "reviewer", None)
            .await;

        let ids = vec![a.clone(), b.clone(), c.clone()];
        let outcome = coordinator
            .review(&ids, ReviewAction::Reject, "reviewer", Some("batch cleanup"))
            .await;

        assert_eq!(outcome.succeeded, vec![a.clone(), c.clone()]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, b);
        assert!(outcome.failed[0].reason.contains("rejected"));

        assert_eq!(
            store.get(&a).await.unwrap().status,
            ProposalStatus::Rejected
        );
        assert_eq!(
            store.get(&c).await.unwrap().status,
            ProposalStatus::Rejected
        );
    }

    #[tokio::test]
    async fn test_unknown_id_does_not_abort_batch() {
        let (_dir, store, coordinator) = setup().await;
        let a = create(&store, "a").await;

        let ids = vec!["missing".to_string(), a.clone()];
        let outcome = coordinator
            .review(&ids, ReviewAction::Reject, "reviewer", None)
            .await;

        assert_eq!(outcome.succeeded, vec![a]);
        assert_eq!(outcome.failed[0].id, "missing");
        assert!(outcome.failed[0].reason.contains("not found"));
    }

    #[tokio::test]
    async fn test_batch_delete() {
        let (_dir, store, coordinator) = setup().await;
        let a = create(&store, "a").await;

        let ids = vec![a.clone(), "missing".to_string()];
        let outcome = coordinator.delete(&ids, "reviewer").await;

        assert_eq!(outcome.succeeded, vec![a.clone()]);
        assert_eq!(outcome.failed.len(), 1);
        assert!(store.get(&a).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty_outcome() {
        let (_dir, _store, coordinator) = setup().await;
        let outcome = coordinator
            .review(&[], ReviewAction::Approve, "reviewer", None)
            .await;
        assert!(outcome.succeeded.is_empty());
        assert!(outcome.failed.is_empty());
    }
}
