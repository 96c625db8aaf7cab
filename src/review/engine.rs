//! Review state machine
//!
//! Drives the legal transitions (pending -> approved/rejected,
//! approved/rejected -> pending) and their side effects. The status
//! change and its audit record commit first; the downstream apply/undo
//! call runs after, and its failure is reported as a degraded success
//! rather than rolling the decision back. Review decisions must not be
//! lost to a transient fault in a live store.

use std::sync::Arc;
use tracing::warn;

use crate::targets::ApplyRegistry;
use crate::types::{Proposal, ProposalStatus, ReviewError};

use super::store::{ProposalStore, TransitionRequest};

/// Outcome of a single review action.
///
/// `apply_error` is set when the decision committed but the downstream
/// materialization (or undo) failed; the caller retries that part
/// manually. This is distinct from the call failing outright.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub proposal: Proposal,
    pub apply_error: Option<String>,
}

impl ReviewOutcome {
    /// True when the decision and its side effect both landed
    pub fn fully_applied(&self) -> bool {
        self.apply_error.is_none()
    }
}

/// State machine over the proposal store plus the apply dispatch table
pub struct ReviewEngine {
    store: Arc<ProposalStore>,
    targets: Arc<ApplyRegistry>,
}

impl ReviewEngine {
    pub fn new(store: Arc<ProposalStore>, targets: Arc<ApplyRegistry>) -> Self {
        Self { store, targets }
    }

    /// Approve a pending proposal and materialize its content.
    ///
    /// `modified_content` replaces the proposed text in the live store
    /// while the proposal itself keeps what the producer suggested; the
    /// audit record carries the content actually applied.
    pub async fn approve(
        &self,
        id: &str,
        actor: &str,
        comment: Option<&str>,
        modified_content: Option<&str>,
    ) -> Result<ReviewOutcome, ReviewError> {
        let proposal = self.store.get(id).await?;
        let content = modified_content
            .unwrap_or(&proposal.proposed_content)
            .to_string();

        let outcome = self
            .store
            .transition(TransitionRequest {
                id,
                action: "approve",
                from: &[ProposalStatus::Pending],
                to: ProposalStatus::Approved,
                actor,
                comment,
                applied_content: Some(&content),
            })
            .await?;

        let target = self.targets.target(proposal.review_source);
        let apply_error = match target.apply(&proposal.group_id, &content).await {
            Ok(()) => {
                self.mark_applied(outcome.audit_id).await;
                None
            }
            Err(e) => {
                warn!(
                    "Proposal {} approved but {} apply failed: {}",
                    id, proposal.review_source, e
                );
                Some(e.to_string())
            }
        };

        Ok(ReviewOutcome {
            proposal: outcome.proposal,
            apply_error,
        })
    }

    /// Reject a pending proposal; nothing is materialized
    pub async fn reject(
        &self,
        id: &str,
        actor: &str,
        comment: Option<&str>,
    ) -> Result<ReviewOutcome, ReviewError> {
        let outcome = self
            .store
            .transition(TransitionRequest {
                id,
                action: "reject",
                from: &[ProposalStatus::Pending],
                to: ProposalStatus::Rejected,
                actor,
                comment,
                applied_content: None,
            })
            .await?;

        Ok(ReviewOutcome {
            proposal: outcome.proposal,
            apply_error: None,
        })
    }

    /// Undo a review decision, returning the proposal to pending.
    ///
    /// Reverting an approval also asks the target store to restore the
    /// original snapshot, best-effort: an undo failure is surfaced on the
    /// outcome but the proposal is pending again either way.
    pub async fn revert(&self, id: &str, actor: &str) -> Result<ReviewOutcome, ReviewError> {
        let proposal = self.store.get(id).await?;

        match proposal.status {
            ProposalStatus::Pending => Err(ReviewError::InvalidTransition {
                id: id.to_string(),
                status: ProposalStatus::Pending,
                action: "revert",
            }),
            ProposalStatus::Rejected => {
                let outcome = self
                    .store
                    .transition(TransitionRequest {
                        id,
                        action: "revert",
                        from: &[ProposalStatus::Rejected],
                        to: ProposalStatus::Pending,
                        actor,
                        comment: None,
                        applied_content: None,
                    })
                    .await?;
                Ok(ReviewOutcome {
                    proposal: outcome.proposal,
                    apply_error: None,
                })
            }
            ProposalStatus::Approved => {
                let outcome = self
                    .store
                    .transition(TransitionRequest {
                        id,
                        action: "revert",
                        from: &[ProposalStatus::Approved],
                        to: ProposalStatus::Pending,
                        actor,
                        comment: None,
                        applied_content: Some(&proposal.original_content),
                    })
                    .await?;

                let target = self.targets.target(proposal.review_source);
                let apply_error = match target
                    .undo(&proposal.group_id, &proposal.original_content)
                    .await
                {
                    Ok(()) => {
                        self.mark_applied(outcome.audit_id).await;
                        None
                    }
                    Err(e) => {
                        warn!(
                            "Proposal {} reverted but {} undo failed: {}",
                            id, proposal.review_source, e
                        );
                        Some(e.to_string())
                    }
                };

                Ok(ReviewOutcome {
                    proposal: outcome.proposal,
                    apply_error,
                })
            }
        }
    }

    /// Flip the audit record's applied flag once the side effect landed.
    /// The decision already committed, so a bookkeeping failure here only
    /// gets logged.
    async fn mark_applied(&self, audit_id: i64) {
        if let Err(e) = self.store.mark_audit_applied(audit_id).await {
            warn!("Failed to mark audit record {} applied: {}", audit_id, e);
        }
    }
}
