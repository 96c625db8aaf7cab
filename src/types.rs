//! Shared types used across modules
//!
//! This module contains the proposal value types and error taxonomy that
//! are used by multiple modules to avoid circular dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which learning subsystem produced a proposal.
///
/// The set is closed: each variant maps to exactly one apply target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSource {
    StyleLearning,
    PersonaLearning,
    Traditional,
    Jargon,
    SocialRelation,
}

impl ReviewSource {
    /// Convert to the string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewSource::StyleLearning => "style_learning",
            ReviewSource::PersonaLearning => "persona_learning",
            ReviewSource::Traditional => "traditional",
            ReviewSource::Jargon => "jargon",
            ReviewSource::SocialRelation => "social_relation",
        }
    }

    /// Parse from the stored string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "style_learning" => Some(ReviewSource::StyleLearning),
            "persona_learning" => Some(ReviewSource::PersonaLearning),
            "traditional" => Some(ReviewSource::Traditional),
            "jargon" => Some(ReviewSource::Jargon),
            "social_relation" => Some(ReviewSource::SocialRelation),
            _ => None,
        }
    }

    /// All known sources
    pub fn all() -> &'static [ReviewSource] {
        &[
            ReviewSource::StyleLearning,
            ReviewSource::PersonaLearning,
            ReviewSource::Traditional,
            ReviewSource::Jargon,
            ReviewSource::SocialRelation,
        ]
    }
}

impl std::fmt::Display for ReviewSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review lifecycle status of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProposalStatus::Pending),
            "approved" => Some(ProposalStatus::Approved),
            "rejected" => Some(ProposalStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A candidate change to the bot's behavior awaiting human review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Opaque unique identifier, immutable
    pub id: String,
    pub review_source: ReviewSource,
    /// Chat group/channel the change is scoped to
    pub group_id: String,
    /// Snapshot of the thing being changed, taken at proposal time.
    /// Never mutated after creation.
    pub original_content: String,
    pub proposed_content: String,
    /// Supporting evidence from the producer, display only
    pub features_content: Option<String>,
    /// Producer-supplied confidence in [0, 1]; never recomputed here
    pub confidence_score: Option<f64>,
    /// Human-readable justification from the producer
    pub reason: String,
    pub status: ProposalStatus,
    pub reviewer_comment: Option<String>,
    /// Set when status leaves pending, cleared again on revert
    pub review_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Source-specific extra fields (e.g. message counts analyzed)
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Producer-side input for creating a proposal.
///
/// `id` and `created_at` are assigned by the store when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProposal {
    pub id: Option<String>,
    pub review_source: Option<ReviewSource>,
    pub group_id: String,
    pub original_content: String,
    pub proposed_content: String,
    pub features_content: Option<String>,
    pub confidence_score: Option<f64>,
    pub reason: String,
    pub created_at: Option<DateTime<Utc>>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl NewProposal {
    /// Minimal constructor; the rest via struct update syntax
    pub fn new(
        review_source: ReviewSource,
        group_id: impl Into<String>,
        original_content: impl Into<String>,
        proposed_content: impl Into<String>,
    ) -> Self {
        Self {
            review_source: Some(review_source),
            group_id: group_id.into(),
            original_content: original_content.into(),
            proposed_content: proposed_content.into(),
            ..Default::default()
        }
    }

    /// Check required fields before any store write.
    ///
    /// `original_content` may legitimately be empty (nothing existed yet),
    /// but `group_id` and `proposed_content` must carry a value, and the
    /// confidence score must stay inside [0, 1] when present.
    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.review_source.is_none() {
            return Err(ReviewError::Validation("review_source is required".into()));
        }
        if self.group_id.trim().is_empty() {
            return Err(ReviewError::Validation("group_id is required".into()));
        }
        if self.proposed_content.is_empty() {
            return Err(ReviewError::Validation(
                "proposed_content is required".into(),
            ));
        }
        if let Some(score) = self.confidence_score {
            if !(0.0..=1.0).contains(&score) || score.is_nan() {
                return Err(ReviewError::Validation(format!(
                    "confidence_score {} outside [0, 1]",
                    score
                )));
            }
        }
        Ok(())
    }
}

/// Error taxonomy for the review pipeline.
///
/// Apply/undo failures are deliberately absent: the status transition
/// commits regardless, so they ride back on `ReviewOutcome` instead of
/// failing the call.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("proposal not found: {0}")]
    NotFound(String),

    #[error("proposal {id} is {status}, cannot {action}")]
    InvalidTransition {
        id: String,
        status: ProposalStatus,
        action: &'static str,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Store(#[from] rusqlite::Error),
}

impl ReviewError {
    /// True when retrying the same call cannot succeed
    pub fn is_permanent(&self) -> bool {
        !matches!(self, ReviewError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip() {
        for source in ReviewSource::all() {
            assert_eq!(ReviewSource::parse(source.as_str()), Some(*source));
        }
        assert_eq!(ReviewSource::parse("unknown"), None);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ProposalStatus::Pending,
            ProposalStatus::Approved,
            ProposalStatus::Rejected,
        ] {
            assert_eq!(ProposalStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_validate_requires_group_and_content() {
        let mut p = NewProposal::new(ReviewSource::Jargon, "g1", "", "forbidden word: yyds");
        assert!(p.validate().is_ok());

        p.group_id = "  ".into();
        assert!(matches!(p.validate(), Err(ReviewError::Validation(_))));

        let empty = NewProposal::new(ReviewSource::Jargon, "g1", "", "");
        assert!(matches!(empty.validate(), Err(ReviewError::Validation(_))));
    }

    #[test]
    fn test_validate_confidence_bounds() {
        let mut p = NewProposal::new(ReviewSource::StyleLearning, "g1", "", "be brief");
        p.confidence_score = Some(0.82);
        assert!(p.validate().is_ok());

        p.confidence_score = Some(1.5);
        assert!(p.validate().is_err());

        p.confidence_score = Some(-0.1);
        assert!(p.validate().is_err());

        // absence is distinct from zero and always fine
        p.confidence_score = None;
        assert!(p.validate().is_ok());
    }
}
