//! persona-review - Review Pipeline Library
//!
//! The human-in-the-loop side of a self-learning group-chat bot:
//! - Durable queue of change proposals from the learning subsystems
//! - Review state machine with full audit history and revert
//! - Diff rendering for reviewer inspection
//! - Batch decisions and paged listings
//! - File-backed live stores (persona, style, jargon, rules, social)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use persona_review::review::{ProposalStore, ReviewEngine};
//! use persona_review::targets::ApplyRegistry;
//! use persona_review::types::{NewProposal, ReviewSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(ProposalStore::open("proposals.db").await?);
//!     let targets = Arc::new(ApplyRegistry::open("live".as_ref())?);
//!     let engine = ReviewEngine::new(Arc::clone(&store), targets);
//!
//!     let p = store
//!         .create(NewProposal::new(ReviewSource::Jargon, "g1", "", "yyds"))
//!         .await?;
//!     engine.approve(&p.id, "reviewer", None, None).await?;
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod types;
pub mod targets; // Must come before review since the engine dispatches into it
pub mod review;
pub mod config;
pub mod cli;

// Re-export commonly used types for convenience
pub use review::{
    BatchCoordinator, PaginationGateway, ProposalStore, ReviewEngine, ReviewOutcome,
};

pub use types::{NewProposal, Proposal, ProposalStatus, ReviewError, ReviewSource};
