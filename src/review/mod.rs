//! Learning-Proposal Review Pipeline
//!
//! Takes candidate behavior changes produced by the learning subsystems,
//! holds them in a durable queue, and routes every one through a human
//! decision before anything reaches the bot's live stores.

pub mod audit;
pub mod batch;
pub mod diff;
pub mod engine;
pub mod page;
pub mod store;

pub use audit::{AuditRecord, AuditTrail};
pub use batch::{BatchCoordinator, BatchFailure, BatchOutcome, ReviewAction};
pub use diff::{diff, DiffKind, DiffPreview, DiffSegment, RenderedDiff, SegmentKind};
pub use engine::{ReviewEngine, ReviewOutcome};
pub use page::{Page, PaginationGateway};
pub use store::{ProposalStore, ReviewStats, TransitionOutcome};
