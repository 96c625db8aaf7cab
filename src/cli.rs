//! CLI interface for persona-review
//!
//! The reviewer console: list the pending queue, inspect a proposal with
//! its rendered diff and history, and drive single or batched decisions.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::Config;
use crate::review::{
    diff, BatchCoordinator, BatchOutcome, PaginationGateway, ProposalStore, ReviewAction,
    ReviewEngine, ReviewOutcome,
};
use crate::targets::ApplyRegistry;
use crate::types::{NewProposal, Proposal, ProposalStatus, ReviewSource};

/// Preview width for queue listings
const LIST_PREVIEW_CHARS: usize = 80;

#[derive(Parser)]
#[command(name = "persona-review")]
#[command(about = "Review queue for self-learned chat bot persona updates", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pending proposals, paged
    Pending {
        /// Restrict to one chat group
        #[arg(short, long)]
        group: Option<String>,
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: u64,
        /// Page size (defaults to the configured value)
        #[arg(short = 's', long)]
        page_size: Option<u64>,
    },
    /// Show one proposal with its full diff and history
    Show {
        /// Proposal id
        id: String,
    },
    /// Approve a pending proposal
    Approve {
        id: String,
        /// Reviewer comment recorded on the decision
        #[arg(short, long)]
        comment: Option<String>,
        /// Apply this content instead of the proposed text
        #[arg(long)]
        content: Option<String>,
    },
    /// Reject a pending proposal
    Reject {
        id: String,
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Undo a decision, returning the proposal to pending
    Revert { id: String },
    /// Remove a proposal without reviewing it
    Delete { id: String },
    /// Apply one action to many proposals (approve, reject or delete)
    Batch {
        /// approve | reject | delete
        action: String,
        /// Proposal ids
        ids: Vec<String>,
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// List reviewed proposals
    Reviewed {
        /// approved | rejected (default: both)
        #[arg(short = 'f', long)]
        status: Option<String>,
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Show the audit history of a proposal
    History { id: String },
    /// Queue a proposal by hand (the learning jobs use the same path)
    Submit {
        /// style_learning | persona_learning | traditional | jargon | social_relation
        #[arg(short, long)]
        source: String,
        #[arg(short, long)]
        group: String,
        /// Snapshot of the content being changed
        #[arg(short, long, default_value = "")]
        original: String,
        #[arg(short, long)]
        proposed: String,
        #[arg(short, long, default_value = "")]
        reason: String,
        #[arg(short, long)]
        confidence: Option<f64>,
        /// Supporting evidence shown to the reviewer
        #[arg(long)]
        features: Option<String>,
        /// Extra metadata as key=value (repeatable)
        #[arg(long = "meta")]
        meta: Vec<String>,
    },
    /// Queue statistics
    Stats {
        #[arg(short, long)]
        group: Option<String>,
    },
}

struct App {
    config: Config,
    store: Arc<ProposalStore>,
    engine: Arc<ReviewEngine>,
    coordinator: BatchCoordinator,
    gateway: PaginationGateway,
}

impl App {
    async fn open() -> Result<Self> {
        let config = Config::load()?;
        let store = Arc::new(ProposalStore::open(config.database_path()?).await?);
        let targets = Arc::new(ApplyRegistry::open(&config.targets_path()?)?);
        let engine = Arc::new(ReviewEngine::new(Arc::clone(&store), targets));
        let coordinator = BatchCoordinator::new(Arc::clone(&engine), Arc::clone(&store));
        let gateway = PaginationGateway::new(Arc::clone(&store));
        Ok(Self {
            config,
            store,
            engine,
            coordinator,
            gateway,
        })
    }

    fn reviewer(&self) -> &str {
        &self.config.review.reviewer
    }
}

/// Entry point called from main
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let app = App::open().await?;

    match cli.command {
        Commands::Pending {
            group,
            page,
            page_size,
        } => {
            let size = page_size.unwrap_or(app.config.review.page_size);
            let result = app.gateway.list_page(group.as_deref(), size, page).await?;

            if result.items.is_empty() {
                println!("No pending proposals on page {} ({} total).", page, result.total);
                return Ok(());
            }

            println!(
                "Pending proposals — page {}/{} ({} total)\n",
                result.page_number,
                result.page_count(),
                result.total
            );
            for p in &result.items {
                let rendered = diff(&p.original_content, &p.proposed_content);
                let preview = rendered.preview(LIST_PREVIEW_CHARS);
                let more = if preview.has_more { " …" } else { "" };
                println!("  {} [{}] group {}", p.id, p.review_source, p.group_id);
                println!("      {}{}", preview.annotate(), more);
                if let Some(score) = p.confidence_score {
                    println!("      confidence: {:.2}", score);
                }
            }
        }

        Commands::Show { id } => {
            let p = app.store.get(&id).await?;
            print_proposal(&p);

            let rendered = diff(&p.original_content, &p.proposed_content);
            println!("\nDiff ({:?}):", rendered.kind);
            println!("{}", rendered.annotate());

            let history = app.store.audit_trail().history(&id).await?;
            if !history.is_empty() {
                println!("\nHistory:");
                for record in &history {
                    print_audit_record(record);
                }
            }
        }

        Commands::Approve { id, comment, content } => {
            let outcome = app
                .engine
                .approve(&id, app.reviewer(), comment.as_deref(), content.as_deref())
                .await?;
            print_outcome("Approved", &outcome);
        }

        Commands::Reject { id, comment } => {
            let outcome = app
                .engine
                .reject(&id, app.reviewer(), comment.as_deref())
                .await?;
            print_outcome("Rejected", &outcome);
        }

        Commands::Revert { id } => {
            let outcome = app.engine.revert(&id, app.reviewer()).await?;
            print_outcome("Reverted", &outcome);
        }

        Commands::Delete { id } => {
            if app.store.delete(&id, app.reviewer()).await? {
                println!("Deleted proposal {}.", id);
            } else {
                println!("Proposal {} not found.", id);
            }
        }

        Commands::Batch { action, ids, comment } => {
            if ids.is_empty() {
                bail!("No proposal ids given");
            }
            let outcome = match action.as_str() {
                "approve" => {
                    app.coordinator
                        .review(&ids, ReviewAction::Approve, app.reviewer(), comment.as_deref())
                        .await
                }
                "reject" => {
                    app.coordinator
                        .review(&ids, ReviewAction::Reject, app.reviewer(), comment.as_deref())
                        .await
                }
                "delete" => app.coordinator.delete(&ids, app.reviewer()).await,
                other => bail!("Unknown batch action '{}' (approve, reject, delete)", other),
            };
            print_batch_outcome(&action, &outcome);
        }

        Commands::Reviewed { status, group } => {
            let filter = match status.as_deref() {
                None => None,
                Some("approved") => Some(ProposalStatus::Approved),
                Some("rejected") => Some(ProposalStatus::Rejected),
                Some(other) => bail!("Unknown status filter '{}'", other),
            };
            let items = app.store.list_reviewed(group.as_deref(), filter).await?;
            if items.is_empty() {
                println!("No reviewed proposals.");
                return Ok(());
            }
            for p in &items {
                let when = p
                    .review_time
                    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_default();
                println!("  {} [{}] {} at {}", p.id, p.review_source, p.status, when);
                if let Some(comment) = &p.reviewer_comment {
                    println!("      comment: {}", comment);
                }
            }
        }

        Commands::History { id } => {
            let history = app.store.audit_trail().history(&id).await?;
            if history.is_empty() {
                println!("No history for proposal {}.", id);
                return Ok(());
            }
            for record in &history {
                print_audit_record(record);
            }
        }

        Commands::Submit {
            source,
            group,
            original,
            proposed,
            reason,
            confidence,
            features,
            meta,
        } => {
            let Some(source) = ReviewSource::parse(&source) else {
                bail!(
                    "Unknown source '{}' (style_learning, persona_learning, traditional, jargon, social_relation)",
                    source
                );
            };
            let mut new = NewProposal::new(source, group, original, proposed);
            new.reason = reason;
            new.confidence_score = confidence;
            new.features_content = features;
            for pair in &meta {
                let Some((key, value)) = pair.split_once('=') else {
                    bail!("Metadata must be key=value, got '{}'", pair);
                };
                new.metadata.insert(
                    key.to_string(),
                    serde_json::Value::String(value.to_string()),
                );
            }

            let p = app.store.create(new).await?;
            println!("Queued proposal {} for group {}.", p.id, p.group_id);
        }

        Commands::Stats { group } => {
            let stats = app.store.stats(group.as_deref()).await?;
            println!("Pending:  {}", stats.pending);
            println!("Approved: {}", stats.approved);
            println!("Rejected: {}", stats.rejected);
            if !stats.pending_by_source.is_empty() {
                println!("\nPending by source:");
                for (source, count) in &stats.pending_by_source {
                    println!("  {:<16} {}", source, count);
                }
            }
            if let Some(oldest) = &stats.oldest_pending {
                println!("\nOldest pending: {}", oldest);
            }
        }
    }

    Ok(())
}

fn print_proposal(p: &Proposal) {
    println!("Proposal {}", p.id);
    println!("  source:     {}", p.review_source);
    println!("  group:      {}", p.group_id);
    println!("  status:     {}", p.status);
    println!("  created:    {}", p.created_at.format("%Y-%m-%d %H:%M UTC"));
    if let Some(score) = p.confidence_score {
        println!("  confidence: {:.2}", score);
    }
    if !p.reason.is_empty() {
        println!("  reason:     {}", p.reason);
    }
    if let Some(features) = &p.features_content {
        println!("  features:   {}", features);
    }
    if let Some(comment) = &p.reviewer_comment {
        println!("  comment:    {}", comment);
    }
    if let Some(time) = p.review_time {
        println!("  reviewed:   {}", time.format("%Y-%m-%d %H:%M UTC"));
    }
    if !p.metadata.is_empty() {
        println!("  metadata:");
        for (key, value) in &p.metadata {
            println!("    {}: {}", key, value);
        }
    }
}

fn print_audit_record(record: &crate::review::AuditRecord) {
    let applied = match record.applied {
        Some(true) => " (applied)",
        Some(false) => " (NOT applied)",
        None => "",
    };
    println!(
        "  {} {} -> {} by {}{}",
        record.created_at.format("%Y-%m-%d %H:%M UTC"),
        record.from_status,
        record.to_status,
        record.actor,
        applied
    );
    if let Some(comment) = &record.comment {
        println!("      comment: {}", comment);
    }
}

fn print_outcome(verb: &str, outcome: &ReviewOutcome) {
    println!("{} proposal {}.", verb, outcome.proposal.id);
    if let Some(error) = &outcome.apply_error {
        println!(
            "Warning: the decision is recorded, but the live store was not updated: {}",
            error
        );
        println!("Fix the store and retry materialization manually.");
    }
}

fn print_batch_outcome(action: &str, outcome: &BatchOutcome) {
    println!(
        "Batch {}: {} succeeded, {} failed.",
        action,
        outcome.succeeded.len(),
        outcome.failed.len()
    );
    for failure in &outcome.failed {
        println!("  {} — {}", failure.id, failure.reason);
    }
}
