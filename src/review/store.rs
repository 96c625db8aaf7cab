//! SQLite-backed storage for change proposals and their audit history
//!
//! The proposal table is the single source of truth for review status.
//! Status never changes through plain updates: every transition goes
//! through [`ProposalStore::transition`], which performs a compare-and-set
//! on the current status and writes the matching audit record inside the
//! same transaction.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::types::{NewProposal, Proposal, ProposalStatus, ReviewError, ReviewSource};

use super::audit::AuditTrail;

/// Durable store for pending and reviewed proposals
pub struct ProposalStore {
    conn: Arc<Mutex<Connection>>,
}

/// One committed state transition: the updated proposal plus the id of
/// the audit record written alongside it.
#[derive(Debug)]
pub struct TransitionOutcome {
    pub proposal: Proposal,
    pub audit_id: i64,
}

/// Parameters for a single atomic transition
pub(crate) struct TransitionRequest<'a> {
    pub id: &'a str,
    /// Verb used in error messages ("approve", "reject", "revert")
    pub action: &'static str,
    /// Statuses the proposal must currently be in
    pub from: &'a [ProposalStatus],
    pub to: ProposalStatus,
    pub actor: &'a str,
    pub comment: Option<&'a str>,
    /// Content recorded as materialized; None for transitions that do not
    /// touch a downstream store
    pub applied_content: Option<&'a str>,
}

/// Aggregate queue counters for display
#[derive(Debug, Clone)]
pub struct ReviewStats {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub pending_by_source: BTreeMap<String, u64>,
    pub oldest_pending: Option<String>,
    pub newest_pending: Option<String>,
}

impl ProposalStore {
    /// Open (or create) the store at the given path
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL mode for better concurrent read behavior
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Change proposals produced by the learning subsystems
            CREATE TABLE IF NOT EXISTS proposals (
                id TEXT PRIMARY KEY,
                review_source TEXT NOT NULL,
                group_id TEXT NOT NULL,
                original_content TEXT NOT NULL,
                proposed_content TEXT NOT NULL,
                features_content TEXT,
                confidence_score REAL,
                reason TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                reviewer_comment TEXT,
                review_time TEXT,
                created_at TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            );

            -- Append-only transition history
            CREATE TABLE IF NOT EXISTS audit_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                proposal_id TEXT NOT NULL,
                from_status TEXT NOT NULL,
                to_status TEXT NOT NULL,
                actor TEXT NOT NULL,
                comment TEXT,
                applied_content TEXT,
                applied INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_proposals_status ON proposals(status, created_at);
            CREATE INDEX IF NOT EXISTS idx_proposals_group ON proposals(group_id, status);
            CREATE INDEX IF NOT EXISTS idx_audit_proposal ON audit_records(proposal_id, id);
        "#,
        )?;

        Ok(())
    }

    /// Read surface over the audit history, sharing this store's connection
    pub fn audit_trail(&self) -> AuditTrail {
        AuditTrail::new(Arc::clone(&self.conn))
    }

    /// Insert a new proposal with status `pending`.
    ///
    /// Assigns `id` and `created_at` when the producer left them unset.
    pub async fn create(&self, new: NewProposal) -> Result<Proposal, ReviewError> {
        new.validate()?;
        let Some(source) = new.review_source else {
            return Err(ReviewError::Validation("review_source is required".into()));
        };

        let id = new.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let created_at = new.created_at.unwrap_or_else(Utc::now);
        // BTreeMap of JSON values always serializes
        let metadata_json =
            serde_json::to_string(&new.metadata).unwrap_or_else(|_| "{}".to_string());

        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO proposals
               (id, review_source, group_id, original_content, proposed_content,
                features_content, confidence_score, reason, status, created_at, metadata)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?9, ?10)"#,
            params![
                id,
                source.as_str(),
                new.group_id,
                new.original_content,
                new.proposed_content,
                new.features_content,
                new.confidence_score,
                new.reason,
                created_at.to_rfc3339(),
                metadata_json,
            ],
        )?;
        drop(conn);

        info!("Queued {} proposal {} for group {}", source, id, new.group_id);

        Ok(Proposal {
            id,
            review_source: source,
            group_id: new.group_id,
            original_content: new.original_content,
            proposed_content: new.proposed_content,
            features_content: new.features_content,
            confidence_score: new.confidence_score,
            reason: new.reason,
            status: ProposalStatus::Pending,
            reviewer_comment: None,
            review_time: None,
            created_at,
            metadata: new.metadata,
        })
    }

    /// Fetch a proposal by id
    pub async fn get(&self, id: &str) -> Result<Proposal, ReviewError> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = ?1"
        ))?;

        stmt.query_row(params![id], row_to_proposal)
            .optional()?
            .ok_or_else(|| ReviewError::NotFound(id.to_string()))
    }

    /// List pending proposals oldest first, with the total pending count.
    ///
    /// Page and total come from one connection acquisition, so the count
    /// always matches the snapshot the page was read from.
    pub async fn list_pending(
        &self,
        group_id: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Proposal>, u64), ReviewError> {
        let conn = self.conn.lock().await;

        let (total, items) = match group_id {
            Some(gid) => {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM proposals WHERE status = 'pending' AND group_id = ?1",
                    params![gid],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {PROPOSAL_COLUMNS} FROM proposals
                     WHERE status = 'pending' AND group_id = ?1
                     ORDER BY created_at ASC, id ASC
                     LIMIT ?2 OFFSET ?3"
                ))?;
                let items = stmt
                    .query_map(params![gid, limit, offset], row_to_proposal)?
                    .collect::<Result<Vec<_>, _>>()?;
                (total, items)
            }
            None => {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM proposals WHERE status = 'pending'",
                    [],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {PROPOSAL_COLUMNS} FROM proposals
                     WHERE status = 'pending'
                     ORDER BY created_at ASC, id ASC
                     LIMIT ?1 OFFSET ?2"
                ))?;
                let items = stmt
                    .query_map(params![limit, offset], row_to_proposal)?
                    .collect::<Result<Vec<_>, _>>()?;
                (total, items)
            }
        };

        Ok((items, total as u64))
    }

    /// List reviewed proposals, newest decision first.
    ///
    /// `filter` narrows to approved or rejected; `None` returns both.
    pub async fn list_reviewed(
        &self,
        group_id: Option<&str>,
        filter: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, ReviewError> {
        if filter == Some(ProposalStatus::Pending) {
            return Err(ReviewError::Validation(
                "reviewed filter must be approved or rejected".into(),
            ));
        }

        let status_clause = match filter {
            Some(s) => format!("status = '{}'", s.as_str()),
            None => "status != 'pending'".to_string(),
        };
        let group_clause = match group_id {
            Some(_) => " AND group_id = ?1",
            None => "",
        };
        let sql = format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals
             WHERE {status_clause}{group_clause}
             ORDER BY review_time DESC, id ASC"
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(&sql)?;
        let items = match group_id {
            Some(gid) => stmt
                .query_map(params![gid], row_to_proposal)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], row_to_proposal)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(items)
    }

    /// Remove a proposal in any status.
    ///
    /// Deletion is not a review decision: it leaves only a `deleted`
    /// marker in the audit history and never counts as a rejection.
    pub async fn delete(&self, id: &str, actor: &str) -> Result<bool, ReviewError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let current: Option<String> = tx
            .query_row(
                "SELECT status FROM proposals WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(from_status) = current else {
            return Ok(false);
        };

        tx.execute("DELETE FROM proposals WHERE id = ?1", params![id])?;
        tx.execute(
            r#"INSERT INTO audit_records
               (proposal_id, from_status, to_status, actor, created_at)
               VALUES (?1, ?2, 'deleted', ?3, ?4)"#,
            params![id, from_status, actor, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        info!("Deleted proposal {} (was {})", id, from_status);
        Ok(true)
    }

    /// Atomically move a proposal between statuses and record the
    /// transition.
    ///
    /// The status check and update run inside one transaction together
    /// with the audit insert: either the new status and its audit record
    /// both persist, or neither does. Concurrent conflicting transitions
    /// resolve to exactly one winner; the loser gets `InvalidTransition`.
    pub(crate) async fn transition(
        &self,
        req: TransitionRequest<'_>,
    ) -> Result<TransitionOutcome, ReviewError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let current: Option<String> = tx
            .query_row(
                "SELECT status FROM proposals WHERE id = ?1",
                params![req.id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(current) = current else {
            return Err(ReviewError::NotFound(req.id.to_string()));
        };
        let current = ProposalStatus::parse(&current).unwrap_or(ProposalStatus::Pending);

        if !req.from.contains(&current) {
            return Err(ReviewError::InvalidTransition {
                id: req.id.to_string(),
                status: current,
                action: req.action,
            });
        }

        // Compare-and-set on the status we just observed
        let changed = if req.to == ProposalStatus::Pending {
            // Revert: the proposal goes back to looking un-reviewed
            tx.execute(
                "UPDATE proposals
                 SET status = 'pending', review_time = NULL, reviewer_comment = NULL
                 WHERE id = ?1 AND status = ?2",
                params![req.id, current.as_str()],
            )?
        } else {
            tx.execute(
                "UPDATE proposals
                 SET status = ?2, review_time = ?3, reviewer_comment = ?4
                 WHERE id = ?1 AND status = ?5",
                params![
                    req.id,
                    req.to.as_str(),
                    now.to_rfc3339(),
                    req.comment,
                    current.as_str()
                ],
            )?
        };

        if changed != 1 {
            return Err(ReviewError::InvalidTransition {
                id: req.id.to_string(),
                status: current,
                action: req.action,
            });
        }

        // applied starts false and is flipped only after the downstream
        // call succeeds; NULL means no materialization was involved
        let applied: Option<bool> = req.applied_content.map(|_| false);
        tx.execute(
            r#"INSERT INTO audit_records
               (proposal_id, from_status, to_status, actor, comment,
                applied_content, applied, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                req.id,
                current.as_str(),
                req.to.as_str(),
                req.actor,
                req.comment,
                req.applied_content,
                applied,
                now.to_rfc3339(),
            ],
        )?;
        let audit_id = tx.last_insert_rowid();

        let mut stmt = tx.prepare_cached(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = ?1"
        ))?;
        let proposal = stmt.query_row(params![req.id], row_to_proposal)?;
        drop(stmt);

        tx.commit()?;

        info!(
            "Proposal {} {} -> {} by {}",
            req.id, current, req.to, req.actor
        );

        Ok(TransitionOutcome { proposal, audit_id })
    }

    /// Mark an audit record's materialization as completed
    pub(crate) async fn mark_audit_applied(&self, audit_id: i64) -> Result<(), ReviewError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE audit_records SET applied = 1 WHERE id = ?1",
            params![audit_id],
        )?;
        Ok(())
    }

    /// Queue statistics for display
    pub async fn stats(&self, group_id: Option<&str>) -> Result<ReviewStats, ReviewError> {
        let conn = self.conn.lock().await;

        let count_status = |status: &str| -> rusqlite::Result<i64> {
            match group_id {
                Some(gid) => conn.query_row(
                    "SELECT COUNT(*) FROM proposals WHERE status = ?1 AND group_id = ?2",
                    params![status, gid],
                    |row| row.get(0),
                ),
                None => conn.query_row(
                    "SELECT COUNT(*) FROM proposals WHERE status = ?1",
                    params![status],
                    |row| row.get(0),
                ),
            }
        };

        let pending = count_status("pending")? as u64;
        let approved = count_status("approved")? as u64;
        let rejected = count_status("rejected")? as u64;

        let mut pending_by_source = BTreeMap::new();
        {
            let (sql, use_gid) = match group_id {
                Some(_) => (
                    "SELECT review_source, COUNT(*) FROM proposals
                     WHERE status = 'pending' AND group_id = ?1 GROUP BY review_source",
                    true,
                ),
                None => (
                    "SELECT review_source, COUNT(*) FROM proposals
                     WHERE status = 'pending' GROUP BY review_source",
                    false,
                ),
            };
            let mut stmt = conn.prepare_cached(sql)?;
            let rows: Vec<(String, i64)> = if use_gid {
                stmt.query_map(params![group_id.unwrap()], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<Result<_, _>>()?
            } else {
                stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<_, _>>()?
            };
            for (source, count) in rows {
                pending_by_source.insert(source, count as u64);
            }
        }

        let oldest_pending: Option<String> = conn
            .query_row(
                "SELECT MIN(created_at) FROM proposals WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )
            .ok()
            .flatten();
        let newest_pending: Option<String> = conn
            .query_row(
                "SELECT MAX(created_at) FROM proposals WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )
            .ok()
            .flatten();

        Ok(ReviewStats {
            pending,
            approved,
            rejected,
            pending_by_source,
            oldest_pending,
            newest_pending,
        })
    }
}

const PROPOSAL_COLUMNS: &str = "id, review_source, group_id, original_content, proposed_content, \
     features_content, confidence_score, reason, status, reviewer_comment, \
     review_time, created_at, metadata";

/// Map a proposal row in `PROPOSAL_COLUMNS` order
fn row_to_proposal(row: &Row<'_>) -> rusqlite::Result<Proposal> {
    let source_str: String = row.get(1)?;
    let status_str: String = row.get(8)?;
    let review_time_str: Option<String> = row.get(10)?;
    let created_at_str: String = row.get(11)?;
    let metadata_json: String = row.get(12)?;

    Ok(Proposal {
        id: row.get(0)?,
        review_source: ReviewSource::parse(&source_str).unwrap_or(ReviewSource::Traditional),
        group_id: row.get(2)?,
        original_content: row.get(3)?,
        proposed_content: row.get(4)?,
        features_content: row.get(5)?,
        confidence_score: row.get(6)?,
        reason: row.get(7)?,
        status: ProposalStatus::parse(&status_str).unwrap_or(ProposalStatus::Pending),
        reviewer_comment: row.get(9)?,
        review_time: review_time_str
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
    })
}
