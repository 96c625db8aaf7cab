//! Append-only transition history
//!
//! Every state transition (and deletion) leaves one row behind: who moved
//! the proposal, from and to which status, and what content was actually
//! materialized. Revert does not erase earlier records; it appends its own.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::types::ReviewError;

/// One recorded state transition.
///
/// Statuses are stored as plain strings: besides the review statuses the
/// history also carries `deleted` markers, which are not proposal states.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub proposal_id: String,
    pub from_status: String,
    pub to_status: String,
    /// `reviewer` for human decisions, `system` for producer-side events
    pub actor: String,
    pub comment: Option<String>,
    /// Content actually written downstream; differs from the proposal's
    /// `proposed_content` when the reviewer edited before approving
    pub applied_content: Option<String>,
    /// `Some(true)` once the downstream apply/undo succeeded,
    /// `Some(false)` when it was attempted and failed (or never finished),
    /// `None` when the transition involved no materialization
    pub applied: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// Read-only view over the audit table, sharing the store's connection
pub struct AuditTrail {
    conn: Arc<Mutex<Connection>>,
}

impl AuditTrail {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Full history for one proposal, oldest first
    pub async fn history(&self, proposal_id: &str) -> Result<Vec<AuditRecord>, ReviewError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, proposal_id, from_status, to_status, actor, comment,
                    applied_content, applied, created_at
             FROM audit_records WHERE proposal_id = ?1
             ORDER BY id ASC",
        )?;
        let records = stmt
            .query_map(params![proposal_id], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Most recent transitions across all proposals, newest first
    pub async fn recent(&self, limit: u64) -> Result<Vec<AuditRecord>, ReviewError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, proposal_id, from_status, to_status, actor, comment,
                    applied_content, applied, created_at
             FROM audit_records
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let applied: Option<i64> = row.get(7)?;
    let created_at_str: String = row.get(8)?;

    Ok(AuditRecord {
        id: row.get(0)?,
        proposal_id: row.get(1)?,
        from_status: row.get(2)?,
        to_status: row.get(3)?,
        actor: row.get(4)?,
        comment: row.get(5)?,
        applied_content: row.get(6)?,
        applied: applied.map(|v| v != 0),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
