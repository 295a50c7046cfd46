// ABOUTME: Report log storage layer using SQLite
// ABOUTME: Append-only per-ticket reports with a requester-gated viewed flag

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::debug;

use guichet_storage::StorageError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Only the ticket's requester may mark its reports viewed")]
    Forbidden,
    #[error("Ticket not found")]
    TicketNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Report,
    Rejection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub ticket_id: i64,
    pub author_id: i64,
    pub reason: String,
    pub kind: ReportKind,
    pub attachment_path: Option<String>,
    pub reported_at: DateTime<Utc>,
    pub viewed: bool,
}

pub struct ReportStorage {
    pool: SqlitePool,
}

impl ReportStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a report to a ticket. Reason, kind and attachment are immutable
    /// from here on; only the viewed flag may change later.
    pub async fn file_report(
        &self,
        ticket_id: i64,
        author_id: i64,
        reason: &str,
        kind: ReportKind,
        attachment_path: Option<&str>,
    ) -> Result<Report, ReportError> {
        debug!("Filing {:?} report on ticket {}", kind, ticket_id);

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        if exists.is_none() {
            return Err(ReportError::TicketNotFound);
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO reports (ticket_id, author_id, reason, kind, attachment_path, reported_at, viewed)
            VALUES (?, ?, ?, ?, ?, ?, FALSE)
            "#,
        )
        .bind(ticket_id)
        .bind(author_id)
        .bind(reason)
        .bind(kind)
        .bind(attachment_path)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_report(result.last_insert_rowid()).await
    }

    pub async fn get_report(&self, report_id: i64) -> Result<Report, ReportError> {
        let row = sqlx::query("SELECT * FROM reports WHERE id = ?")
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(Self::row_to_report(&row).map_err(StorageError::Sqlx)?),
            None => Err(ReportError::Storage(StorageError::NotFound)),
        }
    }

    /// All reports for a ticket, oldest first.
    pub async fn list_by_ticket(&self, ticket_id: i64) -> Result<Vec<Report>, ReportError> {
        let rows = sqlx::query(
            "SELECT * FROM reports WHERE ticket_id = ? ORDER BY reported_at ASC, id ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let reports = rows
            .iter()
            .map(Self::row_to_report)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Sqlx)?;
        Ok(reports)
    }

    /// Mark every report on a ticket as viewed. Only the ticket's requester
    /// may do this; returns the number of reports flipped.
    pub async fn mark_all_viewed(
        &self,
        ticket_id: i64,
        requester_id: i64,
    ) -> Result<u64, ReportError> {
        let demandeur_id: Option<i64> =
            sqlx::query_scalar("SELECT demandeur_id FROM tickets WHERE id = ?")
                .bind(ticket_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::Sqlx)?;

        match demandeur_id {
            None => Err(ReportError::TicketNotFound),
            Some(demandeur_id) if demandeur_id != requester_id => Err(ReportError::Forbidden),
            Some(_) => {
                let result = sqlx::query(
                    "UPDATE reports SET viewed = TRUE WHERE ticket_id = ? AND viewed = FALSE",
                )
                .bind(ticket_id)
                .execute(&self.pool)
                .await
                .map_err(StorageError::Sqlx)?;

                debug!(
                    "Marked {} reports viewed on ticket {}",
                    result.rows_affected(),
                    ticket_id
                );
                Ok(result.rows_affected())
            }
        }
    }

    /// Whether any report exists for a ticket.
    pub async fn has_reports(&self, ticket_id: i64) -> Result<bool, ReportError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE ticket_id = ?")
            .bind(ticket_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        Ok(count > 0)
    }

    fn row_to_report(row: &sqlx::sqlite::SqliteRow) -> Result<Report, sqlx::Error> {
        Ok(Report {
            id: row.try_get("id")?,
            ticket_id: row.try_get("ticket_id")?,
            author_id: row.try_get("author_id")?,
            reason: row.try_get("reason")?,
            kind: row.try_get("kind")?,
            attachment_path: row.try_get("attachment_path")?,
            reported_at: row.try_get("reported_at")?,
            viewed: row.try_get("viewed")?,
        })
    }
}
