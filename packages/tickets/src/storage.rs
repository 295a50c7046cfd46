// ABOUTME: Ticket storage layer using SQLite
// ABOUTME: CRUD, comment-log operations, dashboard counts, reminder query

use chrono::{Duration, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use guichet_core::{RequestType, StatusKind};
use guichet_storage::{StorageError, StorageResult};

use crate::comments::{self, CommentEntry, CommentError};
use crate::types::{CategoryCount, StatusCount, Ticket, TicketCreateInput, TicketFilter};

pub struct TicketStorage {
    pool: SqlitePool,
}

impl TicketStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new ticket in the given status. Field validation and status
    /// resolution are the workflow engine's concern; this layer persists.
    pub async fn create_ticket(
        &self,
        input: TicketCreateInput,
        created_by: i64,
        status_id: i64,
    ) -> StorageResult<Ticket> {
        let now = Utc::now();

        debug!("Creating ticket '{}' for demandeur {}", input.title, input.demandeur_id);

        let result = sqlx::query(
            r#"
            INSERT INTO tickets (
                title, description, comment, request_type,
                demandeur_id, created_by, societe_id, service_id,
                status_id, attachment_paths, created_at, updated_at
            ) VALUES (?, ?, '', ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.request_type.unwrap_or_default().as_str())
        .bind(input.demandeur_id)
        .bind(created_by)
        .bind(input.societe_id)
        .bind(input.service_id)
        .bind(status_id)
        .bind(
            input
                .attachment_paths
                .as_ref()
                .map(|paths| serde_json::to_string(paths))
                .transpose()?,
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_ticket(result.last_insert_rowid())
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn get_ticket(&self, ticket_id: i64) -> StorageResult<Option<Ticket>> {
        let row = sqlx::query("SELECT * FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.map(|row| Self::row_to_ticket(&row)).transpose()
    }

    pub async fn list_tickets(&self, filter: &TicketFilter) -> StorageResult<Vec<Ticket>> {
        let mut query = String::from("SELECT * FROM tickets WHERE 1 = 1");

        if filter.status_id.is_some() {
            query.push_str(" AND status_id = ?");
        }
        if filter.demandeur_id.is_some() {
            query.push_str(" AND demandeur_id = ?");
        }
        if filter.executant_id.is_some() {
            query.push_str(" AND executant_id = ?");
        }
        query.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = filter.offset {
            query.push_str(&format!(" OFFSET {}", offset));
        }

        let mut q = sqlx::query(&query);
        if let Some(status_id) = filter.status_id {
            q = q.bind(status_id);
        }
        if let Some(demandeur_id) = filter.demandeur_id {
            q = q.bind(demandeur_id);
        }
        if let Some(executant_id) = filter.executant_id {
            q = q.bind(executant_id);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(StorageError::Sqlx)?;
        rows.iter().map(Self::row_to_ticket).collect()
    }

    /// Physical delete. The workflow engine owns the who/when guards;
    /// reports cascade through the foreign key.
    pub async fn delete_ticket(&self, ticket_id: i64) -> StorageResult<bool> {
        debug!("Deleting ticket: {}", ticket_id);

        let result = sqlx::query("DELETE FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Comment log ====================

    pub async fn append_comment(
        &self,
        ticket_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<(), CommentError> {
        let log = self
            .comment_log(ticket_id)
            .await?
            .ok_or(CommentError::TicketNotFound)?;

        let updated = comments::append_entry(&log, author_id, Utc::now(), content);
        self.store_comment_log(ticket_id, &updated).await?;
        Ok(())
    }

    pub async fn list_comments(&self, ticket_id: i64) -> Result<Vec<CommentEntry>, CommentError> {
        let log = self
            .comment_log(ticket_id)
            .await?
            .ok_or(CommentError::TicketNotFound)?;
        Ok(comments::parse_log(&log, Utc::now()))
    }

    pub async fn edit_comment(
        &self,
        ticket_id: i64,
        fingerprint: &str,
        author_id: i64,
        new_content: &str,
    ) -> Result<(), CommentError> {
        let log = self
            .comment_log(ticket_id)
            .await?
            .ok_or(CommentError::TicketNotFound)?;

        let updated = comments::edit_entry(&log, fingerprint, author_id, new_content)?;
        self.store_comment_log(ticket_id, &updated).await?;
        Ok(())
    }

    async fn comment_log(&self, ticket_id: i64) -> StorageResult<Option<String>> {
        let log: Option<String> = sqlx::query_scalar("SELECT comment FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        Ok(log)
    }

    async fn store_comment_log(&self, ticket_id: i64, log: &str) -> StorageResult<()> {
        sqlx::query("UPDATE tickets SET comment = ?, updated_at = ? WHERE id = ?")
            .bind(log)
            .bind(Utc::now())
            .bind(ticket_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        Ok(())
    }

    // ==================== Dashboard queries ====================

    pub async fn count_by_status(&self) -> StorageResult<Vec<StatusCount>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id AS status_id, s.designation AS designation, COUNT(t.id) AS count
            FROM statuses s
            LEFT JOIN tickets t ON t.status_id = s.id
            GROUP BY s.id
            ORDER BY s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter()
            .map(|row| {
                Ok(StatusCount {
                    status_id: row.try_get("status_id")?,
                    designation: row.try_get("designation")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    pub async fn count_by_category(&self) -> StorageResult<Vec<CategoryCount>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id AS category_id, c.designation AS designation, COUNT(t.id) AS count
            FROM tickets t
            LEFT JOIN categories c ON t.category_id = c.id
            GROUP BY c.id
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter()
            .map(|row| {
                Ok(CategoryCount {
                    category_id: row.try_get("category_id")?,
                    designation: row.try_get("designation")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    /// Open tickets already past their expected end date.
    pub async fn overdue_count(&self) -> StorageResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tickets t
            JOIN statuses s ON t.status_id = s.id
            WHERE t.expected_end_date IS NOT NULL
              AND t.expected_end_date < ?
              AND s.designation NOT IN (?, ?)
            "#,
        )
        .bind(Utc::now())
        .bind(StatusKind::Closed.designation())
        .bind(StatusKind::Rejected.designation())
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;
        Ok(count)
    }

    /// Tickets whose expected end falls within the next 24 hours and that
    /// are not yet closed. Consumed by the external reminder job; read-only.
    pub async fn tickets_ending_within_24h(&self) -> StorageResult<Vec<Ticket>> {
        let now = Utc::now();
        let horizon = now + Duration::hours(24);

        let rows = sqlx::query(
            r#"
            SELECT t.*
            FROM tickets t
            JOIN statuses s ON t.status_id = s.id
            WHERE t.expected_end_date IS NOT NULL
              AND t.expected_end_date > ?
              AND t.expected_end_date <= ?
              AND s.designation != ?
            ORDER BY t.expected_end_date ASC
            "#,
        )
        .bind(now)
        .bind(horizon)
        .bind(StatusKind::Closed.designation())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(Self::row_to_ticket).collect()
    }

    // ==================== Helper Methods ====================

    fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Ticket> {
        let request_type: String = row.try_get("request_type")?;
        let attachment_paths: Option<String> = row.try_get("attachment_paths")?;

        Ok(Ticket {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            comment: row.try_get("comment")?,
            request_type: RequestType::parse(&request_type).unwrap_or_default(),
            category_id: row.try_get("category_id")?,
            location_id: row.try_get("location_id")?,
            priority_id: row.try_get("priority_id")?,
            demandeur_id: row.try_get("demandeur_id")?,
            created_by: row.try_get("created_by")?,
            executant_id: row.try_get("executant_id")?,
            societe_id: row.try_get("societe_id")?,
            service_id: row.try_get("service_id")?,
            status_id: row.try_get("status_id")?,
            attachment_paths: attachment_paths.and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row.try_get("created_at")?,
            start_date: row.try_get("start_date")?,
            expected_end_date: row.try_get("expected_end_date")?,
            actual_end_date: row.try_get("actual_end_date")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{ReportError, ReportKind, ReportStorage};
    use guichet_core::RequestType;
    use guichet_storage::{connect, StorageConfig};

    async fn test_pool() -> SqlitePool {
        connect(&StorageConfig::in_memory()).await.unwrap()
    }

    /// Minimal registry rows a ticket insert depends on.
    async fn seed(pool: &SqlitePool) -> (i64, i64) {
        sqlx::query(
            "INSERT INTO statuses (designation, is_active, created_at, updated_at) VALUES ('Nouveau', TRUE, ?, ?)",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
        let status_id = sqlx::query_scalar("SELECT id FROM statuses WHERE designation = 'Nouveau'")
            .fetch_one(pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO demandeurs (designation, is_active, created_at, updated_at) VALUES ('Marie', TRUE, ?, ?)",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
        let demandeur_id = sqlx::query_scalar("SELECT id FROM demandeurs WHERE designation = 'Marie'")
            .fetch_one(pool)
            .await
            .unwrap();

        (status_id, demandeur_id)
    }

    fn input(demandeur_id: i64) -> TicketCreateInput {
        TicketCreateInput {
            title: "Imprimante en panne".to_string(),
            description: "Plus de toner".to_string(),
            request_type: Some(RequestType::Incident),
            demandeur_id,
            societe_id: None,
            service_id: None,
            attachment_paths: Some(vec!["scan-1.pdf".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_ticket() {
        let pool = test_pool().await;
        let (status_id, demandeur_id) = seed(&pool).await;
        let storage = TicketStorage::new(pool);

        let ticket = storage.create_ticket(input(demandeur_id), 42, status_id).await.unwrap();

        assert_eq!(ticket.title, "Imprimante en panne");
        assert_eq!(ticket.status_id, status_id);
        assert_eq!(ticket.created_by, 42);
        assert!(ticket.actual_end_date.is_none());
        assert_eq!(ticket.attachment_paths.as_deref(), Some(&["scan-1.pdf".to_string()][..]));

        let fetched = storage.get_ticket(ticket.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, ticket.id);
        assert!(storage.get_ticket(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_tickets_with_filter() {
        let pool = test_pool().await;
        let (status_id, demandeur_id) = seed(&pool).await;
        let storage = TicketStorage::new(pool);

        storage.create_ticket(input(demandeur_id), 42, status_id).await.unwrap();
        storage.create_ticket(input(demandeur_id), 42, status_id).await.unwrap();

        let all = storage.list_tickets(&TicketFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let none = storage
            .list_tickets(&TicketFilter {
                demandeur_id: Some(demandeur_id + 1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_comment_append_list_edit() {
        let pool = test_pool().await;
        let (status_id, demandeur_id) = seed(&pool).await;
        let storage = TicketStorage::new(pool);
        let ticket = storage.create_ticket(input(demandeur_id), 42, status_id).await.unwrap();

        storage.append_comment(ticket.id, 42, "Premier commentaire").await.unwrap();
        storage.append_comment(ticket.id, 7, "Réponse du technicien").await.unwrap();

        let comments = storage.list_comments(ticket.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author_id, Some(42));
        assert_eq!(comments[1].content, "Réponse du technicien");

        storage
            .edit_comment(ticket.id, &comments[0].fingerprint, 42, "Commentaire corrigé")
            .await
            .unwrap();
        let comments = storage.list_comments(ticket.id).await.unwrap();
        assert_eq!(comments[0].content, "Commentaire corrigé");
        assert_eq!(comments[1].content, "Réponse du technicien");

        // other authors cannot edit
        let err = storage
            .edit_comment(ticket.id, &comments[1].fingerprint, 42, "pris en otage")
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::Forbidden));
    }

    #[tokio::test]
    async fn test_reports_ordering_and_viewed_flag() {
        let pool = test_pool().await;
        let (status_id, demandeur_id) = seed(&pool).await;
        let tickets = TicketStorage::new(pool.clone());
        let reports = ReportStorage::new(pool);
        let ticket = tickets.create_ticket(input(demandeur_id), 42, status_id).await.unwrap();

        reports
            .file_report(ticket.id, 7, "Pièce en commande", ReportKind::Report, None)
            .await
            .unwrap();
        reports
            .file_report(ticket.id, 7, "Demande hors périmètre", ReportKind::Rejection, Some("devis.pdf"))
            .await
            .unwrap();

        let listed = reports.list_by_ticket(ticket.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].reason, "Pièce en commande");
        assert_eq!(listed[1].kind, ReportKind::Rejection);
        assert!(!listed[0].viewed);

        // only the requester may mark viewed
        let err = reports.mark_all_viewed(ticket.id, 999).await.unwrap_err();
        assert!(matches!(err, ReportError::Forbidden));

        let flipped = reports.mark_all_viewed(ticket.id, demandeur_id).await.unwrap();
        assert_eq!(flipped, 2);
        let listed = reports.list_by_ticket(ticket.id).await.unwrap();
        assert!(listed.iter().all(|report| report.viewed));
    }

    #[tokio::test]
    async fn test_delete_cascades_reports() {
        let pool = test_pool().await;
        let (status_id, demandeur_id) = seed(&pool).await;
        let tickets = TicketStorage::new(pool.clone());
        let reports = ReportStorage::new(pool);
        let ticket = tickets.create_ticket(input(demandeur_id), 42, status_id).await.unwrap();

        reports
            .file_report(ticket.id, 7, "note", ReportKind::Report, None)
            .await
            .unwrap();

        assert!(tickets.delete_ticket(ticket.id).await.unwrap());
        assert!(!reports.has_reports(ticket.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_tickets_ending_within_24h() {
        let pool = test_pool().await;
        let (status_id, demandeur_id) = seed(&pool).await;
        let storage = TicketStorage::new(pool.clone());

        let soon = storage.create_ticket(input(demandeur_id), 42, status_id).await.unwrap();
        let later = storage.create_ticket(input(demandeur_id), 42, status_id).await.unwrap();

        let now = Utc::now();
        sqlx::query("UPDATE tickets SET expected_end_date = ? WHERE id = ?")
            .bind(now + Duration::hours(3))
            .bind(soon.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE tickets SET expected_end_date = ? WHERE id = ?")
            .bind(now + Duration::hours(72))
            .bind(later.id)
            .execute(&pool)
            .await
            .unwrap();

        let ending = storage.tickets_ending_within_24h().await.unwrap();
        assert_eq!(ending.len(), 1);
        assert_eq!(ending[0].id, soon.id);
    }
}
