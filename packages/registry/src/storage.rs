// ABOUTME: Reference registry storage layer using SQLite
// ABOUTME: Generic active-row CRUD with soft delete and semantic status resolution

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use guichet_core::StatusKind;
use guichet_storage::{StorageError, StorageResult};

use crate::types::{Demandeur, EntityKind, Executant, ReferenceEntity};

/// Priorities seeded alongside the workflow statuses.
const DEFAULT_PRIORITIES: [&str; 4] = ["Basse", "Normale", "Haute", "Critique"];

pub struct ReferenceStorage {
    pool: SqlitePool,
}

impl ReferenceStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== Generic CRUD ====================

    pub async fn create(
        &self,
        kind: EntityKind,
        designation: &str,
    ) -> StorageResult<ReferenceEntity> {
        let designation = designation.trim();
        debug!("Creating {} row: {}", kind.table(), designation);

        let existing: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM {} WHERE designation = ?",
            kind.table()
        ))
        .bind(designation)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if existing.is_some() {
            return Err(StorageError::DuplicateDesignation(designation.to_string()));
        }

        let now = Utc::now();
        let result = sqlx::query(&format!(
            "INSERT INTO {} (designation, is_active, created_at, updated_at) VALUES (?, TRUE, ?, ?)",
            kind.table()
        ))
        .bind(designation)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get(kind, result.last_insert_rowid())
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn get(&self, kind: EntityKind, id: i64) -> StorageResult<Option<ReferenceEntity>> {
        let row = sqlx::query(&format!(
            "SELECT id, designation, is_active, created_at, updated_at FROM {} WHERE id = ?",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        row.map(|row| Self::row_to_entity(&row)).transpose()
    }

    pub async fn list(&self, kind: EntityKind) -> StorageResult<Vec<ReferenceEntity>> {
        let rows = sqlx::query(&format!(
            "SELECT id, designation, is_active, created_at, updated_at FROM {} ORDER BY designation",
            kind.table()
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(Self::row_to_entity).collect()
    }

    /// Active rows only, the set the workflow validates against.
    pub async fn list_active(&self, kind: EntityKind) -> StorageResult<Vec<ReferenceEntity>> {
        let rows = sqlx::query(&format!(
            "SELECT id, designation, is_active, created_at, updated_at FROM {} WHERE is_active = TRUE ORDER BY designation",
            kind.table()
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(Self::row_to_entity).collect()
    }

    pub async fn rename(
        &self,
        kind: EntityKind,
        id: i64,
        designation: &str,
    ) -> StorageResult<ReferenceEntity> {
        debug!("Renaming {} row {}: {}", kind.table(), id, designation);

        sqlx::query(&format!(
            "UPDATE {} SET designation = ?, updated_at = ? WHERE id = ?",
            kind.table()
        ))
        .bind(designation.trim())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get(kind, id).await?.ok_or(StorageError::NotFound)
    }

    /// Soft delete. Rows referenced by tickets stay resolvable but stop being
    /// valid transition targets.
    pub async fn deactivate(&self, kind: EntityKind, id: i64) -> StorageResult<()> {
        debug!("Deactivating {} row {}", kind.table(), id);

        let result = sqlx::query(&format!(
            "UPDATE {} SET is_active = FALSE, updated_at = ? WHERE id = ?",
            kind.table()
        ))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    /// Whether a reference row exists and is active. A missing row reads as
    /// inactive; the caller decides how hard to fail.
    pub async fn is_active(&self, kind: EntityKind, id: i64) -> StorageResult<bool> {
        let active: Option<bool> = sqlx::query_scalar(&format!(
            "SELECT is_active FROM {} WHERE id = ?",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(active.unwrap_or(false))
    }

    // ==================== Status resolution ====================

    /// Resolve a semantic status to its row id. `None` means the reference
    /// row is missing; the workflow engine treats that as a configuration
    /// error, never as a skippable condition.
    pub async fn status_id(&self, kind: StatusKind) -> StorageResult<Option<i64>> {
        let id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM statuses WHERE designation = ?")
                .bind(kind.designation())
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::Sqlx)?;
        Ok(id)
    }

    /// Reverse mapping, for presenting a stored ticket status semantically.
    pub async fn status_kind(&self, status_id: i64) -> StorageResult<Option<StatusKind>> {
        let designation: Option<String> =
            sqlx::query_scalar("SELECT designation FROM statuses WHERE id = ?")
                .bind(status_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::Sqlx)?;

        Ok(designation.as_deref().and_then(StatusKind::from_designation))
    }

    /// Insert the workflow statuses and default priorities that the engine
    /// depends on. Idempotent; safe to run at every boot.
    pub async fn seed_defaults(&self) -> StorageResult<()> {
        let now = Utc::now();

        for kind in StatusKind::ALL {
            sqlx::query(
                "INSERT INTO statuses (designation, is_active, created_at, updated_at)
                 SELECT ?, TRUE, ?, ? WHERE NOT EXISTS (SELECT 1 FROM statuses WHERE designation = ?)",
            )
            .bind(kind.designation())
            .bind(now)
            .bind(now)
            .bind(kind.designation())
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        }

        for designation in DEFAULT_PRIORITIES {
            sqlx::query(
                "INSERT INTO priorities (designation, is_active, created_at, updated_at)
                 SELECT ?, TRUE, ?, ? WHERE NOT EXISTS (SELECT 1 FROM priorities WHERE designation = ?)",
            )
            .bind(designation)
            .bind(now)
            .bind(now)
            .bind(designation)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        }

        debug!("Seeded default statuses and priorities");
        Ok(())
    }

    // ==================== Executants / Demandeurs ====================

    pub async fn create_executant(
        &self,
        designation: &str,
        email: Option<&str>,
    ) -> StorageResult<Executant> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO executants (designation, email, is_active, created_at, updated_at)
             VALUES (?, ?, TRUE, ?, ?)",
        )
        .bind(designation.trim())
        .bind(email)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_executant(result.last_insert_rowid())
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn get_executant(&self, id: i64) -> StorageResult<Option<Executant>> {
        let row = sqlx::query(
            "SELECT id, designation, email, is_active, created_at, updated_at FROM executants WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        row.map(|row| {
            Ok(Executant {
                id: row.try_get("id")?,
                designation: row.try_get("designation")?,
                email: row.try_get("email")?,
                is_active: row.try_get("is_active")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    pub async fn create_demandeur(
        &self,
        designation: &str,
        email: Option<&str>,
        service_id: Option<i64>,
    ) -> StorageResult<Demandeur> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO demandeurs (designation, email, service_id, is_active, created_at, updated_at)
             VALUES (?, ?, ?, TRUE, ?, ?)",
        )
        .bind(designation.trim())
        .bind(email)
        .bind(service_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_demandeur(result.last_insert_rowid())
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn get_demandeur(&self, id: i64) -> StorageResult<Option<Demandeur>> {
        let row = sqlx::query(
            "SELECT id, designation, email, service_id, is_active, created_at, updated_at FROM demandeurs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        row.map(|row| {
            Ok(Demandeur {
                id: row.try_get("id")?,
                designation: row.try_get("designation")?,
                email: row.try_get("email")?,
                service_id: row.try_get("service_id")?,
                is_active: row.try_get("is_active")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    // ==================== Helper Methods ====================

    fn row_to_entity(row: &sqlx::sqlite::SqliteRow) -> StorageResult<ReferenceEntity> {
        Ok(ReferenceEntity {
            id: row.try_get("id")?,
            designation: row.try_get("designation")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
