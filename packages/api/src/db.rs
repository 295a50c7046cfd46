// ABOUTME: Database connection management and storage initialization
// ABOUTME: Provides shared access to the SQLite pool and storage layers

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use guichet_notify::NotificationDispatcher;
use guichet_registry::ReferenceStorage;
use guichet_storage::{connect, StorageConfig, StorageError};
use guichet_tickets::{ReportStorage, TicketStorage};
use guichet_workflow::WorkflowEngine;

/// Shared database state for API handlers
#[derive(Clone)]
pub struct DbState {
    pub pool: SqlitePool,
    pub engine: Arc<WorkflowEngine>,
    pub ticket_storage: Arc<TicketStorage>,
    pub report_storage: Arc<ReportStorage>,
    pub reference_storage: Arc<ReferenceStorage>,
}

impl DbState {
    /// Create new database state from an existing pool.
    pub fn new(
        pool: SqlitePool,
        dispatcher: Arc<dyn NotificationDispatcher>,
        fallback_email: impl Into<String>,
    ) -> Self {
        let engine = Arc::new(WorkflowEngine::new(
            pool.clone(),
            dispatcher,
            fallback_email,
        ));

        Self {
            engine,
            ticket_storage: Arc::new(TicketStorage::new(pool.clone())),
            report_storage: Arc::new(ReportStorage::new(pool.clone())),
            reference_storage: Arc::new(ReferenceStorage::new(pool.clone())),
            pool,
        }
    }

    /// Connect, migrate, seed the registry defaults, and build the state.
    pub async fn init(
        config: &StorageConfig,
        dispatcher: Arc<dyn NotificationDispatcher>,
        fallback_email: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let pool = connect(config).await?;

        let state = Self::new(pool, dispatcher, fallback_email);
        state.reference_storage.seed_defaults().await?;

        info!("Database state initialized");
        Ok(state)
    }
}
