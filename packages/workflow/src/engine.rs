// ABOUTME: Workflow engine applying guarded, atomic status transitions
// ABOUTME: Guard order: role/ownership, input completeness, references, edge legality

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use guichet_core::{validate_ticket_data, Actor, RequestType, Role, StatusKind, ValidationError};
use guichet_notify::{EventKind, NotificationDispatcher, NotificationEvent};
use guichet_registry::{EntityKind, ReferenceStorage};
use guichet_tickets::{
    Report, ReportKind, ReportStorage, Ticket, TicketCreateInput, TicketStorage,
};

use crate::error::{WorkflowError, WorkflowResult};
use crate::guards;

/// Inputs required to approve a ticket into "En instance". Classification
/// fields are mandatory on the director-validated edge and optional on the
/// direct edge from "Nouveau".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalInput {
    pub start_date: DateTime<Utc>,
    pub expected_end_date: DateTime<Utc>,
    pub executant_id: i64,
    pub priority_id: Option<i64>,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// The workflow engine. Every status mutation in the system goes through
/// here; guards run before any write, and each transition's writes share one
/// transaction guarded by an optimistic version predicate so concurrent
/// transitions on the same ticket cannot both succeed.
pub struct WorkflowEngine {
    pool: SqlitePool,
    tickets: TicketStorage,
    reports: ReportStorage,
    registry: ReferenceStorage,
    dispatcher: Arc<dyn NotificationDispatcher>,
    /// Recipient used when the natural recipient has no email on file.
    fallback_email: String,
}

impl WorkflowEngine {
    pub fn new(
        pool: SqlitePool,
        dispatcher: Arc<dyn NotificationDispatcher>,
        fallback_email: impl Into<String>,
    ) -> Self {
        Self {
            tickets: TicketStorage::new(pool.clone()),
            reports: ReportStorage::new(pool.clone()),
            registry: ReferenceStorage::new(pool.clone()),
            pool,
            dispatcher,
            fallback_email: fallback_email.into(),
        }
    }

    // ==================== Transitions ====================

    /// Open a new ticket in "Nouveau".
    pub async fn create_ticket(
        &self,
        actor: &Actor,
        input: TicketCreateInput,
    ) -> WorkflowResult<Ticket> {
        if actor.role != Role::Requester {
            return Err(WorkflowError::forbidden("Only requesters open tickets"));
        }

        let errors = validate_ticket_data(&input.title, &input.description);
        if !errors.is_empty() {
            return Err(WorkflowError::Validation(errors));
        }

        self.require_active(EntityKind::Demandeur, input.demandeur_id, "demandeur")
            .await?;
        if let Some(societe_id) = input.societe_id {
            self.require_active(EntityKind::Societe, societe_id, "societe").await?;
        }
        if let Some(service_id) = input.service_id {
            self.require_active(EntityKind::Service, service_id, "service").await?;
        }

        let status_id = self.require_status_id(StatusKind::New).await?;
        let ticket = self.tickets.create_ticket(input, actor.id, status_id).await?;

        info!("Created ticket {} '{}'", ticket.id, ticket.title);
        Ok(ticket)
    }

    /// Admin approval: assign an executant and schedule the work. Legal from
    /// "Nouveau", "Validé", and "En instance" (re-approval with fresh dates).
    pub async fn approve(
        &self,
        actor: &Actor,
        ticket_id: i64,
        input: ApprovalInput,
    ) -> WorkflowResult<Ticket> {
        let ticket = self.load(ticket_id).await?;
        let current = self.current_kind(&ticket).await?;

        if actor.role != Role::Admin {
            return Err(WorkflowError::forbidden("Only administrators approve tickets"));
        }

        // The new date pair is validated on every approval, re-approvals
        // included; equal dates fail too.
        if input.expected_end_date <= input.start_date {
            return Err(WorkflowError::validation(
                "expectedEndDate",
                "Expected end date must be strictly after the start date",
            ));
        }
        if current == StatusKind::DirectorValidated {
            let mut missing = Vec::new();
            if input.priority_id.is_none() {
                missing.push(ValidationError::new("priorityId", "Priority is required"));
            }
            if input.location_id.is_none() {
                missing.push(ValidationError::new("locationId", "Location is required"));
            }
            if input.category_id.is_none() {
                missing.push(ValidationError::new("categoryId", "Category is required"));
            }
            if !missing.is_empty() {
                return Err(WorkflowError::Validation(missing));
            }
        }

        self.require_active(EntityKind::Executant, input.executant_id, "executant")
            .await?;
        if let Some(priority_id) = input.priority_id {
            self.require_active(EntityKind::Priority, priority_id, "priority").await?;
        }
        if let Some(location_id) = input.location_id {
            self.require_active(EntityKind::Location, location_id, "location").await?;
        }
        if let Some(category_id) = input.category_id {
            self.require_active(EntityKind::Category, category_id, "category").await?;
        }

        if !guards::role_allowed(current, StatusKind::InHold, Role::Admin) {
            return Err(WorkflowError::illegal(format!(
                "Cannot approve a ticket in status '{}'",
                current.designation()
            )));
        }

        let target_id = self.require_status_id(StatusKind::InHold).await?;
        let version = self.version_token(ticket_id).await?;

        let mut query = String::from(
            "UPDATE tickets SET status_id = ?, start_date = ?, expected_end_date = ?, executant_id = ?, updated_at = ?",
        );
        if input.priority_id.is_some() {
            query.push_str(", priority_id = ?");
        }
        if input.location_id.is_some() {
            query.push_str(", location_id = ?");
        }
        if input.category_id.is_some() {
            query.push_str(", category_id = ?");
        }
        query.push_str(" WHERE id = ? AND status_id = ? AND updated_at = ?");

        let mut q = sqlx::query(&query)
            .bind(target_id)
            .bind(input.start_date)
            .bind(input.expected_end_date)
            .bind(input.executant_id)
            .bind(Utc::now());
        if let Some(priority_id) = input.priority_id {
            q = q.bind(priority_id);
        }
        if let Some(location_id) = input.location_id {
            q = q.bind(location_id);
        }
        if let Some(category_id) = input.category_id {
            q = q.bind(category_id);
        }
        let result = q
            .bind(ticket_id)
            .bind(ticket.status_id)
            .bind(&version)
            .execute(&self.pool)
            .await
            .map_err(guichet_storage::StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::Conflict(ticket_id));
        }

        info!(
            "Approved ticket {} -> En instance, executant {}",
            ticket_id, input.executant_id
        );

        let ticket = self.load(ticket_id).await?;
        self.notify_executant(&ticket, EventKind::TicketAssigned, serde_json::Value::Null)
            .await;
        Ok(ticket)
    }

    /// Route a project ticket to its department director for validation.
    pub async fn route_to_director(&self, actor: &Actor, ticket_id: i64) -> WorkflowResult<Ticket> {
        let ticket = self.load(ticket_id).await?;
        let current = self.current_kind(&ticket).await?;

        if actor.role != Role::Admin {
            return Err(WorkflowError::forbidden(
                "Only administrators route tickets to validation",
            ));
        }

        if ticket.request_type != RequestType::Project {
            return Err(WorkflowError::illegal(
                "Only project requests go through director validation",
            ));
        }
        if !guards::edge_exists(current, StatusKind::PendingDirectorValidation) {
            return Err(WorkflowError::illegal(format!(
                "Cannot send a ticket in status '{}' to validation",
                current.designation()
            )));
        }

        self.set_status(&ticket, StatusKind::PendingDirectorValidation).await?;
        self.load(ticket_id).await
    }

    /// Director validation of a project ticket. The director must belong to
    /// the ticket's service.
    pub async fn validate(&self, actor: &Actor, ticket_id: i64) -> WorkflowResult<Ticket> {
        let ticket = self.load(ticket_id).await?;
        let current = self.current_kind(&ticket).await?;

        if !actor.role.is_director() {
            return Err(WorkflowError::forbidden("Only directors validate tickets"));
        }
        if ticket.service_id.is_none() || actor.service_id != ticket.service_id {
            return Err(WorkflowError::forbidden(
                "Directors validate only tickets of their own service",
            ));
        }

        if !guards::role_allowed(current, StatusKind::DirectorValidated, actor.role) {
            return Err(WorkflowError::illegal(format!(
                "Cannot validate a ticket in status '{}'",
                current.designation()
            )));
        }

        self.set_status(&ticket, StatusKind::DirectorValidated).await?;
        info!("Ticket {} validated by director {}", ticket_id, actor.id);
        self.load(ticket_id).await
    }

    /// Reject an unapproved ticket outright. Terminal.
    pub async fn reject(
        &self,
        actor: &Actor,
        ticket_id: i64,
        reason: &str,
        attachment_path: Option<&str>,
    ) -> WorkflowResult<Ticket> {
        let ticket = self.load(ticket_id).await?;
        let current = self.current_kind(&ticket).await?;

        if actor.role != Role::Admin && !actor.role.is_director() {
            return Err(WorkflowError::forbidden(
                "Only administrators and directors reject tickets",
            ));
        }

        if reason.trim().is_empty() {
            return Err(WorkflowError::validation("reason", "Rejection reason is required"));
        }

        if !guards::role_allowed(current, StatusKind::Rejected, actor.role) {
            return Err(WorkflowError::illegal(format!(
                "Cannot reject a ticket in status '{}'",
                current.designation()
            )));
        }

        let target_id = self.require_status_id(StatusKind::Rejected).await?;
        self.transition_with_report(&ticket, target_id, actor.id, reason, attachment_path)
            .await?;

        info!("Ticket {} rejected: {}", ticket_id, reason);

        let ticket = self.load(ticket_id).await?;
        self.notify_requester(
            &ticket,
            EventKind::TicketRejected,
            serde_json::json!({ "reason": reason }),
        )
        .await;
        Ok(ticket)
    }

    /// Move an assigned ticket between "En instance", "En cours" and
    /// "Terminé". Only the assigned executant or an administrator may drive
    /// execution.
    pub async fn progress(
        &self,
        actor: &Actor,
        ticket_id: i64,
        target: StatusKind,
    ) -> WorkflowResult<Ticket> {
        let ticket = self.load(ticket_id).await?;
        let current = self.current_kind(&ticket).await?;

        match actor.role {
            Role::Admin => {}
            Role::Executant => {
                if ticket.executant_id != Some(actor.id) {
                    return Err(WorkflowError::forbidden(
                        "Only the assigned executant may progress this ticket",
                    ));
                }
            }
            _ => {
                return Err(WorkflowError::forbidden(
                    "Only the assigned executant or an administrator may progress tickets",
                ));
            }
        }

        if !matches!(
            target,
            StatusKind::InHold | StatusKind::InProgress | StatusKind::Completed
        ) {
            return Err(WorkflowError::illegal(format!(
                "'{}' is not an execution status",
                target.designation()
            )));
        }
        if !guards::edge_exists(current, target) {
            return Err(WorkflowError::illegal(format!(
                "Cannot move a ticket from '{}' to '{}'",
                current.designation(),
                target.designation()
            )));
        }

        self.set_status(&ticket, target).await?;
        debug!("Ticket {} progressed to {:?}", ticket_id, target);
        self.load(ticket_id).await
    }

    /// Requester sign-off: close a finished ticket. Stamps the actual end
    /// date exactly once.
    pub async fn close(&self, actor: &Actor, ticket_id: i64) -> WorkflowResult<Ticket> {
        let ticket = self.load(ticket_id).await?;
        let current = self.current_kind(&ticket).await?;

        self.require_requester(actor, &ticket, "close")?;

        if !guards::role_allowed(current, StatusKind::Closed, Role::Requester) {
            return Err(WorkflowError::illegal(format!(
                "Cannot close a ticket in status '{}'",
                current.designation()
            )));
        }

        let target_id = self.require_status_id(StatusKind::Closed).await?;
        let version = self.version_token(ticket_id).await?;
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status_id = ?, actual_end_date = COALESCE(actual_end_date, ?), updated_at = ?
            WHERE id = ? AND status_id = ? AND updated_at = ?
            "#,
        )
        .bind(target_id)
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(ticket_id)
        .bind(ticket.status_id)
        .bind(&version)
        .execute(&self.pool)
        .await
        .map_err(guichet_storage::StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::Conflict(ticket_id));
        }

        info!("Ticket {} closed by requester {}", ticket_id, actor.id);

        let ticket = self.load(ticket_id).await?;
        self.notify_executant(&ticket, EventKind::TicketClosed, serde_json::Value::Null)
            .await;
        Ok(ticket)
    }

    /// Requester refusal of finished work: the ticket re-opens into
    /// "En instance" with a rejection report, it is not terminally rejected.
    pub async fn reopen(
        &self,
        actor: &Actor,
        ticket_id: i64,
        reason: &str,
    ) -> WorkflowResult<Ticket> {
        let ticket = self.load(ticket_id).await?;
        let current = self.current_kind(&ticket).await?;

        self.require_requester(actor, &ticket, "refuse")?;

        if reason.trim().is_empty() {
            return Err(WorkflowError::validation("reason", "Refusal reason is required"));
        }

        if !guards::role_allowed(current, StatusKind::InHold, Role::Requester) {
            return Err(WorkflowError::illegal(format!(
                "Cannot refuse a ticket in status '{}'",
                current.designation()
            )));
        }

        let target_id = self.require_status_id(StatusKind::InHold).await?;
        self.transition_with_report(&ticket, target_id, actor.id, reason, None)
            .await?;

        info!("Ticket {} refused by requester, back to En instance", ticket_id);

        let ticket = self.load(ticket_id).await?;
        self.notify_executant(
            &ticket,
            EventKind::TicketReopened,
            serde_json::json!({ "reason": reason }),
        )
        .await;
        Ok(ticket)
    }

    /// Physical deletion, restricted to the ticket's creator while the
    /// ticket is still unapproved. Reports cascade with the row.
    pub async fn delete_ticket(&self, actor: &Actor, ticket_id: i64) -> WorkflowResult<()> {
        let ticket = self.load(ticket_id).await?;
        let current = self.current_kind(&ticket).await?;

        if ticket.created_by != actor.id {
            return Err(WorkflowError::forbidden("Only the creator may delete a ticket"));
        }

        if !matches!(
            current,
            StatusKind::New | StatusKind::PendingDirectorValidation
        ) {
            return Err(WorkflowError::illegal(format!(
                "Cannot delete a ticket in status '{}'",
                current.designation()
            )));
        }

        self.tickets.delete_ticket(ticket_id).await?;
        info!("Ticket {} deleted by creator {}", ticket_id, actor.id);
        Ok(())
    }

    // ==================== Report log ====================

    /// File a standalone report against a ticket. Responsible parties only;
    /// a rejection report notifies the ticket's executant.
    pub async fn file_report(
        &self,
        actor: &Actor,
        ticket_id: i64,
        reason: &str,
        kind: ReportKind,
        attachment_path: Option<&str>,
    ) -> WorkflowResult<Report> {
        if !actor.role.is_director() {
            return Err(WorkflowError::forbidden("Only responsible parties file reports"));
        }
        if reason.trim().is_empty() {
            return Err(WorkflowError::validation("reason", "Report reason is required"));
        }

        let report = self
            .reports
            .file_report(ticket_id, actor.id, reason, kind, attachment_path)
            .await?;

        if kind == ReportKind::Rejection {
            let ticket = self.load(ticket_id).await?;
            self.notify_executant(
                &ticket,
                EventKind::ReportFiled,
                serde_json::json!({ "reason": reason }),
            )
            .await;
        }

        Ok(report)
    }

    /// Mark every report on a ticket as viewed, requester only.
    pub async fn mark_reports_viewed(&self, actor: &Actor, ticket_id: i64) -> WorkflowResult<u64> {
        Ok(self.reports.mark_all_viewed(ticket_id, actor.id).await?)
    }

    // ==================== Guard helpers ====================

    async fn load(&self, ticket_id: i64) -> WorkflowResult<Ticket> {
        self.tickets
            .get_ticket(ticket_id)
            .await?
            .ok_or(WorkflowError::NotFound(ticket_id))
    }

    /// Resolve a semantic status to its row id; a missing row is a fatal
    /// configuration error, never a silently skipped side effect.
    async fn require_status_id(&self, kind: StatusKind) -> WorkflowResult<i64> {
        self.registry
            .status_id(kind)
            .await?
            .ok_or_else(|| {
                WorkflowError::Configuration(format!(
                    "Status '{}' is missing from the reference registry",
                    kind.designation()
                ))
            })
    }

    async fn current_kind(&self, ticket: &Ticket) -> WorkflowResult<StatusKind> {
        self.registry
            .status_kind(ticket.status_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::Configuration(format!(
                    "Ticket {} references unknown status row {}",
                    ticket.id, ticket.status_id
                ))
            })
    }

    async fn require_active(
        &self,
        kind: EntityKind,
        id: i64,
        field: &str,
    ) -> WorkflowResult<()> {
        if self.registry.is_active(kind, id).await? {
            Ok(())
        } else {
            Err(WorkflowError::invalid_reference(format!(
                "{} {} does not resolve to an active row",
                field, id
            )))
        }
    }

    fn require_requester(
        &self,
        actor: &Actor,
        ticket: &Ticket,
        action: &str,
    ) -> WorkflowResult<()> {
        if actor.role != Role::Requester || actor.id != ticket.demandeur_id {
            return Err(WorkflowError::forbidden(format!(
                "Only the ticket's requester may {} it",
                action
            )));
        }
        Ok(())
    }

    // ==================== Mutation helpers ====================

    /// Raw stored form of `updated_at`, used as the optimistic version token
    /// in every guarded update.
    async fn version_token(&self, ticket_id: i64) -> WorkflowResult<String> {
        let version: Option<String> =
            sqlx::query_scalar("SELECT updated_at FROM tickets WHERE id = ?")
                .bind(ticket_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(guichet_storage::StorageError::Sqlx)?;
        version.ok_or(WorkflowError::NotFound(ticket_id))
    }

    /// Status-only guarded update.
    async fn set_status(&self, ticket: &Ticket, target: StatusKind) -> WorkflowResult<()> {
        let target_id = self.require_status_id(target).await?;
        let version = self.version_token(ticket.id).await?;

        let result = sqlx::query(
            "UPDATE tickets SET status_id = ?, updated_at = ? WHERE id = ? AND status_id = ? AND updated_at = ?",
        )
        .bind(target_id)
        .bind(Utc::now())
        .bind(ticket.id)
        .bind(ticket.status_id)
        .bind(&version)
        .execute(&self.pool)
        .await
        .map_err(guichet_storage::StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::Conflict(ticket.id));
        }
        Ok(())
    }

    /// Status update plus rejection-report append in one transaction; either
    /// both land or neither does.
    async fn transition_with_report(
        &self,
        ticket: &Ticket,
        target_status_id: i64,
        author_id: i64,
        reason: &str,
        attachment_path: Option<&str>,
    ) -> WorkflowResult<()> {
        let version = self.version_token(ticket.id).await?;
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(guichet_storage::StorageError::Sqlx)?;

        let result = sqlx::query(
            "UPDATE tickets SET status_id = ?, updated_at = ? WHERE id = ? AND status_id = ? AND updated_at = ?",
        )
        .bind(target_status_id)
        .bind(now)
        .bind(ticket.id)
        .bind(ticket.status_id)
        .bind(&version)
        .execute(&mut *tx)
        .await
        .map_err(guichet_storage::StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(guichet_storage::StorageError::Sqlx)?;
            return Err(WorkflowError::Conflict(ticket.id));
        }

        sqlx::query(
            r#"
            INSERT INTO reports (ticket_id, author_id, reason, kind, attachment_path, reported_at, viewed)
            VALUES (?, ?, ?, ?, ?, ?, FALSE)
            "#,
        )
        .bind(ticket.id)
        .bind(author_id)
        .bind(reason)
        .bind(ReportKind::Rejection)
        .bind(attachment_path)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(guichet_storage::StorageError::Sqlx)?;

        tx.commit()
            .await
            .map_err(guichet_storage::StorageError::Sqlx)?;
        Ok(())
    }

    // ==================== Notifications ====================

    /// Notification dispatch is fire-and-forget: resolution failures are
    /// logged and the committed transition stands.
    async fn notify_executant(
        &self,
        ticket: &Ticket,
        kind: EventKind,
        payload: serde_json::Value,
    ) {
        let email = match ticket.executant_id {
            Some(executant_id) => match self.registry.get_executant(executant_id).await {
                Ok(executant) => executant.and_then(|executant| executant.email),
                Err(err) => {
                    warn!("Failed to resolve executant for notification: {}", err);
                    None
                }
            },
            None => None,
        };

        let recipient = email.unwrap_or_else(|| self.fallback_email.clone());
        self.dispatcher
            .notify(NotificationEvent::new(kind, ticket.id, recipient).with_payload(payload))
            .await;
    }

    async fn notify_requester(
        &self,
        ticket: &Ticket,
        kind: EventKind,
        payload: serde_json::Value,
    ) {
        let email = match self.registry.get_demandeur(ticket.demandeur_id).await {
            Ok(demandeur) => demandeur.and_then(|demandeur| demandeur.email),
            Err(err) => {
                warn!("Failed to resolve demandeur for notification: {}", err);
                None
            }
        };

        let recipient = email.unwrap_or_else(|| self.fallback_email.clone());
        self.dispatcher
            .notify(NotificationEvent::new(kind, ticket.id, recipient).with_payload(payload))
            .await;
    }
}
