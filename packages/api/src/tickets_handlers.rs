// ABOUTME: HTTP request handlers for ticket and workflow operations
// ABOUTME: Every status mutation is delegated to the workflow engine

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use guichet_core::{RequestType, StatusKind};
use guichet_tickets::{ReportKind, TicketCreateInput, TicketFilter};
use guichet_workflow::ApprovalInput;

use crate::auth::ActorContext;
use crate::db::DbState;
use crate::response::{
    ApiResponse, CommentErrorResponse, ReportErrorResponse, StorageErrorResponse,
    WorkflowErrorResponse,
};

#[derive(Deserialize, Default)]
pub struct TicketListQuery {
    #[serde(rename = "statusId")]
    pub status_id: Option<i64>,
    #[serde(rename = "demandeurId")]
    pub demandeur_id: Option<i64>,
    #[serde(rename = "executantId")]
    pub executant_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// List tickets, optionally filtered
pub async fn list_tickets(
    State(db): State<DbState>,
    Query(query): Query<TicketListQuery>,
) -> impl IntoResponse {
    let filter = TicketFilter {
        status_id: query.status_id,
        demandeur_id: query.demandeur_id,
        executant_id: query.executant_id,
        limit: query.limit,
        offset: query.offset,
    };

    match db.ticket_storage.list_tickets(&filter).await {
        Ok(tickets) => (StatusCode::OK, ResponseJson(ApiResponse::success(tickets))).into_response(),
        Err(e) => StorageErrorResponse(e).into_response(),
    }
}

/// Get a single ticket by ID
pub async fn get_ticket(State(db): State<DbState>, Path(ticket_id): Path<i64>) -> impl IntoResponse {
    match db.ticket_storage.get_ticket(ticket_id).await {
        Ok(Some(ticket)) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(ticket))).into_response()
        }
        Ok(None) => StorageErrorResponse(guichet_storage::StorageError::NotFound).into_response(),
        Err(e) => StorageErrorResponse(e).into_response(),
    }
}

/// Request body for creating a ticket
#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "requestType")]
    pub request_type: Option<RequestType>,
    #[serde(rename = "demandeurId")]
    pub demandeur_id: i64,
    #[serde(rename = "societeId")]
    pub societe_id: Option<i64>,
    #[serde(rename = "serviceId")]
    pub service_id: Option<i64>,
    #[serde(rename = "attachmentPaths")]
    pub attachment_paths: Option<Vec<String>>,
}

/// Open a new ticket
pub async fn create_ticket(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Json(request): Json<CreateTicketRequest>,
) -> impl IntoResponse {
    info!("Creating ticket '{}' for demandeur {}", request.title, request.demandeur_id);

    let input = TicketCreateInput {
        title: request.title,
        description: request.description,
        request_type: request.request_type,
        demandeur_id: request.demandeur_id,
        societe_id: request.societe_id,
        service_id: request.service_id,
        attachment_paths: request.attachment_paths,
    };

    match db.engine.create_ticket(&actor, input).await {
        Ok(ticket) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(ticket))).into_response()
        }
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

/// Delete an unapproved ticket (creator only)
pub async fn delete_ticket(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
) -> impl IntoResponse {
    match db.engine.delete_ticket(&actor, ticket_id).await {
        Ok(()) => (StatusCode::OK, ResponseJson(ApiResponse::success(()))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

// ==================== Workflow transitions ====================

/// Request body for admin approval
#[derive(Deserialize)]
pub struct ApproveRequest {
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "expectedEndDate")]
    pub expected_end_date: DateTime<Utc>,
    #[serde(rename = "executantId")]
    pub executant_id: i64,
    #[serde(rename = "priorityId")]
    pub priority_id: Option<i64>,
    #[serde(rename = "locationId")]
    pub location_id: Option<i64>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
}

/// Approve a ticket: schedule the work and assign the executant
pub async fn approve_ticket(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
    Json(request): Json<ApproveRequest>,
) -> impl IntoResponse {
    let input = ApprovalInput {
        start_date: request.start_date,
        expected_end_date: request.expected_end_date,
        executant_id: request.executant_id,
        priority_id: request.priority_id,
        location_id: request.location_id,
        category_id: request.category_id,
    };

    match db.engine.approve(&actor, ticket_id, input).await {
        Ok(ticket) => (StatusCode::OK, ResponseJson(ApiResponse::success(ticket))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

/// Send a project ticket to director validation
pub async fn send_to_validation(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
) -> impl IntoResponse {
    match db.engine.route_to_director(&actor, ticket_id).await {
        Ok(ticket) => (StatusCode::OK, ResponseJson(ApiResponse::success(ticket))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

/// Director validation of a project ticket
pub async fn validate_ticket(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
) -> impl IntoResponse {
    match db.engine.validate(&actor, ticket_id).await {
        Ok(ticket) => (StatusCode::OK, ResponseJson(ApiResponse::success(ticket))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub reason: String,
    #[serde(rename = "attachmentPath")]
    pub attachment_path: Option<String>,
}

/// Reject an unapproved ticket (terminal)
pub async fn reject_ticket(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
    Json(request): Json<RejectRequest>,
) -> impl IntoResponse {
    match db
        .engine
        .reject(&actor, ticket_id, &request.reason, request.attachment_path.as_deref())
        .await
    {
        Ok(ticket) => (StatusCode::OK, ResponseJson(ApiResponse::success(ticket))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct ProgressRequest {
    pub target: StatusKind,
}

/// Move a ticket between the execution statuses
pub async fn progress_ticket(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
    Json(request): Json<ProgressRequest>,
) -> impl IntoResponse {
    match db.engine.progress(&actor, ticket_id, request.target).await {
        Ok(ticket) => (StatusCode::OK, ResponseJson(ApiResponse::success(ticket))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

/// Requester sign-off: close a finished ticket
pub async fn close_ticket(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
) -> impl IntoResponse {
    match db.engine.close(&actor, ticket_id).await {
        Ok(ticket) => (StatusCode::OK, ResponseJson(ApiResponse::success(ticket))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct RefuseRequest {
    pub reason: String,
}

/// Requester refusal: bounce a finished ticket back into the queue
pub async fn refuse_ticket(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
    Json(request): Json<RefuseRequest>,
) -> impl IntoResponse {
    match db.engine.reopen(&actor, ticket_id, &request.reason).await {
        Ok(ticket) => (StatusCode::OK, ResponseJson(ApiResponse::success(ticket))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

// ==================== Comment log ====================

/// List a ticket's comments
pub async fn list_comments(
    State(db): State<DbState>,
    Path(ticket_id): Path<i64>,
) -> impl IntoResponse {
    match db.ticket_storage.list_comments(ticket_id).await {
        Ok(comments) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(comments))).into_response()
        }
        Err(e) => CommentErrorResponse(e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// Append a comment as the current actor
pub async fn append_comment(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
    Json(request): Json<CommentRequest>,
) -> impl IntoResponse {
    match db
        .ticket_storage
        .append_comment(ticket_id, actor.id, &request.content)
        .await
    {
        Ok(()) => (StatusCode::CREATED, ResponseJson(ApiResponse::success(()))).into_response(),
        Err(e) => CommentErrorResponse(e).into_response(),
    }
}

/// Edit a comment in place; only its original author may
pub async fn edit_comment(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path((ticket_id, fingerprint)): Path<(i64, String)>,
    Json(request): Json<CommentRequest>,
) -> impl IntoResponse {
    match db
        .ticket_storage
        .edit_comment(ticket_id, &fingerprint, actor.id, &request.content)
        .await
    {
        Ok(()) => (StatusCode::OK, ResponseJson(ApiResponse::success(()))).into_response(),
        Err(e) => CommentErrorResponse(e).into_response(),
    }
}

// ==================== Report log ====================

/// List a ticket's reports, oldest first
pub async fn list_reports(
    State(db): State<DbState>,
    Path(ticket_id): Path<i64>,
) -> impl IntoResponse {
    match db.report_storage.list_by_ticket(ticket_id).await {
        Ok(reports) => (StatusCode::OK, ResponseJson(ApiResponse::success(reports))).into_response(),
        Err(e) => ReportErrorResponse(e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct FileReportRequest {
    pub reason: String,
    pub kind: Option<ReportKind>,
    #[serde(rename = "attachmentPath")]
    pub attachment_path: Option<String>,
}

/// File a report against a ticket (responsible parties only)
pub async fn file_report(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
    Json(request): Json<FileReportRequest>,
) -> impl IntoResponse {
    let kind = request.kind.unwrap_or(ReportKind::Report);

    match db
        .engine
        .file_report(&actor, ticket_id, &request.reason, kind, request.attachment_path.as_deref())
        .await
    {
        Ok(report) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(report))).into_response()
        }
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

/// Mark every report on a ticket as viewed (requester only)
pub async fn mark_reports_viewed(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(ticket_id): Path<i64>,
) -> impl IntoResponse {
    match db.engine.mark_reports_viewed(&actor, ticket_id).await {
        Ok(count) => (StatusCode::OK, ResponseJson(ApiResponse::success(count))).into_response(),
        Err(e) => WorkflowErrorResponse(e).into_response(),
    }
}

// ==================== Reminder query ====================

/// Tickets whose expected end falls within the next 24 hours and that are
/// not yet closed. Consumed by the external reminder job.
pub async fn tickets_ending_soon(State(db): State<DbState>) -> impl IntoResponse {
    match db.ticket_storage.tickets_ending_within_24h().await {
        Ok(tickets) => (StatusCode::OK, ResponseJson(ApiResponse::success(tickets))).into_response(),
        Err(e) => StorageErrorResponse(e).into_response(),
    }
}
