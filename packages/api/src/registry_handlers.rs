// ABOUTME: HTTP request handlers for reference-data administration
// ABOUTME: One generic CRUD surface parameterized by entity kind

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
    Json,
};
use serde::Deserialize;
use tracing::info;

use guichet_core::Role;
use guichet_registry::EntityKind;

use crate::auth::ActorContext;
use crate::db::DbState;
use crate::response::{error_response, ApiResponse, StorageErrorResponse};

fn parse_kind(segment: &str) -> Option<EntityKind> {
    match segment {
        "statuses" => Some(EntityKind::Status),
        "priorities" => Some(EntityKind::Priority),
        "categories" => Some(EntityKind::Category),
        "locations" => Some(EntityKind::Location),
        "services" => Some(EntityKind::Service),
        "societes" => Some(EntityKind::Societe),
        "executants" => Some(EntityKind::Executant),
        "demandeurs" => Some(EntityKind::Demandeur),
        _ => None,
    }
}

fn unknown_kind(segment: &str) -> axum::response::Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Unknown reference kind: {}", segment),
    )
}

fn admin_only(actor_role: Role) -> Result<(), axum::response::Response> {
    if actor_role == Role::Admin {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "Reference data is administrator-owned".to_string(),
        ))
    }
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(rename = "includeInactive")]
    pub include_inactive: Option<bool>,
}

/// List reference rows of a kind; active rows only unless asked otherwise
pub async fn list_entities(
    State(db): State<DbState>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let Some(entity_kind) = parse_kind(&kind) else {
        return unknown_kind(&kind);
    };

    let result = if query.include_inactive.unwrap_or(false) {
        db.reference_storage.list(entity_kind).await
    } else {
        db.reference_storage.list_active(entity_kind).await
    };

    match result {
        Ok(entities) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(entities))).into_response()
        }
        Err(e) => StorageErrorResponse(e).into_response(),
    }
}

/// Get one reference row
pub async fn get_entity(
    State(db): State<DbState>,
    Path((kind, id)): Path<(String, i64)>,
) -> impl IntoResponse {
    let Some(entity_kind) = parse_kind(&kind) else {
        return unknown_kind(&kind);
    };

    match db.reference_storage.get(entity_kind, id).await {
        Ok(Some(entity)) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(entity))).into_response()
        }
        Ok(None) => StorageErrorResponse(guichet_storage::StorageError::NotFound).into_response(),
        Err(e) => StorageErrorResponse(e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct CreateEntityRequest {
    pub designation: String,
    /// Executants and demandeurs only
    pub email: Option<String>,
    /// Demandeurs only
    #[serde(rename = "serviceId")]
    pub service_id: Option<i64>,
}

/// Create a reference row of a kind
pub async fn create_entity(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path(kind): Path<String>,
    Json(request): Json<CreateEntityRequest>,
) -> impl IntoResponse {
    let Some(entity_kind) = parse_kind(&kind) else {
        return unknown_kind(&kind);
    };
    if let Err(response) = admin_only(actor.role) {
        return response;
    }

    info!("Creating {} row '{}'", kind, request.designation);

    match entity_kind {
        EntityKind::Executant => {
            match db
                .reference_storage
                .create_executant(&request.designation, request.email.as_deref())
                .await
            {
                Ok(executant) => {
                    (StatusCode::CREATED, ResponseJson(ApiResponse::success(executant)))
                        .into_response()
                }
                Err(e) => StorageErrorResponse(e).into_response(),
            }
        }
        EntityKind::Demandeur => {
            match db
                .reference_storage
                .create_demandeur(&request.designation, request.email.as_deref(), request.service_id)
                .await
            {
                Ok(demandeur) => {
                    (StatusCode::CREATED, ResponseJson(ApiResponse::success(demandeur)))
                        .into_response()
                }
                Err(e) => StorageErrorResponse(e).into_response(),
            }
        }
        _ => match db.reference_storage.create(entity_kind, &request.designation).await {
            Ok(entity) => {
                (StatusCode::CREATED, ResponseJson(ApiResponse::success(entity))).into_response()
            }
            Err(e) => StorageErrorResponse(e).into_response(),
        },
    }
}

#[derive(Deserialize)]
pub struct RenameEntityRequest {
    pub designation: String,
}

/// Rename a reference row
pub async fn rename_entity(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path((kind, id)): Path<(String, i64)>,
    Json(request): Json<RenameEntityRequest>,
) -> impl IntoResponse {
    let Some(entity_kind) = parse_kind(&kind) else {
        return unknown_kind(&kind);
    };
    if let Err(response) = admin_only(actor.role) {
        return response;
    }

    match db.reference_storage.rename(entity_kind, id, &request.designation).await {
        Ok(entity) => (StatusCode::OK, ResponseJson(ApiResponse::success(entity))).into_response(),
        Err(e) => StorageErrorResponse(e).into_response(),
    }
}

/// Deactivate a reference row (soft delete)
pub async fn deactivate_entity(
    State(db): State<DbState>,
    ActorContext(actor): ActorContext,
    Path((kind, id)): Path<(String, i64)>,
) -> impl IntoResponse {
    let Some(entity_kind) = parse_kind(&kind) else {
        return unknown_kind(&kind);
    };
    if let Err(response) = admin_only(actor.role) {
        return response;
    }

    match db.reference_storage.deactivate(entity_kind, id).await {
        Ok(()) => (StatusCode::OK, ResponseJson(ApiResponse::success(()))).into_response(),
        Err(e) => StorageErrorResponse(e).into_response(),
    }
}
