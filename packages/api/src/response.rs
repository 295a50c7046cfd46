// ABOUTME: Shared API response types and error handling
// ABOUTME: Provides consistent response format across all API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
};
use serde::Serialize;

use guichet_storage::StorageError;
use guichet_tickets::{CommentError, ReportError};
use guichet_workflow::WorkflowError;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

pub fn error_response(status: StatusCode, message: String) -> axum::response::Response {
    (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
}

/// Convert workflow errors to HTTP responses. Every guard failure carries
/// its kind and reason out to the caller.
pub struct WorkflowErrorResponse(pub WorkflowError);

impl IntoResponse for WorkflowErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::Validation(_) | WorkflowError::InvalidReference(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WorkflowError::IllegalTransition(_) | WorkflowError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            WorkflowError::NotFound(_) | WorkflowError::Storage(StorageError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            WorkflowError::Configuration(_) | WorkflowError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self.0.to_string())
    }
}

/// Convert storage errors to HTTP responses
pub struct StorageErrorResponse(pub StorageError);

impl IntoResponse for StorageErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self.0 {
            StorageError::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),
            StorageError::DuplicateDesignation(_) => (StatusCode::CONFLICT, self.0.to_string()),
            StorageError::InvalidAttachmentToken(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            StorageError::Database(_) | StorageError::Sqlx(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        error_response(status, message)
    }
}

pub struct ReportErrorResponse(pub ReportError);

impl IntoResponse for ReportErrorResponse {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            ReportError::Forbidden => error_response(StatusCode::FORBIDDEN, self.0.to_string()),
            ReportError::TicketNotFound => error_response(StatusCode::NOT_FOUND, self.0.to_string()),
            ReportError::Storage(err) => StorageErrorResponse(err).into_response(),
        }
    }
}

pub struct CommentErrorResponse(pub CommentError);

impl IntoResponse for CommentErrorResponse {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            CommentError::Forbidden => error_response(StatusCode::FORBIDDEN, self.0.to_string()),
            CommentError::NotFound => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            CommentError::TicketNotFound => error_response(StatusCode::NOT_FOUND, self.0.to_string()),
            CommentError::Storage(err) => StorageErrorResponse(err).into_response(),
        }
    }
}
