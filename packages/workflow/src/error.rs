use thiserror::Error;

use guichet_core::ValidationError;
use guichet_storage::StorageError;
use guichet_tickets::{CommentError, ReportError};

/// Workflow errors, one variant per guard category plus the operational
/// failures around them. Every failed transition surfaces the kind and a
/// human-readable reason; nothing no-ops silently.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),
    #[error("Ticket not found: {0}")]
    NotFound(i64),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Concurrent update on ticket {0}, retry the operation")]
    Conflict(i64),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl WorkflowError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        WorkflowError::Forbidden(reason.into())
    }

    pub fn validation(field: &str, message: &str) -> Self {
        WorkflowError::Validation(vec![ValidationError::new(field, message)])
    }

    pub fn invalid_reference(reason: impl Into<String>) -> Self {
        WorkflowError::InvalidReference(reason.into())
    }

    pub fn illegal(reason: impl Into<String>) -> Self {
        WorkflowError::IllegalTransition(reason.into())
    }
}

impl From<ReportError> for WorkflowError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Forbidden => WorkflowError::forbidden(
                "Only the ticket's requester may mark its reports viewed",
            ),
            ReportError::TicketNotFound => WorkflowError::Storage(StorageError::NotFound),
            ReportError::Storage(err) => WorkflowError::Storage(err),
        }
    }
}

impl From<CommentError> for WorkflowError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::Forbidden => {
                WorkflowError::forbidden("Only the original author may edit a comment")
            }
            CommentError::NotFound => {
                WorkflowError::validation("fingerprint", "No comment matches the given fingerprint")
            }
            CommentError::TicketNotFound => WorkflowError::Storage(StorageError::NotFound),
            CommentError::Storage(err) => WorkflowError::Storage(err),
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
