// ABOUTME: Core types, traits, and utilities for Guichet
// ABOUTME: Foundational package providing shared functionality across all Guichet packages

pub mod constants;
pub mod types;
pub mod validation;

// Re-export main types
pub use types::{Actor, RequestType, Role, StatusKind};

// Re-export constants
pub use constants::{attachments_dir, database_file, guichet_dir, DATA_VERSION};

// Re-export validation
pub use validation::{truncate, validate_ticket_data, ValidationError, TITLE_MAX_LEN};
