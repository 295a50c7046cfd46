// ABOUTME: Ticket entity, comment log, and report log
// ABOUTME: Storage layers for tickets plus the two append-only per-ticket logs

pub mod comments;
pub mod reports;
pub mod storage;
pub mod types;

pub use comments::{CommentEntry, CommentError};
pub use reports::{Report, ReportError, ReportKind, ReportStorage};
pub use storage::TicketStorage;
pub use types::{CategoryCount, StatusCount, Ticket, TicketCreateInput, TicketFilter};
