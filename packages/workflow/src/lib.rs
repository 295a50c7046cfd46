//! # Guichet Workflow
//!
//! The ticket lifecycle state machine. Every status mutation flows through
//! [`WorkflowEngine`], which enforces the guard order (actor role/ownership,
//! input completeness, reference resolution, edge legality) before touching
//! the database, applies each transition's writes atomically, and hands
//! workflow events to the notification boundary after commit.

pub mod engine;
pub mod error;
pub mod guards;

pub use engine::{ApprovalInput, WorkflowEngine};
pub use error::{WorkflowError, WorkflowResult};
pub use guards::{edge_exists, role_allowed, TransitionRule, TRANSITION_TABLE};
