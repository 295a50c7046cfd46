//! # Guichet Registry
//!
//! Read-mostly reference data: statuses, priorities, categories, locations,
//! services, societies, executants and demandeurs. The workflow engine
//! resolves semantic statuses and validates assignment references here;
//! administrators own the rows. Referenced rows are deactivated, never
//! hard-deleted.

pub mod storage;
pub mod types;

pub use storage::ReferenceStorage;
pub use types::{Demandeur, EntityKind, Executant, ReferenceEntity};
