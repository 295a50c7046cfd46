// ABOUTME: Reference entity type definitions
// ABOUTME: Shared row shape plus the executant/demandeur extensions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The reference table a query addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Status,
    Priority,
    Category,
    Location,
    Service,
    Societe,
    Executant,
    Demandeur,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Status => "statuses",
            EntityKind::Priority => "priorities",
            EntityKind::Category => "categories",
            EntityKind::Location => "locations",
            EntityKind::Service => "services",
            EntityKind::Societe => "societes",
            EntityKind::Executant => "executants",
            EntityKind::Demandeur => "demandeurs",
        }
    }

    pub const ALL: [EntityKind; 8] = [
        EntityKind::Status,
        EntityKind::Priority,
        EntityKind::Category,
        EntityKind::Location,
        EntityKind::Service,
        EntityKind::Societe,
        EntityKind::Executant,
        EntityKind::Demandeur,
    ];
}

/// Common shape of every reference row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEntity {
    pub id: i64,
    pub designation: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Executant row, extended with the notification address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Executant {
    pub id: i64,
    pub designation: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Demandeur (requester registry) row, extended with contact address and
/// service membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demandeur {
    pub id: i64,
    pub designation: String,
    pub email: Option<String>,
    pub service_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
