// ABOUTME: Ticket type definitions
// ABOUTME: Structures for tickets, creation input, filters, and dashboard counts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use guichet_core::RequestType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Serialized comment log; parse through `comments::parse_log`.
    pub comment: String,
    pub request_type: RequestType,

    // Classification, optional until admin approval
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub priority_id: Option<i64>,

    // Parties
    pub demandeur_id: i64,
    pub created_by: i64,
    pub executant_id: Option<i64>,
    pub societe_id: Option<i64>,
    pub service_id: Option<i64>,

    pub status_id: i64,
    pub attachment_paths: Option<Vec<String>>,

    // Temporal fields
    pub created_at: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub expected_end_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCreateInput {
    pub title: String,
    pub description: String,
    pub request_type: Option<RequestType>,
    pub demandeur_id: i64,
    pub societe_id: Option<i64>,
    pub service_id: Option<i64>,
    pub attachment_paths: Option<Vec<String>>,
}

/// Filter for listing tickets
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status_id: Option<i64>,
    pub demandeur_id: Option<i64>,
    pub executant_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Dashboard aggregate: tickets per status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status_id: i64,
    pub designation: String,
    pub count: i64,
}

/// Dashboard aggregate: tickets per category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category_id: Option<i64>,
    pub designation: Option<String>,
    pub count: i64,
}
