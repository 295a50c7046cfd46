// ABOUTME: Shared actor, role, and status definitions
// ABOUTME: Semantic status kinds decouple workflow logic from display designations

use serde::{Deserialize, Serialize};

/// Actor roles, mapped from the numeric level codes issued by the
/// authentication boundary (1=Admin, 2=Director, 3=DeptDirector, 4=Requester,
/// 5=Executant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Director,
    DeptDirector,
    Requester,
    Executant,
}

impl Role {
    /// Map an authentication-boundary level code to a role.
    pub fn from_level(level: i64) -> Option<Role> {
        match level {
            1 => Some(Role::Admin),
            2 => Some(Role::Director),
            3 => Some(Role::DeptDirector),
            4 => Some(Role::Requester),
            5 => Some(Role::Executant),
            _ => None,
        }
    }

    pub fn level(&self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::Director => 2,
            Role::DeptDirector => 3,
            Role::Requester => 4,
            Role::Executant => 5,
        }
    }

    /// Directors and department directors share the validation and
    /// report-filing privileges.
    pub fn is_director(&self) -> bool {
        matches!(self, Role::Director | Role::DeptDirector)
    }
}

/// An already-authenticated actor identity. Credential checks happen outside
/// this repository; handlers receive the resolved identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
    /// Service the actor belongs to, when the directory provides one.
    /// Required for director validation of project tickets.
    pub service_id: Option<i64>,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self {
            id,
            role,
            service_id: None,
            email: None,
        }
    }

    pub fn with_service(mut self, service_id: i64) -> Self {
        self.service_id = Some(service_id);
        self
    }
}

/// Semantic ticket statuses. Workflow logic is expressed against these kinds;
/// the registry resolves each kind to its database row by designation, so
/// display strings can change without touching transition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusKind {
    New,
    PendingDirectorValidation,
    DirectorValidated,
    InHold,
    InProgress,
    Completed,
    Closed,
    Rejected,
}

impl StatusKind {
    /// Canonical display designation, as seeded in the reference registry.
    pub fn designation(&self) -> &'static str {
        match self {
            StatusKind::New => "Nouveau",
            StatusKind::PendingDirectorValidation => "En attente de validation",
            StatusKind::DirectorValidated => "Validé",
            StatusKind::InHold => "En instance",
            StatusKind::InProgress => "En cours",
            StatusKind::Completed => "Terminé",
            StatusKind::Closed => "Clôturé",
            StatusKind::Rejected => "Rejeté",
        }
    }

    pub fn from_designation(designation: &str) -> Option<StatusKind> {
        StatusKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.designation() == designation)
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusKind::Closed | StatusKind::Rejected)
    }

    pub const ALL: [StatusKind; 8] = [
        StatusKind::New,
        StatusKind::PendingDirectorValidation,
        StatusKind::DirectorValidated,
        StatusKind::InHold,
        StatusKind::InProgress,
        StatusKind::Completed,
        StatusKind::Closed,
        StatusKind::Rejected,
    ];
}

/// Type of request carried by a ticket. Only `Project` tickets route through
/// director validation; every other type goes straight to admin approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    Project,
    Incident,
    Supply,
}

impl Default for RequestType {
    fn default() -> Self {
        RequestType::Incident
    }
}

impl RequestType {
    /// Stable storage form, identical to the serde kebab-case encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Project => "project",
            RequestType::Incident => "incident",
            RequestType::Supply => "supply",
        }
    }

    pub fn parse(value: &str) -> Option<RequestType> {
        match value {
            "project" => Some(RequestType::Project),
            "incident" => Some(RequestType::Incident),
            "supply" => Some(RequestType::Supply),
            _ => None,
        }
    }
}
