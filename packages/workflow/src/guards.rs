// ABOUTME: Data-driven permission matrix for the ticket status graph
// ABOUTME: One table indexed by (current status, target status, actor role)

use guichet_core::{Role, StatusKind};

/// One legal edge of the status graph and the roles that may request it.
/// Ownership refinements (assigned executant, ticket requester, director of
/// the ticket's service) are enforced by the engine on top of this table.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: StatusKind,
    pub to: StatusKind,
    pub roles: &'static [Role],
}

const ADMIN: &[Role] = &[Role::Admin];
const ADMIN_OR_DIRECTOR: &[Role] = &[Role::Admin, Role::Director, Role::DeptDirector];
const DIRECTORS: &[Role] = &[Role::Director, Role::DeptDirector];
const ADMIN_OR_EXECUTANT: &[Role] = &[Role::Admin, Role::Executant];
const REQUESTER: &[Role] = &[Role::Requester];

/// The complete status graph. Every transition the engine applies must have
/// its edge here; everything else is illegal by construction.
pub const TRANSITION_TABLE: &[TransitionRule] = &[
    // Admin approval, including re-approval with fresh dates
    TransitionRule { from: StatusKind::New, to: StatusKind::InHold, roles: ADMIN },
    TransitionRule { from: StatusKind::DirectorValidated, to: StatusKind::InHold, roles: ADMIN },
    // Project routing and director validation
    TransitionRule { from: StatusKind::New, to: StatusKind::PendingDirectorValidation, roles: ADMIN },
    TransitionRule { from: StatusKind::PendingDirectorValidation, to: StatusKind::DirectorValidated, roles: DIRECTORS },
    // Rejection of unapproved tickets
    TransitionRule { from: StatusKind::New, to: StatusKind::Rejected, roles: ADMIN_OR_DIRECTOR },
    TransitionRule { from: StatusKind::PendingDirectorValidation, to: StatusKind::Rejected, roles: ADMIN_OR_DIRECTOR },
    // Execution progress
    TransitionRule { from: StatusKind::InHold, to: StatusKind::InHold, roles: ADMIN_OR_EXECUTANT },
    TransitionRule { from: StatusKind::InHold, to: StatusKind::InProgress, roles: ADMIN_OR_EXECUTANT },
    TransitionRule { from: StatusKind::InHold, to: StatusKind::Completed, roles: ADMIN_OR_EXECUTANT },
    TransitionRule { from: StatusKind::InProgress, to: StatusKind::InHold, roles: ADMIN_OR_EXECUTANT },
    TransitionRule { from: StatusKind::InProgress, to: StatusKind::InProgress, roles: ADMIN_OR_EXECUTANT },
    TransitionRule { from: StatusKind::InProgress, to: StatusKind::Completed, roles: ADMIN_OR_EXECUTANT },
    // Requester sign-off: close, or bounce back into the work queue
    TransitionRule { from: StatusKind::Completed, to: StatusKind::Closed, roles: REQUESTER },
    TransitionRule { from: StatusKind::Completed, to: StatusKind::InHold, roles: REQUESTER },
];

/// Whether the edge exists in the graph at all, regardless of actor.
pub fn edge_exists(from: StatusKind, to: StatusKind) -> bool {
    TRANSITION_TABLE
        .iter()
        .any(|rule| rule.from == from && rule.to == to)
}

/// Whether `role` may request the edge. False when the edge does not exist.
pub fn role_allowed(from: StatusKind, to: StatusKind, role: Role) -> bool {
    TRANSITION_TABLE
        .iter()
        .any(|rule| rule.from == from && rule.to == to && rule.roles.contains(&role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_outgoing_edges() {
        for rule in TRANSITION_TABLE {
            assert!(!rule.from.is_terminal(), "terminal state {:?} has an outgoing edge", rule.from);
        }
    }

    #[test]
    fn test_admin_approval_edges() {
        assert!(role_allowed(StatusKind::New, StatusKind::InHold, Role::Admin));
        assert!(role_allowed(StatusKind::DirectorValidated, StatusKind::InHold, Role::Admin));
        assert!(!role_allowed(StatusKind::New, StatusKind::InHold, Role::Executant));
        assert!(!role_allowed(StatusKind::New, StatusKind::InHold, Role::Requester));
    }

    #[test]
    fn test_director_validation_is_director_only() {
        let from = StatusKind::PendingDirectorValidation;
        assert!(role_allowed(from, StatusKind::DirectorValidated, Role::Director));
        assert!(role_allowed(from, StatusKind::DirectorValidated, Role::DeptDirector));
        assert!(!role_allowed(from, StatusKind::DirectorValidated, Role::Admin));
    }

    #[test]
    fn test_requester_owns_completed_edges() {
        assert!(role_allowed(StatusKind::Completed, StatusKind::Closed, Role::Requester));
        assert!(role_allowed(StatusKind::Completed, StatusKind::InHold, Role::Requester));
        assert!(!role_allowed(StatusKind::Completed, StatusKind::Closed, Role::Admin));
        assert!(!role_allowed(StatusKind::Completed, StatusKind::Closed, Role::Executant));
    }

    #[test]
    fn test_director_validated_edge_absent_from_new() {
        // Non-project tickets never pass through director validation.
        assert!(!edge_exists(StatusKind::New, StatusKind::DirectorValidated));
    }

    #[test]
    fn test_no_edges_out_of_closed_or_rejected() {
        for to in StatusKind::ALL {
            assert!(!edge_exists(StatusKind::Closed, to));
            assert!(!edge_exists(StatusKind::Rejected, to));
        }
    }
}
