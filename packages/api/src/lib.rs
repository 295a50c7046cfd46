// ABOUTME: HTTP API layer for Guichet providing REST endpoints and routing
// ABOUTME: Integration layer that depends on all domain packages

use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub mod auth;
pub mod dashboard_handlers;
pub mod db;
pub mod registry_handlers;
pub mod response;
pub mod tickets_handlers;

pub use db::DbState;

/// Creates the tickets API router (nested under /api/tickets)
pub fn create_tickets_router() -> Router<DbState> {
    Router::new()
        .route("/", get(tickets_handlers::list_tickets))
        .route("/", post(tickets_handlers::create_ticket))
        .route("/ending-soon", get(tickets_handlers::tickets_ending_soon))
        .route("/{ticket_id}", get(tickets_handlers::get_ticket))
        .route("/{ticket_id}", delete(tickets_handlers::delete_ticket))
        // Workflow transitions
        .route("/{ticket_id}/approve", post(tickets_handlers::approve_ticket))
        .route(
            "/{ticket_id}/send-to-validation",
            post(tickets_handlers::send_to_validation),
        )
        .route("/{ticket_id}/validate", post(tickets_handlers::validate_ticket))
        .route("/{ticket_id}/reject", post(tickets_handlers::reject_ticket))
        .route("/{ticket_id}/progress", post(tickets_handlers::progress_ticket))
        .route("/{ticket_id}/close", post(tickets_handlers::close_ticket))
        .route("/{ticket_id}/refuse", post(tickets_handlers::refuse_ticket))
        // Comment log
        .route("/{ticket_id}/comments", get(tickets_handlers::list_comments))
        .route("/{ticket_id}/comments", post(tickets_handlers::append_comment))
        .route(
            "/{ticket_id}/comments/{fingerprint}",
            put(tickets_handlers::edit_comment),
        )
        // Report log
        .route("/{ticket_id}/reports", get(tickets_handlers::list_reports))
        .route("/{ticket_id}/reports", post(tickets_handlers::file_report))
        .route(
            "/{ticket_id}/reports/viewed",
            post(tickets_handlers::mark_reports_viewed),
        )
}

/// Creates the reference-registry API router (nested under /api/registry)
pub fn create_registry_router() -> Router<DbState> {
    Router::new()
        .route("/{kind}", get(registry_handlers::list_entities))
        .route("/{kind}", post(registry_handlers::create_entity))
        .route("/{kind}/{id}", get(registry_handlers::get_entity))
        .route("/{kind}/{id}", put(registry_handlers::rename_entity))
        .route("/{kind}/{id}", delete(registry_handlers::deactivate_entity))
}

/// Creates the dashboard API router (nested under /api/dashboard)
pub fn create_dashboard_router() -> Router<DbState> {
    Router::new().route("/stats", get(dashboard_handlers::get_stats))
}

/// Assembles the full application router
pub fn create_router(state: DbState) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "ok" }))
        .nest("/api/tickets", create_tickets_router())
        .nest("/api/registry", create_registry_router())
        .nest("/api/dashboard", create_dashboard_router())
        .with_state(state)
}
