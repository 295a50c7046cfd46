// ABOUTME: HTTP request handlers for dashboard statistics
// ABOUTME: Aggregate ticket counts per status and category, plus overdue totals

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
};
use serde::Serialize;

use guichet_tickets::{CategoryCount, StatusCount};

use crate::db::DbState;
use crate::response::{ApiResponse, StorageErrorResponse};

#[derive(Serialize)]
pub struct DashboardStats {
    #[serde(rename = "byStatus")]
    pub by_status: Vec<StatusCount>,
    #[serde(rename = "byCategory")]
    pub by_category: Vec<CategoryCount>,
    pub overdue: i64,
}

/// Aggregate dashboard statistics
pub async fn get_stats(State(db): State<DbState>) -> impl IntoResponse {
    let by_status = match db.ticket_storage.count_by_status().await {
        Ok(counts) => counts,
        Err(e) => return StorageErrorResponse(e).into_response(),
    };
    let by_category = match db.ticket_storage.count_by_category().await {
        Ok(counts) => counts,
        Err(e) => return StorageErrorResponse(e).into_response(),
    };
    let overdue = match db.ticket_storage.overdue_count().await {
        Ok(count) => count,
        Err(e) => return StorageErrorResponse(e).into_response(),
    };

    let stats = DashboardStats {
        by_status,
        by_category,
        overdue,
    };

    (StatusCode::OK, ResponseJson(ApiResponse::success(stats))).into_response()
}
