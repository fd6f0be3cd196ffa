use axum::{extract::Query, Json};
use contracts::shared::logger::{CreateLogRequest, LogEntry};
use serde::Deserialize;

use crate::shared::logger;

#[derive(Debug, Deserialize)]
pub struct LogListQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    500
}

/// GET /api/logs
pub async fn list_all(
    Query(query): Query<LogListQuery>,
) -> Result<Json<Vec<LogEntry>>, axum::http::StatusCode> {
    match logger::repository::list_recent(query.limit).await {
        Ok(logs) => Ok(Json(logs)),
        Err(e) => {
            tracing::error!("Failed to list logs: {}", e);
            Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /api/logs
pub async fn create(Json(req): Json<CreateLogRequest>) -> axum::http::StatusCode {
    match logger::repository::log_event(&req.source, &req.category, &req.message).await {
        Ok(_) => axum::http::StatusCode::OK,
        Err(e) => {
            tracing::error!("Failed to store log entry: {}", e);
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// DELETE /api/logs
pub async fn clear_all() -> axum::http::StatusCode {
    match logger::repository::clear_all_logs().await {
        Ok(_) => axum::http::StatusCode::OK,
        Err(e) => {
            tracing::error!("Failed to clear logs: {}", e);
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
