use axum::{
    extract::{Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use contracts::projections::p910_order_payment_merge::{
    ImportResponse, MergeStatistics, MergedOrderRecordDto, MergedPageRequest, MergedPageResponse,
    RebuildResponse,
};
use contracts::shared::period::{parse_iso_date, ChartResponse, TimeSeriesRequest};

use crate::projections::p910_order_payment_merge::csv_export::export_file_name;
use crate::projections::p910_order_payment_merge::csv_import::CsvImportError;
use crate::projections::p910_order_payment_merge::service;

fn internal_error(context: &str, e: anyhow::Error) -> StatusCode {
    tracing::error!("{}: {}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// GET /api/data-merge/merged-data/paginated
pub async fn get_page(
    Query(req): Query<MergedPageRequest>,
) -> Result<Json<MergedPageResponse>, StatusCode> {
    let page = service::get_page(req.page, req.size, req.q.as_deref())
        .await
        .map_err(|e| internal_error("Failed to load merged page", e))?
        .ok_or_else(|| {
            tracing::warn!("Rejected page size {}", req.size);
            StatusCode::BAD_REQUEST
        })?;
    Ok(Json(page))
}

/// GET /api/data-merge/merged-data/status/:status
pub async fn get_by_status(
    Path(status): Path<String>,
) -> Result<Json<MergedPageResponse>, StatusCode> {
    if status.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let page = service::by_status(&status)
        .await
        .map_err(|e| internal_error("Failed to load merged records by status", e))?;
    Ok(Json(page))
}

/// GET /api/data-merge/merged-data/source/:source
pub async fn get_by_source(
    Path(source): Path<String>,
) -> Result<Json<Vec<MergedOrderRecordDto>>, StatusCode> {
    if source.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let records = service::by_source(&source)
        .await
        .map_err(|e| internal_error("Failed to load merged records by source", e))?;
    Ok(Json(records))
}

/// GET /api/data-merge/merged-data
pub async fn list_all() -> Result<Json<Vec<MergedOrderRecordDto>>, StatusCode> {
    let records = service::list_all()
        .await
        .map_err(|e| internal_error("Failed to load merged records", e))?;
    Ok(Json(records))
}

/// GET /api/data-merge/statistics
pub async fn get_statistics() -> Result<Json<MergeStatistics>, StatusCode> {
    let stats = service::statistics()
        .await
        .map_err(|e| internal_error("Failed to compute merge statistics", e))?;
    Ok(Json(stats))
}

/// GET /api/data-merge/orders-by-time
pub async fn get_orders_by_time(
    Query(req): Query<TimeSeriesRequest>,
) -> Result<Json<ChartResponse>, StatusCode> {
    let (start, end) = match (parse_iso_date(&req.start), parse_iso_date(&req.end)) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Invalid orders-by-time range: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    if start > end {
        return Err(StatusCode::BAD_REQUEST);
    }

    let chart = service::orders_by_time(start, end, req.agg)
        .await
        .map_err(|e| internal_error("Failed to build orders-by-time series", e))?;
    Ok(Json(chart))
}

/// POST /api/data-merge/rebuild
pub async fn rebuild() -> Result<Json<RebuildResponse>, StatusCode> {
    let result = service::rebuild()
        .await
        .map_err(|e| internal_error("Failed to rebuild merged table", e))?;
    Ok(Json(result))
}

fn import_error(kind: &str, e: anyhow::Error) -> (StatusCode, String) {
    if let Some(csv_error) = e.downcast_ref::<CsvImportError>() {
        tracing::warn!("Rejected {} CSV: {}", kind, csv_error);
        return (StatusCode::BAD_REQUEST, csv_error.to_string());
    }
    tracing::error!("Failed to import {} CSV: {}", kind, e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// POST /api/data-merge/import/orders (CSV text body)
pub async fn import_orders(body: String) -> Result<Json<ImportResponse>, (StatusCode, String)> {
    let result = service::import_orders(&body)
        .await
        .map_err(|e| import_error("order", e))?;
    Ok(Json(result))
}

/// POST /api/data-merge/import/payments (CSV text body)
pub async fn import_payments(body: String) -> Result<Json<ImportResponse>, (StatusCode, String)> {
    let result = service::import_payments(&body)
        .await
        .map_err(|e| import_error("payment", e))?;
    Ok(Json(result))
}

/// GET /api/data-merge/merged-data/export
pub async fn export_csv() -> Result<impl IntoResponse, StatusCode> {
    let csv = service::export_csv()
        .await
        .map_err(|e| internal_error("Failed to export merged records", e))?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(chrono::Utc::now().date_naive())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
