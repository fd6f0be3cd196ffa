use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;

/// Конфигурация всех роутов приложения
pub fn configure_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // P910 ORDER/PAYMENT MERGE
        // ========================================
        .route(
            "/api/data-merge/merged-data",
            get(handlers::p910_order_payment_merge::list_all),
        )
        .route(
            "/api/data-merge/merged-data/paginated",
            get(handlers::p910_order_payment_merge::get_page),
        )
        .route(
            "/api/data-merge/merged-data/status/:status",
            get(handlers::p910_order_payment_merge::get_by_status),
        )
        .route(
            "/api/data-merge/merged-data/source/:source",
            get(handlers::p910_order_payment_merge::get_by_source),
        )
        .route(
            "/api/data-merge/merged-data/export",
            get(handlers::p910_order_payment_merge::export_csv),
        )
        .route(
            "/api/data-merge/statistics",
            get(handlers::p910_order_payment_merge::get_statistics),
        )
        .route(
            "/api/data-merge/orders-by-time",
            get(handlers::p910_order_payment_merge::get_orders_by_time),
        )
        .route(
            "/api/data-merge/rebuild",
            post(handlers::p910_order_payment_merge::rebuild),
        )
        .route(
            "/api/data-merge/import/orders",
            post(handlers::p910_order_payment_merge::import_orders),
        )
        .route(
            "/api/data-merge/import/payments",
            post(handlers::p910_order_payment_merge::import_payments),
        )
        // ========================================
        // UTILITIES
        // ========================================
        // Logs handlers
        .route(
            "/api/logs",
            get(handlers::logs::list_all)
                .post(handlers::logs::create)
                .delete(handlers::logs::clear_all),
        )
}
