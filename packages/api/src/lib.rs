// ABOUTME: HTTP API layer for Labstock providing REST endpoints and routing
// ABOUTME: Integration layer that depends on all domain packages

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

pub mod auth;
pub mod chat_handlers;
pub mod components_handlers;
pub mod dashboard_handlers;
pub mod kiosk_handlers;
pub mod pagination;
pub mod response;
pub mod state;
pub mod transactions_handlers;

pub use state::DbState;

/// Creates the components API router
pub fn create_components_router() -> Router<DbState> {
    Router::new()
        .route("/", get(components_handlers::list_components))
        .route("/", post(components_handlers::create_component))
        .route("/categories", get(components_handlers::category_counts))
        .route("/{id}", get(components_handlers::get_component))
        .route("/{id}", put(components_handlers::update_component))
        .route("/{id}", delete(components_handlers::delete_component))
}

/// Creates the transactions API router
pub fn create_transactions_router() -> Router<DbState> {
    Router::new()
        .route("/", get(transactions_handlers::list_transactions))
        .route("/", post(transactions_handlers::create_request))
        .route("/overdue", get(transactions_handlers::list_overdue))
        .route("/{id}", get(transactions_handlers::get_transaction))
        .route(
            "/{id}/approve",
            patch(transactions_handlers::approve_transaction),
        )
        .route(
            "/{id}/reject",
            patch(transactions_handlers::reject_transaction),
        )
        .route(
            "/{id}/return",
            patch(transactions_handlers::return_transaction),
        )
}

/// Creates the kiosk API router (unauthenticated; the terminal is trusted)
pub fn create_kiosk_router() -> Router<DbState> {
    Router::new()
        .route("/components", get(kiosk_handlers::browse_components))
        .route("/categories", get(kiosk_handlers::category_counts))
        .route("/borrow", post(kiosk_handlers::borrow_component))
        .route("/return", post(kiosk_handlers::return_component))
        .route("/borrowed/{roll_number}", get(kiosk_handlers::borrowed_by_roll))
        .route("/student/{roll_number}", get(kiosk_handlers::lookup_student))
        .route("/stats", get(kiosk_handlers::kiosk_stats))
}

/// Creates the dashboard API router
pub fn create_dashboard_router() -> Router<DbState> {
    Router::new()
        .route("/stats", get(dashboard_handlers::get_stats))
        .route("/recent-activity", get(dashboard_handlers::recent_activity))
}

/// Creates the chat API router
pub fn create_chat_router() -> Router<DbState> {
    Router::new().route("/", post(chat_handlers::ask))
}
