// ABOUTME: HTTP request handlers for the self-service kiosk terminal
// ABOUTME: Unauthenticated roll-number flows: browse, direct issue, walk-up return

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use labstock_inventory::{ComponentCategory, ComponentFilter};
use labstock_lending::{
    BorrowRequestInput, Requester, ReturnCondition, TransactionStatus,
};

use crate::pagination::{Paginated, PaginationParams};
use crate::response::{created, ok, ApiError, ApiResult};
use crate::state::DbState;

/// Loan period for kiosk issues, matching the default approval window.
const KIOSK_DUE_DAYS: i64 = 14;

#[derive(Debug, Deserialize)]
pub struct KioskBrowseQuery {
    pub category: Option<ComponentCategory>,
    pub search: Option<String>,
}

/// Browse in-stock components. The kiosk never shows empty shelves.
pub async fn browse_components(
    State(db): State<DbState>,
    Query(query): Query<KioskBrowseQuery>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Response> {
    let filter = ComponentFilter {
        category: query.category,
        status: None,
        search: query.search.clone(),
        in_stock_only: true,
    };

    let (limit, offset) = pagination.limit_offset();
    let (components, total) = db.components.list_components(&filter, limit, offset).await?;

    Ok(ok(Paginated::new(components, total, &pagination)))
}

pub async fn category_counts(State(db): State<DbState>) -> ApiResult<Response> {
    let counts = db.components.category_counts().await?;
    Ok(ok(counts))
}

#[derive(Debug, Deserialize)]
pub struct KioskBorrowRequest {
    pub roll_number: String,
    pub student_name: String,
    pub component_id: String,
    pub quantity: i64,
    pub purpose: Option<String>,
}

/// Issue immediately against a roll number, no account or approval step.
pub async fn borrow_component(
    State(db): State<DbState>,
    Json(request): Json<KioskBorrowRequest>,
) -> ApiResult<Response> {
    if request.roll_number.trim().is_empty() {
        return Err(ApiError::bad_request("Roll number is required"));
    }
    if request.student_name.trim().is_empty() {
        return Err(ApiError::bad_request("Student name is required"));
    }

    let requester = Requester::from_roll_number(&request.roll_number, &request.student_name);
    info!(
        "Kiosk borrow: {}x {} for roll {}",
        request.quantity,
        request.component_id,
        requester.roll_number.as_deref().unwrap_or("")
    );

    let input = BorrowRequestInput {
        component_id: request.component_id,
        quantity: request.quantity,
        purpose: request.purpose,
        expected_return_date: None,
    };
    let transaction = db
        .lending
        .direct_issue(input, &requester, KIOSK_DUE_DAYS)
        .await?;

    Ok(created(transaction))
}

#[derive(Debug, Deserialize)]
pub struct KioskReturnRequest {
    pub roll_number: String,
    pub component_id: String,
    #[serde(default)]
    pub condition: ReturnCondition,
}

/// Walk-up return: find the open loan for this roll + component and close it.
pub async fn return_component(
    State(db): State<DbState>,
    Json(request): Json<KioskReturnRequest>,
) -> ApiResult<Response> {
    let loan = db
        .transactions
        .find_open_loan(&request.roll_number, &request.component_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Open loan"))?;

    info!(
        "Kiosk return: transaction {} for roll {}",
        loan.id, request.roll_number
    );

    let transaction = db
        .lending
        .return_component(&loan.id, request.condition)
        .await?;
    Ok(ok(transaction))
}

/// Everything a student currently has out, by roll number.
pub async fn borrowed_by_roll(
    State(db): State<DbState>,
    Path(roll_number): Path<String>,
) -> ApiResult<Response> {
    let loans = db.transactions.open_loans_by_roll(&roll_number).await?;
    Ok(ok(loans))
}

/// Roll-number lookup: the identity recorded on the student's latest
/// transaction, so returning students need not retype their name.
pub async fn lookup_student(
    State(db): State<DbState>,
    Path(roll_number): Path<String>,
) -> ApiResult<Response> {
    let latest = db
        .transactions
        .latest_by_roll(&roll_number)
        .await?
        .ok_or_else(|| ApiError::not_found("Student"))?;

    Ok(ok(serde_json::json!({
        "roll_number": latest.roll_number,
        "student_name": latest.user_name,
        "last_seen": latest.created_at,
    })))
}

/// Kiosk landing screen stats with a recent activity feed.
pub async fn kiosk_stats(State(db): State<DbState>) -> ApiResult<Response> {
    let in_stock = db.components.count_in_stock().await?;
    let total_components = db.components.count_components().await?;
    let active_loans = db
        .transactions
        .count_with_statuses(&[TransactionStatus::Issued, TransactionStatus::Overdue], None)
        .await?;
    let overdue = db.transactions.count_overdue(Utc::now(), None).await?;
    let recent = db.transactions.recent_activity(10, None).await?;

    Ok(ok(serde_json::json!({
        "total_components": total_components,
        "in_stock": in_stock,
        "active_loans": active_loans,
        "overdue": overdue,
        "recent_activity": recent,
    })))
}
