// ABOUTME: HTTP request handlers for borrow/return transaction operations
// ABOUTME: Students create and view their own; lifecycle transitions are admin-only

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::info;

use labstock_lending::{
    BorrowRequestInput, ReturnCondition, TransactionFilter, TransactionStatus,
};

use crate::auth::{AdminUser, AuthUser};
use crate::pagination::{Paginated, PaginationParams};
use crate::response::{created, ok, ApiError, ApiResult};
use crate::state::DbState;

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub status: Option<TransactionStatus>,
    pub component_id: Option<String>,
    pub user_id: Option<String>,
    pub roll_number: Option<String>,
}

pub async fn list_transactions(
    State(db): State<DbState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Response> {
    // Students only ever see their own rows, whatever the query says.
    let user_id = if user.is_admin() {
        query.user_id.clone()
    } else {
        Some(user.id.clone())
    };

    let filter = TransactionFilter {
        status: query.status,
        user_id,
        component_id: query.component_id.clone(),
        roll_number: query.roll_number.clone(),
        overdue_only: false,
    };

    let (limit, offset) = pagination.limit_offset();
    let (transactions, total) = db
        .transactions
        .list_transactions(&filter, limit, offset)
        .await?;

    Ok(ok(Paginated::new(transactions, total, &pagination)))
}

pub async fn get_transaction(
    State(db): State<DbState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let transaction = db
        .transactions
        .get_transaction(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction"))?;

    if !user.is_admin() && transaction.user_id != user.id {
        return Err(ApiError::forbidden("Not your transaction"));
    }

    Ok(ok(transaction))
}

pub async fn create_request(
    State(db): State<DbState>,
    user: AuthUser,
    Json(input): Json<BorrowRequestInput>,
) -> ApiResult<Response> {
    info!(
        "Borrow request from {}: {}x component {}",
        user.id, input.quantity, input.component_id
    );

    let transaction = db.lending.request(input, &user.as_requester()).await?;
    Ok(created(transaction))
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub due_days: i64,
}

pub async fn approve_transaction(
    State(db): State<DbState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<Response> {
    info!("Admin {} approving transaction {}", admin.id, id);

    let transaction = db.lending.approve(&id, &admin.id, request.due_days).await?;
    Ok(ok(transaction))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

pub async fn reject_transaction(
    State(db): State<DbState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> ApiResult<Response> {
    info!("Admin {} rejecting transaction {}", admin.id, id);

    let transaction = db.lending.reject(&id, request.reason.as_deref()).await?;
    Ok(ok(transaction))
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    #[serde(default)]
    pub condition: ReturnCondition,
}

pub async fn return_transaction(
    State(db): State<DbState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<ReturnRequest>,
) -> ApiResult<Response> {
    info!("Admin {} recording return for transaction {}", admin.id, id);

    let transaction = db.lending.return_component(&id, request.condition).await?;
    Ok(ok(transaction))
}

pub async fn list_overdue(
    State(db): State<DbState>,
    AdminUser(_admin): AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Response> {
    let filter = TransactionFilter {
        overdue_only: true,
        ..TransactionFilter::default()
    };

    let (limit, offset) = pagination.limit_offset();
    let (transactions, total) = db
        .transactions
        .list_transactions(&filter, limit, offset)
        .await?;

    Ok(ok(Paginated::new(transactions, total, &pagination)))
}
