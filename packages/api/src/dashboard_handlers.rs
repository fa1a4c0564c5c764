// ABOUTME: HTTP request handlers for dashboard statistics
// ABOUTME: Role-dependent stats plus the admin activity feed

use axum::{extract::State, response::Response};
use chrono::{Duration, Utc};
use serde::Serialize;

use labstock_inventory::CategoryCount;
use labstock_lending::{TopComponent, Transaction, TransactionStatus};

use crate::auth::{AdminUser, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::DbState;

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_components: i64,
    pub in_stock: i64,
    pub low_stock: i64,
    pub active_transactions: i64,
    pub pending_requests: i64,
    pub overdue: i64,
    pub transactions_last_week: i64,
    pub top_borrowed: Vec<TopComponent>,
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Serialize)]
pub struct StudentStats {
    pub active_issues: i64,
    pub pending_requests: i64,
    pub overdue: i64,
    pub total_returns: i64,
    pub components_in_stock: i64,
    pub recent_transactions: Vec<Transaction>,
}

/// Role-dependent stats: admins get the lab-wide picture, students their own.
pub async fn get_stats(State(db): State<DbState>, user: AuthUser) -> ApiResult<Response> {
    if user.is_admin() {
        Ok(ok(admin_stats(&db).await?))
    } else {
        Ok(ok(student_stats(&db, &user.id).await?))
    }
}

async fn admin_stats(db: &DbState) -> ApiResult<AdminStats> {
    let now = Utc::now();

    Ok(AdminStats {
        total_components: db.components.count_components().await?,
        in_stock: db.components.count_in_stock().await?,
        low_stock: db.components.count_low_stock().await?,
        active_transactions: db
            .transactions
            .count_with_statuses(
                &[
                    TransactionStatus::Pending,
                    TransactionStatus::Issued,
                    TransactionStatus::Overdue,
                ],
                None,
            )
            .await?,
        pending_requests: db
            .transactions
            .count_with_statuses(&[TransactionStatus::Pending], None)
            .await?,
        overdue: db.transactions.count_overdue(now, None).await?,
        transactions_last_week: db
            .transactions
            .count_created_since(now - Duration::days(7))
            .await?,
        top_borrowed: db.transactions.top_borrowed(5).await?,
        categories: db.components.category_counts().await?,
    })
}

async fn student_stats(db: &DbState, user_id: &str) -> ApiResult<StudentStats> {
    let now = Utc::now();

    Ok(StudentStats {
        active_issues: db
            .transactions
            .count_with_statuses(
                &[TransactionStatus::Issued, TransactionStatus::Overdue],
                Some(user_id),
            )
            .await?,
        pending_requests: db
            .transactions
            .count_with_statuses(&[TransactionStatus::Pending], Some(user_id))
            .await?,
        overdue: db.transactions.count_overdue(now, Some(user_id)).await?,
        total_returns: db
            .transactions
            .count_with_statuses(&[TransactionStatus::Returned], Some(user_id))
            .await?,
        components_in_stock: db.components.count_in_stock().await?,
        recent_transactions: db.transactions.recent_activity(5, Some(user_id)).await?,
    })
}

/// Lab-wide recent activity feed, admin only.
pub async fn recent_activity(
    State(db): State<DbState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Response> {
    let activity = db.transactions.recent_activity(20, None).await?;
    Ok(ok(activity))
}
