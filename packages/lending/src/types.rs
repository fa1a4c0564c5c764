// ABOUTME: Transaction type definitions
// ABOUTME: Lifecycle statuses, return conditions, and borrow request inputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sanity bound on a single borrow request.
pub const MAX_REQUEST_QUANTITY: i64 = 1_000;

/// Loan period bounds in days, matching the admin approval form.
pub const MIN_DUE_DAYS: i64 = 1;
pub const MAX_DUE_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Issued,
    Returned,
    Overdue,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Issued => "issued",
            TransactionStatus::Returned => "returned",
            TransactionStatus::Overdue => "overdue",
            TransactionStatus::Rejected => "rejected",
        }
    }

    /// The transaction still holds (or may come to hold) stock.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Pending
                | TransactionStatus::Approved
                | TransactionStatus::Issued
                | TransactionStatus::Overdue
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnCondition {
    #[default]
    Good,
    Damaged,
    Partial,
}

/// Identity of the borrower, supplied by the auth layer (web) or entered at
/// the kiosk (roll number + name, no account).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub roll_number: Option<String>,
}

impl Requester {
    /// Kiosk requester derived from a roll number, mirroring the synthetic
    /// identity the kiosk flow records.
    pub fn from_roll_number(roll_number: &str, name: &str) -> Self {
        let roll = roll_number.trim().to_uppercase();
        Self {
            user_id: format!("student_{}", roll),
            name: name.trim().to_string(),
            email: format!("{}@student.local", roll.to_lowercase()),
            roll_number: Some(roll),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRequestInput {
    pub component_id: String,
    pub quantity: i64,
    pub purpose: Option<String>,
    pub expected_return_date: Option<DateTime<Utc>>,
}

/// A single borrow-request-to-return lifecycle record. Append-only: rows are
/// created on request and mutated only through defined transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub component_id: String,
    pub component_name: String,

    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub roll_number: Option<String>,

    pub quantity: i64,
    pub purpose: Option<String>,
    pub status: TransactionStatus,

    pub expected_return_date: Option<DateTime<Utc>>,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub return_condition: Option<ReturnCondition>,

    pub approved_by: Option<String>,
    pub admin_notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for querying transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub user_id: Option<String>,
    pub component_id: Option<String>,
    pub roll_number: Option<String>,
    pub overdue_only: bool,
}

/// One row of the borrow-count leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct TopComponent {
    pub name: String,
    pub count: i64,
}
