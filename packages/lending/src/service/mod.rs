// ABOUTME: Transaction lifecycle service
// ABOUTME: Validates borrow requests and drives pending/issued/returned transitions

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::TransactionStorage;
use crate::types::{
    BorrowRequestInput, Requester, ReturnCondition, Transaction, TransactionStatus,
    MAX_DUE_DAYS, MAX_REQUEST_QUANTITY, MIN_DUE_DAYS,
};
use labstock_inventory::storage::{reserve_stock, restore_stock, InventoryError};
use labstock_inventory::{Component, ComponentStorage};
use labstock_storage::{generate_id, StorageError};

/// Lifecycle errors. All recoverable at the caller; the presentation layer
/// surfaces them as user-facing messages.
#[derive(Error, Debug)]
pub enum LendingError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),
    #[error("Loan period must be between {MIN_DUE_DAYS} and {MAX_DUE_DAYS} days, got {0}")]
    InvalidDueDays(i64),
    #[error("Insufficient availability: requested {requested}, only {available} available")]
    InsufficientAvailability { requested: i64, available: i64 },
    #[error("Cannot {operation} a transaction in status '{status}'")]
    InvalidState {
        operation: &'static str,
        status: TransactionStatus,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("This component is already borrowed on roll number {roll_number} (qty {quantity})")]
    AlreadyBorrowed { roll_number: String, quantity: i64 },
}

impl From<InventoryError> for LendingError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::Storage(e) => LendingError::Storage(e),
            InventoryError::NotFound => LendingError::NotFound("Component"),
            // Inventory-side validation failures cannot arise from lifecycle
            // reads; surface them as storage-level faults if they ever do.
            other => LendingError::Storage(StorageError::Database(other.to_string())),
        }
    }
}

pub type LendingResult<T> = Result<T, LendingError>;

/// The single pure overdue predicate. Every call site (sweep SQL, dashboards,
/// list filters) follows this definition rather than re-deriving it.
pub fn is_overdue(transaction: &Transaction, now: DateTime<Utc>) -> bool {
    matches!(
        transaction.status,
        TransactionStatus::Issued | TransactionStatus::Overdue
    ) && transaction.return_date.is_none()
        && transaction.due_date.is_some_and(|due| due < now)
}

/// Reservation and transaction lifecycle service.
///
/// Two entry points create loans: `request` (approval-gated, used by the web
/// dashboard; no stock is reserved until an admin approves) and
/// `direct_issue` (kiosk; stock committed atomically with creation). Both
/// funnel through the same conditional-decrement primitive, so concurrent
/// borrows can never oversubscribe stock.
pub struct LendingService {
    pool: SqlitePool,
    components: ComponentStorage,
    transactions: TransactionStorage,
}

impl LendingService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            components: ComponentStorage::new(pool.clone()),
            transactions: TransactionStorage::new(pool.clone()),
            pool,
        }
    }

    pub fn transactions(&self) -> &TransactionStorage {
        &self.transactions
    }

    /// Approval-gated path: record a pending request. Availability is only
    /// soft-checked here; the reservation commits at approval time.
    pub async fn request(
        &self,
        input: BorrowRequestInput,
        requester: &Requester,
    ) -> LendingResult<Transaction> {
        let component = self.validate_request(&input).await?;

        let transaction = self
            .transactions
            .insert_pending(
                &component.id,
                &component.name,
                requester,
                input.quantity,
                input.purpose.as_deref(),
                input.expected_return_date,
            )
            .await?;

        info!(
            "Request {} created: {}x {} for {}",
            transaction.id, transaction.quantity, transaction.component_name, requester.user_id
        );
        Ok(transaction)
    }

    /// Kiosk path: issue immediately, skipping pending/approved. The stock
    /// decrement and the insert of the already-issued row share one SQL
    /// transaction, so a crash mid-operation cannot strand quantities.
    pub async fn direct_issue(
        &self,
        input: BorrowRequestInput,
        requester: &Requester,
        due_days: i64,
    ) -> LendingResult<Transaction> {
        validate_due_days(due_days)?;
        let component = self.validate_request(&input).await?;

        if let Some(roll) = &requester.roll_number {
            if let Some(existing) = self
                .transactions
                .find_open_loan(roll, &component.id)
                .await?
            {
                return Err(LendingError::AlreadyBorrowed {
                    roll_number: roll.clone(),
                    quantity: existing.quantity,
                });
            }
        }

        let id = generate_id();
        let now = Utc::now();
        let due_date = now + Duration::days(due_days);

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        if !reserve_stock(&mut *tx, &component.id, input.quantity).await? {
            drop(tx);
            return Err(self
                .availability_error(&component.id, input.quantity)
                .await?);
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, component_id, component_name,
                user_id, user_name, user_email, roll_number,
                quantity, purpose, status, issue_date, due_date,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'issued', ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&component.id)
        .bind(&component.name)
        .bind(&requester.user_id)
        .bind(&requester.name)
        .bind(&requester.email)
        .bind(&requester.roll_number)
        .bind(input.quantity)
        .bind(&input.purpose)
        .bind(now)
        .bind(due_date)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!(
            "Kiosk issue {}: {}x {} to {}",
            id, input.quantity, component.name, requester.user_id
        );
        self.get_required(&id).await
    }

    /// Approve a pending request: re-validate availability with the atomic
    /// conditional decrement, then flip to issued. Checking the status inside
    /// the same SQL transaction makes a retried, already-applied approve a
    /// clean `InvalidState` instead of a double issue.
    pub async fn approve(
        &self,
        transaction_id: &str,
        approved_by: &str,
        due_days: i64,
    ) -> LendingResult<Transaction> {
        validate_due_days(due_days)?;

        let transaction = self.get_required(transaction_id).await?;
        if transaction.status != TransactionStatus::Pending {
            return Err(LendingError::InvalidState {
                operation: "approve",
                status: transaction.status,
            });
        }

        let now = Utc::now();
        let due_date = now + Duration::days(due_days);

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        if !reserve_stock(&mut *tx, &transaction.component_id, transaction.quantity).await? {
            drop(tx);
            return Err(self
                .availability_error(&transaction.component_id, transaction.quantity)
                .await?);
        }

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'issued', issue_date = ?, due_date = ?, approved_by = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(due_date)
        .bind(approved_by)
        .bind(now)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            // Lost a race with another transition; rollback undoes the decrement.
            drop(tx);
            let current = self.get_required(transaction_id).await?;
            return Err(LendingError::InvalidState {
                operation: "approve",
                status: current.status,
            });
        }

        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!(
            "Approved {}: {}x {} issued, due {}",
            transaction_id, transaction.quantity, transaction.component_name, due_date
        );
        self.get_required(transaction_id).await
    }

    /// Reject a pending request. No quantity effect, nothing was reserved.
    pub async fn reject(
        &self,
        transaction_id: &str,
        reason: Option<&str>,
    ) -> LendingResult<Transaction> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'rejected', admin_notes = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(reason)
        .bind(now)
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            let current = self.get_required(transaction_id).await?;
            return Err(LendingError::InvalidState {
                operation: "reject",
                status: current.status,
            });
        }

        debug!("Rejected transaction {}", transaction_id);
        self.get_required(transaction_id).await
    }

    /// Record a return. Valid from issued or overdue; the guarded status flip
    /// shares the SQL transaction with the capped stock increment, so a second
    /// return fails with `InvalidState` and cannot double-increment.
    pub async fn return_component(
        &self,
        transaction_id: &str,
        condition: ReturnCondition,
    ) -> LendingResult<Transaction> {
        let transaction = self.get_required(transaction_id).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'returned', return_date = ?, return_condition = ?, updated_at = ?
            WHERE id = ? AND status IN ('issued', 'overdue')
            "#,
        )
        .bind(now)
        .bind(condition)
        .bind(now)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            drop(tx);
            return Err(LendingError::InvalidState {
                operation: "return",
                status: transaction.status,
            });
        }

        restore_stock(&mut *tx, &transaction.component_id, transaction.quantity).await?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!(
            "Returned {}: {}x {} back in stock",
            transaction_id, transaction.quantity, transaction.component_name
        );
        self.get_required(transaction_id).await
    }

    /// Persist overdue status for issued transactions past their due date.
    /// Delegates to the storage sweep; run periodically by the server.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> LendingResult<u64> {
        Ok(self.transactions.mark_overdue_sweep(now).await?)
    }

    async fn validate_request(&self, input: &BorrowRequestInput) -> LendingResult<Component> {
        if input.quantity <= 0 || input.quantity > MAX_REQUEST_QUANTITY {
            return Err(LendingError::InvalidQuantity(input.quantity));
        }

        let component = self
            .components
            .get_component(&input.component_id)
            .await?
            .ok_or(LendingError::NotFound("Component"))?;

        if input.quantity > component.available_quantity {
            return Err(LendingError::InsufficientAvailability {
                requested: input.quantity,
                available: component.available_quantity,
            });
        }

        Ok(component)
    }

    async fn get_required(&self, transaction_id: &str) -> LendingResult<Transaction> {
        self.transactions
            .get_transaction(transaction_id)
            .await?
            .ok_or(LendingError::NotFound("Transaction"))
    }

    /// Distinguish a vanished component from plain insufficient stock after a
    /// failed conditional decrement.
    async fn availability_error(
        &self,
        component_id: &str,
        requested: i64,
    ) -> Result<LendingError, StorageError> {
        let available: Option<i64> =
            sqlx::query_scalar("SELECT available_quantity FROM components WHERE id = ?")
                .bind(component_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match available {
            Some(available) => LendingError::InsufficientAvailability {
                requested,
                available,
            },
            None => LendingError::NotFound("Component"),
        })
    }
}

fn validate_due_days(due_days: i64) -> LendingResult<()> {
    if !(MIN_DUE_DAYS..=MAX_DUE_DAYS).contains(&due_days) {
        return Err(LendingError::InvalidDueDays(due_days));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
