// ABOUTME: Transaction storage layer using SQLite
// ABOUTME: Row access, lifecycle queries, and the overdue sweep

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::types::{
    Requester, TopComponent, Transaction, TransactionFilter, TransactionStatus,
};
use labstock_storage::{generate_id, StorageError, StorageResult};

pub struct TransactionStorage {
    pool: SqlitePool,
}

impl TransactionStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new transaction in `pending` state (the approval-gated path).
    /// Availability is not touched here; reservation commits at issue time.
    pub async fn insert_pending(
        &self,
        component_id: &str,
        component_name: &str,
        requester: &Requester,
        quantity: i64,
        purpose: Option<&str>,
        expected_return_date: Option<DateTime<Utc>>,
    ) -> StorageResult<Transaction> {
        let id = generate_id();
        let now = Utc::now();

        debug!(
            "Creating pending transaction {} for component {}",
            id, component_id
        );

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, component_id, component_name,
                user_id, user_name, user_email, roll_number,
                quantity, purpose, status, expected_return_date,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(component_id)
        .bind(component_name)
        .bind(&requester.user_id)
        .bind(&requester.name)
        .bind(&requester.email)
        .bind(&requester.roll_number)
        .bind(quantity)
        .bind(purpose)
        .bind(expected_return_date)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_transaction(&id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn get_transaction(&self, id: &str) -> StorageResult<Option<Transaction>> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_transaction(&r)).transpose()
    }

    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> StorageResult<(Vec<Transaction>, i64)> {
        let (where_clause, binds) = build_filter(filter);
        let now = Utc::now();

        let count_query = format!("SELECT COUNT(*) FROM transactions {}", where_clause);
        let mut count = sqlx::query_scalar(&count_query);
        for bind in &binds {
            count = count.bind(bind);
        }
        if filter.overdue_only {
            count = count.bind(now);
        }
        let total: i64 = count.fetch_one(&self.pool).await?;

        let list_query = format!(
            "SELECT * FROM transactions {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            where_clause
        );
        let mut query = sqlx::query(&list_query);
        for bind in &binds {
            query = query.bind(bind);
        }
        if filter.overdue_only {
            query = query.bind(now);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let transactions = rows
            .iter()
            .map(row_to_transaction)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok((transactions, total))
    }

    /// Open loans (stock currently out) for a kiosk roll number.
    pub async fn open_loans_by_roll(&self, roll_number: &str) -> StorageResult<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE roll_number = ? AND status IN ('issued', 'overdue')
            ORDER BY issue_date DESC
            "#,
        )
        .bind(roll_number.to_uppercase())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    /// The kiosk double-borrow guard: an open loan of this component on this
    /// roll number.
    pub async fn find_open_loan(
        &self,
        roll_number: &str,
        component_id: &str,
    ) -> StorageResult<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE roll_number = ? AND component_id = ? AND status IN ('issued', 'overdue')
            "#,
        )
        .bind(roll_number.to_uppercase())
        .bind(component_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_transaction(&r)).transpose()
    }

    /// Most recent transaction on a roll number, for the kiosk name lookup.
    pub async fn latest_by_roll(&self, roll_number: &str) -> StorageResult<Option<Transaction>> {
        let row = sqlx::query(
            "SELECT * FROM transactions WHERE roll_number = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(roll_number.to_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_transaction(&r)).transpose()
    }

    /// Count transactions in any of the given statuses, optionally scoped to
    /// one user.
    pub async fn count_with_statuses(
        &self,
        statuses: &[TransactionStatus],
        user_id: Option<&str>,
    ) -> StorageResult<i64> {
        if statuses.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let mut query = format!(
            "SELECT COUNT(*) FROM transactions WHERE status IN ({})",
            placeholders
        );
        if user_id.is_some() {
            query.push_str(" AND user_id = ?");
        }

        let mut q = sqlx::query_scalar(&query);
        for status in statuses {
            q = q.bind(status.as_str());
        }
        if let Some(user_id) = user_id {
            q = q.bind(user_id);
        }

        let count: i64 = q.fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Overdue count per the central predicate: issued or already swept to
    /// overdue, past due date.
    pub async fn count_overdue(
        &self,
        now: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> StorageResult<i64> {
        let mut query = String::from(
            "SELECT COUNT(*) FROM transactions WHERE status IN ('issued', 'overdue') AND due_date < ?",
        );
        if user_id.is_some() {
            query.push_str(" AND user_id = ?");
        }

        let mut q = sqlx::query_scalar(&query).bind(now);
        if let Some(user_id) = user_id {
            q = q.bind(user_id);
        }

        let count: i64 = q.fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn count_created_since(&self, since: DateTime<Utc>) -> StorageResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE created_at >= ?")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Top borrowed components by total quantity handed out.
    pub async fn top_borrowed(&self, limit: i64) -> StorageResult<Vec<TopComponent>> {
        let rows = sqlx::query(
            r#"
            SELECT component_name, SUM(quantity) as count
            FROM transactions
            WHERE status IN ('issued', 'overdue', 'returned')
            GROUP BY component_name
            ORDER BY count DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut top = Vec::with_capacity(rows.len());
        for row in rows {
            top.push(TopComponent {
                name: row.try_get("component_name")?,
                count: row.try_get("count")?,
            });
        }
        Ok(top)
    }

    /// Most recently touched transactions, for activity feeds.
    pub async fn recent_activity(
        &self,
        limit: i64,
        user_id: Option<&str>,
    ) -> StorageResult<Vec<Transaction>> {
        let mut query = String::from("SELECT * FROM transactions");
        if user_id.is_some() {
            query.push_str(" WHERE user_id = ?");
        }
        query.push_str(" ORDER BY updated_at DESC LIMIT ?");

        let mut q = sqlx::query(&query);
        if let Some(user_id) = user_id {
            q = q.bind(user_id);
        }
        let rows = q.bind(limit).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_transaction).collect()
    }

    /// Sum of quantities currently out for one component. Used to check the
    /// conservation invariant: available + this sum == total.
    pub async fn outstanding_quantity(&self, component_id: &str) -> StorageResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(quantity) FROM transactions
            WHERE component_id = ? AND status IN ('issued', 'overdue')
            "#,
        )
        .bind(component_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum.unwrap_or(0))
    }

    /// Persist overdue status for issued transactions past their due date.
    ///
    /// Monotonic and idempotent: issued + past-due becomes overdue, never the
    /// reverse (only an explicit return moves it on), so running the sweep
    /// redundantly or concurrently is safe.
    pub async fn mark_overdue_sweep(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'overdue', updated_at = ?
            WHERE status = 'issued' AND due_date IS NOT NULL AND due_date < ?
            "#,
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            debug!("Overdue sweep marked {} transactions", swept);
        }
        Ok(swept)
    }
}

fn build_filter(filter: &TransactionFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?".to_string());
        binds.push(status.as_str().to_string());
    }
    if let Some(user_id) = &filter.user_id {
        clauses.push("user_id = ?".to_string());
        binds.push(user_id.clone());
    }
    if let Some(component_id) = &filter.component_id {
        clauses.push("component_id = ?".to_string());
        binds.push(component_id.clone());
    }
    if let Some(roll_number) = &filter.roll_number {
        clauses.push("roll_number = ?".to_string());
        binds.push(roll_number.to_uppercase());
    }
    // The datetime bind for overdue_only is appended by the caller, after the
    // string binds, so it must stay the last clause here.
    if filter.overdue_only {
        clauses.push("status IN ('issued', 'overdue') AND due_date < ?".to_string());
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    (where_clause, binds)
}

fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Transaction> {
    Ok(Transaction {
        id: row.try_get("id")?,
        component_id: row.try_get("component_id")?,
        component_name: row.try_get("component_name")?,
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        user_email: row.try_get("user_email")?,
        roll_number: row.try_get("roll_number")?,
        quantity: row.try_get("quantity")?,
        purpose: row.try_get("purpose")?,
        status: row.try_get("status")?,
        expected_return_date: row.try_get("expected_return_date")?,
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
        return_date: row.try_get("return_date")?,
        return_condition: row.try_get("return_condition")?,
        approved_by: row.try_get("approved_by")?,
        admin_notes: row.try_get("admin_notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Requester;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        labstock_storage::run_migrations(&pool).await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO components (
                id, name, category, status, total_quantity, available_quantity,
                created_at, updated_at
            ) VALUES ('c1', 'ESP32', 'microcontroller', 'available', 5, 5,
                      datetime('now'), datetime('now'))
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    fn kiosk_requester() -> Requester {
        Requester::from_roll_number("21BCE042", "Grace Hopper")
    }

    #[tokio::test]
    async fn test_insert_pending_and_list_filters() {
        let pool = setup_test_db().await;
        let storage = TransactionStorage::new(pool);

        let requester = kiosk_requester();
        let tx = storage
            .insert_pending("c1", "ESP32", &requester, 2, Some("lab"), None)
            .await
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.roll_number.as_deref(), Some("21BCE042"));

        let (all, total) = storage
            .list_transactions(&TransactionFilter::default(), 20, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(all[0].id, tx.id);

        let (mine, _) = storage
            .list_transactions(
                &TransactionFilter {
                    user_id: Some("someone-else".to_string()),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap();
        assert!(mine.is_empty());

        let (pending, _) = storage
            .list_transactions(
                &TransactionFilter {
                    status: Some(TransactionStatus::Pending),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_open_loan_queries_and_counts() {
        let pool = setup_test_db().await;
        let storage = TransactionStorage::new(pool.clone());
        let requester = kiosk_requester();

        let tx = storage
            .insert_pending("c1", "ESP32", &requester, 3, None, None)
            .await
            .unwrap();

        // Nothing issued yet
        assert!(storage
            .find_open_loan("21bce042", "c1")
            .await
            .unwrap()
            .is_none());
        assert_eq!(storage.outstanding_quantity("c1").await.unwrap(), 0);

        sqlx::query("UPDATE transactions SET status = 'issued', issue_date = ?, due_date = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(Utc::now() - chrono::Duration::days(1))
            .bind(&tx.id)
            .execute(&pool)
            .await
            .unwrap();

        // Lookup is case-insensitive on roll number
        assert!(storage
            .find_open_loan("21bce042", "c1")
            .await
            .unwrap()
            .is_some());
        assert_eq!(storage.open_loans_by_roll("21BCE042").await.unwrap().len(), 1);
        assert_eq!(storage.outstanding_quantity("c1").await.unwrap(), 3);
        assert_eq!(storage.count_overdue(Utc::now(), None).await.unwrap(), 1);
        assert_eq!(
            storage
                .count_with_statuses(&[TransactionStatus::Issued], None)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            storage
                .count_with_statuses(&[TransactionStatus::Issued], Some("nobody"))
                .await
                .unwrap(),
            0
        );
        // An empty status set never matches anything
        assert_eq!(storage.count_with_statuses(&[], None).await.unwrap(), 0);

        let latest = storage.latest_by_roll("21bce042").await.unwrap().unwrap();
        assert_eq!(latest.user_name, "Grace Hopper");

        let top = storage.top_borrowed(5).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "ESP32");
        assert_eq!(top[0].count, 3);
    }

    #[tokio::test]
    async fn test_mark_overdue_sweep_only_touches_past_due_issued() {
        let pool = setup_test_db().await;
        let storage = TransactionStorage::new(pool.clone());
        let requester = kiosk_requester();
        let now = Utc::now();

        let due_past = storage
            .insert_pending("c1", "ESP32", &requester, 1, None, None)
            .await
            .unwrap();
        let due_future = storage
            .insert_pending("c1", "ESP32", &requester, 1, None, None)
            .await
            .unwrap();

        sqlx::query("UPDATE transactions SET status = 'issued', due_date = ? WHERE id = ?")
            .bind(now - chrono::Duration::days(2))
            .bind(&due_past.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE transactions SET status = 'issued', due_date = ? WHERE id = ?")
            .bind(now + chrono::Duration::days(2))
            .bind(&due_future.id)
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(storage.mark_overdue_sweep(now).await.unwrap(), 1);

        let swept = storage.get_transaction(&due_past.id).await.unwrap().unwrap();
        assert_eq!(swept.status, TransactionStatus::Overdue);
        let untouched = storage
            .get_transaction(&due_future.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.status, TransactionStatus::Issued);
    }
}
