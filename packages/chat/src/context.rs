// ABOUTME: Inventory, loan, and stats snapshots for answering questions
// ABOUTME: Plain read-only queries; the chat layer never mutates lifecycle state

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::ChatResult;
use labstock_storage::StorageError;

/// How many components/loans a single answer context carries at most.
const SNAPSHOT_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ComponentBrief {
    pub name: String,
    pub category: String,
    pub available_quantity: i64,
    pub total_quantity: i64,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoanBrief {
    pub component_name: String,
    pub user_name: String,
    pub roll_number: Option<String>,
    pub quantity: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub overdue: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsBrief {
    pub total_components: i64,
    pub in_stock: i64,
    pub active_borrows: i64,
    pub overdue: i64,
}

#[derive(Debug, Clone)]
pub struct ChatContext {
    pub components: Vec<ComponentBrief>,
    pub open_loans: Vec<LoanBrief>,
    pub stats: StatsBrief,
    pub loaded_at: DateTime<Utc>,
}

impl ChatContext {
    pub async fn load(pool: &SqlitePool) -> ChatResult<Self> {
        let now = Utc::now();

        let component_rows = sqlx::query(
            r#"
            SELECT name, category, available_quantity, total_quantity, location
            FROM components ORDER BY name LIMIT ?
            "#,
        )
        .bind(SNAPSHOT_LIMIT)
        .fetch_all(pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let mut components = Vec::with_capacity(component_rows.len());
        for row in component_rows {
            components.push(ComponentBrief {
                name: row.try_get("name").map_err(StorageError::Sqlx)?,
                category: row.try_get("category").map_err(StorageError::Sqlx)?,
                available_quantity: row
                    .try_get("available_quantity")
                    .map_err(StorageError::Sqlx)?,
                total_quantity: row.try_get("total_quantity").map_err(StorageError::Sqlx)?,
                location: row.try_get("location").map_err(StorageError::Sqlx)?,
            });
        }

        let loan_rows = sqlx::query(
            r#"
            SELECT component_name, user_name, roll_number, quantity, due_date
            FROM transactions
            WHERE status IN ('issued', 'overdue')
            ORDER BY due_date LIMIT ?
            "#,
        )
        .bind(SNAPSHOT_LIMIT)
        .fetch_all(pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let mut open_loans = Vec::with_capacity(loan_rows.len());
        for row in loan_rows {
            let due_date: Option<DateTime<Utc>> =
                row.try_get("due_date").map_err(StorageError::Sqlx)?;
            open_loans.push(LoanBrief {
                component_name: row.try_get("component_name").map_err(StorageError::Sqlx)?,
                user_name: row.try_get("user_name").map_err(StorageError::Sqlx)?,
                roll_number: row.try_get("roll_number").map_err(StorageError::Sqlx)?,
                quantity: row.try_get("quantity").map_err(StorageError::Sqlx)?,
                due_date,
                overdue: due_date.is_some_and(|due| due < now),
            });
        }

        let stats = StatsBrief {
            total_components: count(pool, "SELECT COUNT(*) FROM components").await?,
            in_stock: count(
                pool,
                "SELECT COUNT(*) FROM components WHERE available_quantity > 0",
            )
            .await?,
            active_borrows: count(
                pool,
                "SELECT COUNT(*) FROM transactions WHERE status IN ('issued', 'overdue')",
            )
            .await?,
            overdue: {
                let overdue: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM transactions WHERE status IN ('issued', 'overdue') AND due_date < ?",
                )
                .bind(now)
                .fetch_one(pool)
                .await
                .map_err(StorageError::Sqlx)?;
                overdue
            },
        };

        Ok(Self {
            components,
            open_loans,
            stats,
            loaded_at: now,
        })
    }

    /// Components whose name appears in (or contains a word of) the question.
    pub fn matching_components(&self, question: &str) -> Vec<&ComponentBrief> {
        let question = question.to_lowercase();
        self.components
            .iter()
            .filter(|c| {
                let name = c.name.to_lowercase();
                question.contains(&name)
                    || name
                        .split_whitespace()
                        .any(|word| word.len() > 2 && question.contains(word))
            })
            .collect()
    }
}

async fn count(pool: &SqlitePool, query: &str) -> ChatResult<i64> {
    let count: i64 = sqlx::query_scalar(query)
        .fetch_one(pool)
        .await
        .map_err(StorageError::Sqlx)?;
    Ok(count)
}
