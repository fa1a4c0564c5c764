// ABOUTME: Component storage layer using SQLite
// ABOUTME: CRUD operations plus the atomic stock reservation primitives

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::debug;

use crate::types::{
    CategoryCount, Component, ComponentCreateInput, ComponentFilter, ComponentStatus,
    ComponentUpdateInput, MAX_QUANTITY,
};
use labstock_storage::{generate_id, StorageError};

/// Inventory errors
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Component not found")]
    NotFound,
    #[error("Component has active transactions and cannot be deleted")]
    ActiveTransactions,
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::Storage(StorageError::Sqlx(e))
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Atomically decrement available stock, failing if it would go negative.
///
/// This is the single compare-and-decrement primitive both the approval-gated
/// and the kiosk direct-issue paths go through. Returns `false` when current
/// availability is below `quantity`; the caller maps that to
/// `InsufficientAvailability`. Callers run it inside the same SQL transaction
/// as the status change it accompanies.
pub async fn reserve_stock<'e, E>(
    executor: E,
    component_id: &str,
    quantity: i64,
) -> Result<bool, StorageError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE components
        SET available_quantity = available_quantity - ?1,
            updated_at = ?2
        WHERE id = ?3 AND available_quantity >= ?1
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(component_id)
    .execute(executor)
    .await
    .map_err(StorageError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

/// Atomically restore stock on return, capped at `total_quantity`.
///
/// The cap guards against a double-return ever pushing availability past
/// total. Returns `false` when the component does not exist.
pub async fn restore_stock<'e, E>(
    executor: E,
    component_id: &str,
    quantity: i64,
) -> Result<bool, StorageError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE components
        SET available_quantity = MIN(total_quantity, available_quantity + ?1),
            updated_at = ?2
        WHERE id = ?3
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(component_id)
    .execute(executor)
    .await
    .map_err(StorageError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

pub struct ComponentStorage {
    pool: SqlitePool,
}

impl ComponentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_component(
        &self,
        created_by: Option<&str>,
        input: ComponentCreateInput,
    ) -> InventoryResult<Component> {
        validate_quantities(input.available_quantity, input.total_quantity)?;

        let id = generate_id();
        let now = Utc::now();
        let status = if input.available_quantity > 0 {
            ComponentStatus::Available
        } else {
            ComponentStatus::Issued
        };
        let tags = normalize_tags(&input.tags);

        debug!("Creating component: {} ({})", input.name, id);

        sqlx::query(
            r#"
            INSERT INTO components (
                id, name, description, category, status,
                total_quantity, available_quantity,
                location, image_url, tags, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.category)
        .bind(status)
        .bind(input.total_quantity)
        .bind(input.available_quantity)
        .bind(&input.location)
        .bind(&input.image_url)
        .bind(serde_json::to_string(&tags).map_err(StorageError::Json)?)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_component(&id).await?.ok_or(InventoryError::NotFound)
    }

    pub async fn get_component(&self, id: &str) -> InventoryResult<Option<Component>> {
        let row = sqlx::query("SELECT * FROM components WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_component(&r)).transpose()
    }

    pub async fn list_components(
        &self,
        filter: &ComponentFilter,
        limit: i64,
        offset: i64,
    ) -> InventoryResult<(Vec<Component>, i64)> {
        let (where_clause, binds) = build_filter(filter);

        let count_query = format!("SELECT COUNT(*) FROM components {}", where_clause);
        let mut count = sqlx::query_scalar(&count_query);
        for bind in &binds {
            count = count.bind(bind);
        }
        let total: i64 = count.fetch_one(&self.pool).await?;

        let list_query = format!(
            "SELECT * FROM components {} ORDER BY name LIMIT ? OFFSET ?",
            where_clause
        );
        let mut query = sqlx::query(&list_query);
        for bind in &binds {
            query = query.bind(bind);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let components = rows
            .iter()
            .map(row_to_component)
            .collect::<InventoryResult<Vec<_>>>()?;

        Ok((components, total))
    }

    /// Partial update. Quantity edits are resolved against the current row so
    /// the `available <= total` invariant is re-established before writing.
    pub async fn update_component(
        &self,
        id: &str,
        input: ComponentUpdateInput,
    ) -> InventoryResult<Component> {
        let current = self
            .get_component(id)
            .await?
            .ok_or(InventoryError::NotFound)?;

        let total = input.total_quantity.unwrap_or(current.total_quantity);
        let available = input
            .available_quantity
            .unwrap_or_else(|| current.available_quantity.min(total));
        validate_quantities(available, total)?;

        let now = Utc::now();
        let mut query = String::from(
            "UPDATE components SET updated_at = ?, total_quantity = ?, available_quantity = ?",
        );

        if input.name.is_some() {
            query.push_str(", name = ?");
        }
        if input.description.is_some() {
            query.push_str(", description = ?");
        }
        if input.category.is_some() {
            query.push_str(", category = ?");
        }
        if input.status.is_some() {
            query.push_str(", status = ?");
        }
        if input.location.is_some() {
            query.push_str(", location = ?");
        }
        if input.image_url.is_some() {
            query.push_str(", image_url = ?");
        }
        if input.tags.is_some() {
            query.push_str(", tags = ?");
        }
        query.push_str(" WHERE id = ?");

        let mut q = sqlx::query(&query).bind(now).bind(total).bind(available);

        if let Some(name) = &input.name {
            q = q.bind(name);
        }
        if let Some(description) = &input.description {
            q = q.bind(description);
        }
        if let Some(category) = input.category {
            q = q.bind(category);
        }
        if let Some(status) = input.status {
            q = q.bind(status);
        }
        if let Some(location) = &input.location {
            q = q.bind(location);
        }
        if let Some(image_url) = &input.image_url {
            q = q.bind(image_url);
        }
        if let Some(tags) = &input.tags {
            q = q.bind(
                serde_json::to_string(&normalize_tags(tags)).map_err(StorageError::Json)?,
            );
        }

        q.bind(id).execute(&self.pool).await?;

        debug!("Updated component: {}", id);
        self.get_component(id).await?.ok_or(InventoryError::NotFound)
    }

    /// Delete a component. Refused while any transaction for it is still open,
    /// so history rows never dangle against live stock.
    pub async fn delete_component(&self, id: &str) -> InventoryResult<()> {
        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE component_id = ? AND status IN ('pending', 'approved', 'issued', 'overdue')
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active > 0 {
            return Err(InventoryError::ActiveTransactions);
        }

        let result = sqlx::query("DELETE FROM components WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(InventoryError::NotFound);
        }

        debug!("Deleted component: {}", id);
        Ok(())
    }

    pub async fn category_counts(&self) -> InventoryResult<Vec<CategoryCount>> {
        let rows = sqlx::query(
            "SELECT category, COUNT(*) as count FROM components GROUP BY category ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            counts.push(CategoryCount {
                category: row.try_get("category").map_err(StorageError::Sqlx)?,
                count: row.try_get("count").map_err(StorageError::Sqlx)?,
            });
        }
        Ok(counts)
    }

    pub async fn count_components(&self) -> InventoryResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM components")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_in_stock(&self) -> InventoryResult<i64> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM components WHERE available_quantity > 0")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn count_low_stock(&self) -> InventoryResult<i64> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM components
            WHERE total_quantity > 0 AND available_quantity * 5 < total_quantity
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

fn validate_quantities(available: i64, total: i64) -> InventoryResult<()> {
    if !(0..=MAX_QUANTITY).contains(&total) {
        return Err(InventoryError::InvalidQuantity(format!(
            "total_quantity must be between 0 and {}, got {}",
            MAX_QUANTITY, total
        )));
    }
    if available < 0 || available > total {
        return Err(InventoryError::InvalidQuantity(format!(
            "available_quantity must be between 0 and total_quantity ({}), got {}",
            total, available
        )));
    }
    Ok(())
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn build_filter(filter: &ComponentFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if let Some(category) = filter.category {
        clauses.push("category = ?".to_string());
        binds.push(category.as_str().to_string());
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?".to_string());
        binds.push(status.as_str().to_string());
    }
    if let Some(search) = &filter.search {
        clauses.push("(name LIKE ? OR description LIKE ? OR tags LIKE ?)".to_string());
        let pattern = format!("%{}%", search.to_lowercase());
        binds.push(format!("%{}%", search));
        binds.push(format!("%{}%", search));
        binds.push(pattern);
    }
    if filter.in_stock_only {
        clauses.push("available_quantity > 0".to_string());
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    (where_clause, binds)
}

fn row_to_component(row: &sqlx::sqlite::SqliteRow) -> InventoryResult<Component> {
    let tags_json: Option<String> = row.try_get("tags").map_err(StorageError::Sqlx)?;
    let tags = tags_json
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();

    Ok(Component {
        id: row.try_get("id").map_err(StorageError::Sqlx)?,
        name: row.try_get("name").map_err(StorageError::Sqlx)?,
        description: row.try_get("description").map_err(StorageError::Sqlx)?,
        category: row.try_get("category").map_err(StorageError::Sqlx)?,
        status: row.try_get("status").map_err(StorageError::Sqlx)?,
        total_quantity: row.try_get("total_quantity").map_err(StorageError::Sqlx)?,
        available_quantity: row
            .try_get("available_quantity")
            .map_err(StorageError::Sqlx)?,
        location: row.try_get("location").map_err(StorageError::Sqlx)?,
        image_url: row.try_get("image_url").map_err(StorageError::Sqlx)?,
        tags,
        created_by: row.try_get("created_by").map_err(StorageError::Sqlx)?,
        created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
        updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
    })
}
