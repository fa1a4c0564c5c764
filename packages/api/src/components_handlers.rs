// ABOUTME: HTTP request handlers for component inventory operations
// ABOUTME: CRUD plus category counts; mutations are admin-only

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::info;

use labstock_inventory::{
    ComponentCategory, ComponentCreateInput, ComponentFilter, ComponentStatus,
    ComponentUpdateInput,
};

use crate::auth::{AdminUser, AuthUser};
use crate::pagination::{Paginated, PaginationParams};
use crate::response::{created, ok, ApiError, ApiResult};
use crate::state::DbState;

#[derive(Debug, Deserialize)]
pub struct ComponentListQuery {
    pub category: Option<ComponentCategory>,
    pub status: Option<ComponentStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl ComponentListQuery {
    fn filter(&self) -> ComponentFilter {
        ComponentFilter {
            category: self.category,
            status: self.status,
            search: self.search.clone(),
            in_stock_only: self.in_stock_only,
        }
    }
}

pub async fn list_components(
    State(db): State<DbState>,
    _user: AuthUser,
    Query(query): Query<ComponentListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Response> {
    let (limit, offset) = pagination.limit_offset();
    let (components, total) = db
        .components
        .list_components(&query.filter(), limit, offset)
        .await?;

    Ok(ok(Paginated::new(components, total, &pagination)))
}

pub async fn get_component(
    State(db): State<DbState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let component = db
        .components
        .get_component(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Component"))?;

    Ok(ok(component))
}

pub async fn create_component(
    State(db): State<DbState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<ComponentCreateInput>,
) -> ApiResult<Response> {
    info!("Admin {} creating component: {}", admin.id, input.name);

    let component = db
        .components
        .create_component(Some(&admin.id), input)
        .await?;
    Ok(created(component))
}

pub async fn update_component(
    State(db): State<DbState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(input): Json<ComponentUpdateInput>,
) -> ApiResult<Response> {
    info!("Admin {} updating component {}", admin.id, id);

    let component = db.components.update_component(&id, input).await?;
    Ok(ok(component))
}

pub async fn delete_component(
    State(db): State<DbState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    info!("Admin {} deleting component {}", admin.id, id);

    db.components.delete_component(&id).await?;
    Ok(ok(serde_json::json!({ "deleted": id })))
}

pub async fn category_counts(State(db): State<DbState>, _user: AuthUser) -> ApiResult<Response> {
    let counts = db.components.category_counts().await?;
    Ok(ok(counts))
}
