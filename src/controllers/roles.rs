use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::PalisadeError;
use crate::models::menu;
use crate::models::resource;
use crate::models::role::{self, Entity as Role};
use crate::models::role_menu::{self, Entity as RoleMenu};
use crate::models::role_resource::{self, Entity as RoleResource};
use crate::response::ApiResponse;

use super::{AppState, PageResponse, Pagination};

// ── Request types ──

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusRequest {
    pub status: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignResourcesRequest {
    pub resource_ids: Vec<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignMenusRequest {
    pub menu_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListFilter {
    pub keyword: Option<String>,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route(
            "/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/{id}/status", patch(change_status))
        .route("/{id}/resources", get(get_resources).put(assign_resources))
        .route("/{id}/menus", get(get_menus).put(assign_menus))
}

// ── Handlers ──

async fn list_roles(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<ListFilter>,
) -> Result<ApiResponse<PageResponse<role::Model>>, PalisadeError> {
    let mut finder = Role::find().filter(role::Column::Del.eq(false));
    if let Some(keyword) = filter.keyword.as_deref().filter(|k| !k.is_empty()) {
        finder = finder.filter(role::Column::Name.contains(keyword));
    }

    let paginator = finder
        .order_by_asc(role::Column::Id)
        .paginate(&state.db, page.page_size.max(1));
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page.index()).await?;

    Ok(ApiResponse::success(PageResponse {
        items,
        total,
        page: page.page.max(1),
        page_size: page.page_size.max(1),
    }))
}

async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<role::Model>, PalisadeError> {
    let found = find_live_role(&state, id).await?;
    Ok(ApiResponse::success(found))
}

async fn create_role(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<ApiResponse<role::Model>, PalisadeError> {
    if payload.name.is_empty() {
        return Err(PalisadeError::Validation(
            "Role name is required".to_string(),
        ));
    }

    let existing = Role::find()
        .filter(role::Column::Name.eq(&payload.name))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(PalisadeError::Conflict(
            "Role with this name already exists".to_string(),
        ));
    }

    let new_role = role::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        status: Set(true),
        del: Set(false),
        ..Default::default()
    };

    let created = new_role.insert(&state.db).await?;
    tracing::info!(role = %created.name, "role created");
    Ok(ApiResponse::success(created))
}

async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<ApiResponse<role::Model>, PalisadeError> {
    let found = find_live_role(&state, id).await?;

    let renamed = payload.name.is_some();
    let mut active: role::ActiveModel = found.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    let updated = active.update(&state.db).await?;

    // A rename changes the role name baked into index rules.
    if renamed {
        state.permissions.reload(&state.db).await?;
    }
    Ok(ApiResponse::success(updated))
}

/// Enable or disable the role. The permission index is rebuilt at once;
/// a disabled role stops granting access on the very next request.
async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<StatusRequest>,
) -> Result<ApiResponse<role::Model>, PalisadeError> {
    let found = find_live_role(&state, id).await?;

    let mut active: role::ActiveModel = found.into();
    active.status = Set(payload.status);
    let updated = active.update(&state.db).await?;

    state.permissions.reload(&state.db).await?;
    tracing::info!(role = %updated.name, status = updated.status, "role status changed");
    Ok(ApiResponse::success(updated))
}

/// Soft delete. The link rows stay; the index rebuild and the per-request
/// role resolution both skip deleted roles.
async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<role::Model>, PalisadeError> {
    let found = find_live_role(&state, id).await?;

    let mut active: role::ActiveModel = found.into();
    active.del = Set(true);
    let updated = active.update(&state.db).await?;

    state.permissions.reload(&state.db).await?;
    tracing::info!(role = %updated.name, "role soft-deleted");
    Ok(ApiResponse::success(updated))
}

async fn get_resources(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Vec<resource::Model>>, PalisadeError> {
    let found = find_live_role(&state, id).await?;

    let links = RoleResource::find()
        .filter(role_resource::Column::RoleId.eq(found.id))
        .find_also_related(resource::Entity)
        .all(&state.db)
        .await?;
    let resources = links.into_iter().filter_map(|(_, r)| r).collect();
    Ok(ApiResponse::success(resources))
}

/// Replace the role's resource set and rebuild the permission index.
async fn assign_resources(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AssignResourcesRequest>,
) -> Result<ApiResponse<Vec<resource::Model>>, PalisadeError> {
    let found = find_live_role(&state, id).await?;

    RoleResource::delete_many()
        .filter(role_resource::Column::RoleId.eq(found.id))
        .exec(&state.db)
        .await?;

    if !payload.resource_ids.is_empty() {
        let links: Vec<role_resource::ActiveModel> = payload
            .resource_ids
            .iter()
            .map(|resource_id| role_resource::ActiveModel {
                role_id: Set(found.id),
                resource_id: Set(*resource_id),
                ..Default::default()
            })
            .collect();
        RoleResource::insert_many(links).exec(&state.db).await?;
    }

    state.permissions.reload(&state.db).await?;
    tracing::info!(role = %found.name, resources = payload.resource_ids.len(), "role resources reassigned");

    let links = RoleResource::find()
        .filter(role_resource::Column::RoleId.eq(found.id))
        .find_also_related(resource::Entity)
        .all(&state.db)
        .await?;
    let resources = links.into_iter().filter_map(|(_, r)| r).collect();
    Ok(ApiResponse::success(resources))
}

async fn get_menus(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Vec<menu::Model>>, PalisadeError> {
    let found = find_live_role(&state, id).await?;

    let links = RoleMenu::find()
        .filter(role_menu::Column::RoleId.eq(found.id))
        .find_also_related(menu::Entity)
        .all(&state.db)
        .await?;
    let menus = links.into_iter().filter_map(|(_, m)| m).collect();
    Ok(ApiResponse::success(menus))
}

/// Replace the role's menu set. Menus are presentation only, so no index
/// rebuild is needed.
async fn assign_menus(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AssignMenusRequest>,
) -> Result<ApiResponse<Vec<menu::Model>>, PalisadeError> {
    let found = find_live_role(&state, id).await?;

    RoleMenu::delete_many()
        .filter(role_menu::Column::RoleId.eq(found.id))
        .exec(&state.db)
        .await?;

    if !payload.menu_ids.is_empty() {
        let links: Vec<role_menu::ActiveModel> = payload
            .menu_ids
            .iter()
            .map(|menu_id| role_menu::ActiveModel {
                role_id: Set(found.id),
                menu_id: Set(*menu_id),
                ..Default::default()
            })
            .collect();
        RoleMenu::insert_many(links).exec(&state.db).await?;
    }

    tracing::info!(role = %found.name, menus = payload.menu_ids.len(), "role menus reassigned");

    let links = RoleMenu::find()
        .filter(role_menu::Column::RoleId.eq(found.id))
        .find_also_related(menu::Entity)
        .all(&state.db)
        .await?;
    let menus = links.into_iter().filter_map(|(_, m)| m).collect();
    Ok(ApiResponse::success(menus))
}

async fn find_live_role(state: &AppState, id: i32) -> Result<role::Model, PalisadeError> {
    Role::find_by_id(id)
        .filter(role::Column::Del.eq(false))
        .one(&state.db)
        .await?
        .ok_or_else(|| PalisadeError::NotFound(format!("Role {} not found", id)))
}
