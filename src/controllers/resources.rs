use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PalisadeError;
use crate::models::resource::{self, Entity as Resource};
use crate::models::role_resource::{self, Entity as RoleResource};
use crate::response::ApiResponse;

use super::{AppState, PageResponse, Pagination};

// ── Request / Response types ──

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateResourceRequest {
    pub name: String,
    pub pattern: String,
    pub method: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateResourceRequest {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub method: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReloadResponse {
    pub rules: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListFilter {
    pub keyword: Option<String>,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_resources).post(create_resource))
        .route("/reload", post(reload_index))
        .route(
            "/{id}",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
}

// ── Handlers ──

async fn list_resources(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<ListFilter>,
) -> Result<ApiResponse<PageResponse<resource::Model>>, PalisadeError> {
    let mut finder = Resource::find();
    if let Some(keyword) = filter.keyword.as_deref().filter(|k| !k.is_empty()) {
        finder = finder.filter(
            resource::Column::Name
                .contains(keyword)
                .or(resource::Column::Pattern.contains(keyword)),
        );
    }

    let paginator = finder
        .order_by_asc(resource::Column::Id)
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

async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<resource::Model>, PalisadeError> {
    let found = find_resource(&state, id).await?;
    Ok(ApiResponse::success(found))
}

async fn create_resource(
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<ApiResponse<resource::Model>, PalisadeError> {
    validate_pattern(&payload.pattern)?;

    let new_resource = resource::ActiveModel {
        name: Set(payload.name),
        pattern: Set(payload.pattern),
        method: Set(normalize_method(payload.method)),
        description: Set(payload.description),
        ..Default::default()
    };

    let created = new_resource.insert(&state.db).await?;
    state.permissions.reload(&state.db).await?;
    tracing::info!(resource = %created.name, pattern = %created.pattern, "resource created");
    Ok(ApiResponse::success(created))
}

async fn update_resource(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateResourceRequest>,
) -> Result<ApiResponse<resource::Model>, PalisadeError> {
    let found = find_resource(&state, id).await?;

    if let Some(pattern) = payload.pattern.as_deref() {
        validate_pattern(pattern)?;
    }

    let mut active: resource::ActiveModel = found.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(pattern) = payload.pattern {
        active.pattern = Set(pattern);
    }
    if payload.method.is_some() {
        active.method = Set(normalize_method(payload.method));
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }

    let updated = active.update(&state.db).await?;
    state.permissions.reload(&state.db).await?;
    Ok(ApiResponse::success(updated))
}

/// Hard delete. Link rows referencing the resource go with it, then the
/// index is rebuilt so the rule disappears immediately.
async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<resource::Model>, PalisadeError> {
    let found = find_resource(&state, id).await?;

    RoleResource::delete_many()
        .filter(role_resource::Column::ResourceId.eq(id))
        .exec(&state.db)
        .await?;
    Resource::delete_by_id(id).exec(&state.db).await?;

    state.permissions.reload(&state.db).await?;
    tracing::info!(resource = %found.name, "resource deleted");
    Ok(ApiResponse::success(found))
}

/// Force a rebuild of the permission index from the store. Mutating
/// endpoints already rebuild on their own; this exists for out-of-band
/// changes made directly against the database.
#[utoipa::path(
    post,
    path = "/api/resources/reload",
    responses(
        (status = 200, description = "Index rebuilt", body = ApiResponse<ReloadResponse>)
    ),
    tag = "resources",
    security(("bearer_auth" = []))
)]
pub async fn reload_index(
    State(state): State<AppState>,
) -> Result<ApiResponse<ReloadResponse>, PalisadeError> {
    state.permissions.reload(&state.db).await?;
    let rules = state.permissions.snapshot().await.len();
    Ok(ApiResponse::success(ReloadResponse { rules }))
}

fn validate_pattern(pattern: &str) -> Result<(), PalisadeError> {
    if !pattern.starts_with('/') {
        return Err(PalisadeError::Validation(
            "Pattern must start with '/'".to_string(),
        ));
    }
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(PalisadeError::Validation(
            "Pattern must have at least one segment".to_string(),
        ));
    }
    // A non-terminal `**` would leave dead segments behind it.
    if let Some(pos) = segments.iter().position(|s| *s == "**") {
        if pos != segments.len() - 1 {
            return Err(PalisadeError::Validation(
                "'**' is only allowed as the final segment".to_string(),
            ));
        }
    }
    Ok(())
}

fn normalize_method(method: Option<String>) -> Option<String> {
    method
        .filter(|m| !m.is_empty())
        .map(|m| m.to_ascii_uppercase())
}

async fn find_resource(state: &AppState, id: i32) -> Result<resource::Model, PalisadeError> {
    Resource::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| PalisadeError::NotFound(format!("Resource {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_validation() {
        assert!(validate_pattern("/api/users").is_ok());
        assert!(validate_pattern("/api/users/*").is_ok());
        assert!(validate_pattern("/api/users/**").is_ok());

        assert!(validate_pattern("api/users").is_err());
        assert!(validate_pattern("/").is_err());
        assert!(validate_pattern("/api/**/users").is_err());
    }

    #[test]
    fn method_normalization() {
        assert_eq!(
            normalize_method(Some("post".to_string())),
            Some("POST".to_string())
        );
        assert_eq!(normalize_method(Some(String::new())), None);
        assert_eq!(normalize_method(None), None);
    }
}
