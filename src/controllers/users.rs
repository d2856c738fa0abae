use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::hash_password;
use crate::auth::principal::load_user_roles;
use crate::error::PalisadeError;
use crate::models::role;
use crate::models::user::{self, Entity as User, UserResponse};
use crate::models::user_role::{self, Entity as UserRole};
use crate::response::ApiResponse;

use super::{AppState, PageResponse, Pagination};

// ── Request types ──

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListFilter {
    pub keyword: Option<String>,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/{id}/status", patch(change_status))
        .route("/{id}/roles", get(get_roles).put(assign_roles))
}

// ── Handlers ──

async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<ListFilter>,
) -> Result<ApiResponse<PageResponse<UserResponse>>, PalisadeError> {
    let mut finder = User::find().filter(user::Column::Del.eq(false));
    if let Some(keyword) = filter.keyword.as_deref().filter(|k| !k.is_empty()) {
        finder = finder.filter(user::Column::Username.contains(keyword));
    }

    let paginator = finder
        .order_by_asc(user::Column::Id)
        .paginate(&state.db, page.page_size.max(1));
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(ApiResponse::success(PageResponse {
        items,
        total,
        page: page.page.max(1),
        page_size: page.page_size.max(1),
    }))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<UserResponse>, PalisadeError> {
    let user_model = find_live_user(&state, id).await?;
    Ok(ApiResponse::success(UserResponse::from(user_model)))
}

async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<ApiResponse<UserResponse>, PalisadeError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(PalisadeError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let existing = User::find()
        .filter(user::Column::Username.eq(&payload.username))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(PalisadeError::Conflict(
            "User with this username already exists".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    let new_user = user::ActiveModel {
        username: Set(payload.username),
        password_hash: Set(hash_password(&payload.password)?),
        icon: Set(payload.icon),
        enabled: Set(true),
        del: Set(false),
        create_time: Set(now),
        login_time: Set(Some(now)),
        ..Default::default()
    };

    let user_model = new_user.insert(&state.db).await?;
    tracing::info!(username = %user_model.username, "user created");
    Ok(ApiResponse::success(UserResponse::from(user_model)))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<ApiResponse<UserResponse>, PalisadeError> {
    let user_model = find_live_user(&state, id).await?;

    // A rename must not collide with another account.
    if let Some(username) = payload.username.as_deref() {
        if username != user_model.username {
            let taken = User::find()
                .filter(user::Column::Username.eq(username))
                .one(&state.db)
                .await?;
            if taken.is_some() {
                return Err(PalisadeError::Conflict(
                    "User with this username already exists".to_string(),
                ));
            }
        }
    }

    let mut active: user::ActiveModel = user_model.into();
    if let Some(username) = payload.username {
        active.username = Set(username);
    }
    if let Some(icon) = payload.icon {
        active.icon = Set(Some(icon));
    }
    let updated = active.update(&state.db).await?;
    Ok(ApiResponse::success(UserResponse::from(updated)))
}

/// Enable or disable the account. Takes effect on the account's next
/// request, not just its next login: the authentication layer re-checks
/// the flag every time.
async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<StatusRequest>,
) -> Result<ApiResponse<UserResponse>, PalisadeError> {
    let user_model = find_live_user(&state, id).await?;

    let mut active: user::ActiveModel = user_model.into();
    active.enabled = Set(payload.enabled);
    let updated = active.update(&state.db).await?;
    tracing::info!(username = %updated.username, enabled = updated.enabled, "user status changed");
    Ok(ApiResponse::success(UserResponse::from(updated)))
}

/// Soft delete: the row is flagged, not removed.
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<UserResponse>, PalisadeError> {
    let user_model = find_live_user(&state, id).await?;

    let mut active: user::ActiveModel = user_model.into();
    active.del = Set(true);
    let updated = active.update(&state.db).await?;
    tracing::info!(username = %updated.username, "user soft-deleted");
    Ok(ApiResponse::success(UserResponse::from(updated)))
}

async fn get_roles(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Vec<role::Model>>, PalisadeError> {
    let user_model = find_live_user(&state, id).await?;
    let roles = load_user_roles(&state.db, user_model.id).await?;
    Ok(ApiResponse::success(roles))
}

/// Replace the user's role set. Takes effect on the user's next request
/// because granted roles are re-resolved per request.
async fn assign_roles(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AssignRolesRequest>,
) -> Result<ApiResponse<Vec<role::Model>>, PalisadeError> {
    let user_model = find_live_user(&state, id).await?;

    UserRole::delete_many()
        .filter(user_role::Column::UserId.eq(user_model.id))
        .exec(&state.db)
        .await?;

    if !payload.role_ids.is_empty() {
        let links: Vec<user_role::ActiveModel> = payload
            .role_ids
            .iter()
            .map(|role_id| user_role::ActiveModel {
                user_id: Set(user_model.id),
                role_id: Set(*role_id),
                ..Default::default()
            })
            .collect();
        UserRole::insert_many(links).exec(&state.db).await?;
    }

    let roles = load_user_roles(&state.db, user_model.id).await?;
    tracing::info!(username = %user_model.username, roles = roles.len(), "user roles reassigned");
    Ok(ApiResponse::success(roles))
}

async fn find_live_user(state: &AppState, id: i32) -> Result<user::Model, PalisadeError> {
    User::find_by_id(id)
        .filter(user::Column::Del.eq(false))
        .one(&state.db)
        .await?
        .ok_or_else(|| PalisadeError::NotFound(format!("User {} not found", id)))
}
