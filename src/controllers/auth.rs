use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::password::{burn_hashing_round, verify_password};
use crate::auth::issue_token;
use crate::auth::principal::{find_active_user, load_granted_roles, CurrentUser};
use crate::error::{LoginFailure, PalisadeError};
use crate::models::user::{self, Entity as User};
use crate::response::ApiResponse;

use super::menus::{routers_for_user, RouterVo};
use super::AppState;

// ── Request / Response types ──

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfoResponse {
    pub username: String,
    pub icon: Option<String>,
    pub roles: Vec<String>,
    /// Navigation projection of what this user may see; derived after
    /// authorization, never used to enforce it.
    pub menus: Vec<RouterVo>,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/info", get(user_info))
}

// ── Handlers ──

/// Log in with username and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Unknown user, invalid credentials, or disabled account")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<TokenResponse>, PalisadeError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(PalisadeError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let found = User::find()
        .filter(user::Column::Username.eq(&payload.username))
        .filter(user::Column::Del.eq(false))
        .one(&state.db)
        .await?;

    let Some(user_model) = found else {
        // Keep the rejection cost comparable to a wrong password so the
        // response timing does not reveal whether the username exists.
        burn_hashing_round(&payload.password);
        tracing::warn!(username = %payload.username, "login failed: unknown user");
        return Err(LoginFailure::UnknownUser.into());
    };

    if !verify_password(&payload.password, &user_model.password_hash)? {
        tracing::warn!(username = %user_model.username, "login failed: invalid credentials");
        return Err(LoginFailure::InvalidCredentials.into());
    }

    if !user_model.enabled {
        tracing::warn!(username = %user_model.username, "login failed: account disabled");
        return Err(LoginFailure::AccountDisabled.into());
    }

    let token = issue_token(
        &user_model.username,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    let username = user_model.username.clone();
    let mut active: user::ActiveModel = user_model.into();
    active.login_time = Set(Some(Utc::now().naive_utc()));
    active.update(&state.db).await?;

    tracing::info!(username = %username, "login succeeded");
    Ok(ApiResponse::success(TokenResponse { token }))
}

/// Log out.
///
/// Tokens are stateless and carry their own expiry; there is nothing to
/// revoke server-side, so this is an acknowledgment for the console.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<MessageResponse>)
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(current: CurrentUser) -> Result<ApiResponse<MessageResponse>, PalisadeError> {
    tracing::info!(username = %current.username, "logout");
    Ok(ApiResponse::success(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Current principal: identity, granted roles, and menu router tree.
#[utoipa::path(
    get,
    path = "/api/auth/info",
    responses(
        (status = 200, description = "Current user info", body = ApiResponse<UserInfoResponse>),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn user_info(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<ApiResponse<UserInfoResponse>, PalisadeError> {
    let user_model = find_active_user(&state.db, &current.username).await?;
    let roles = load_granted_roles(&state.db, user_model.id).await?;
    let menus = routers_for_user(&state.db, user_model.id).await?;

    Ok(ApiResponse::success(UserInfoResponse {
        username: user_model.username,
        icon: user_model.icon,
        roles,
        menus,
    }))
}
