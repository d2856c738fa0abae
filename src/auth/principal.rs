use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::error::PalisadeError;
use crate::models::role::{self, Entity as Role};
use crate::models::user::{self, Entity as User};
use crate::models::user_role;

/// The resolved identity of an authenticated request.
///
/// Built by the authentication middleware and attached to the request's
/// extensions; handlers receive it as an extractor. The context lives and
/// dies with the request — there is no ambient thread-local state.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    /// Names of the enabled roles granted to this user.
    pub roles: Vec<String>,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = PalisadeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| PalisadeError::Unauthenticated("Authentication required".to_string()))
    }
}

/// Load a usable principal by username: soft-deleted rows are invisible,
/// disabled accounts are rejected even when the presented token still
/// verifies (the enabled flag is re-checked on every request).
pub async fn find_active_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<user::Model, PalisadeError> {
    let found = User::find()
        .filter(user::Column::Username.eq(username))
        .filter(user::Column::Del.eq(false))
        .one(db)
        .await?;

    match found {
        Some(u) if u.enabled => Ok(u),
        Some(_) | None => Err(PalisadeError::Unauthenticated(
            "Account is not available".to_string(),
        )),
    }
}

/// Resolve the granted role names for a user. Disabled or soft-deleted
/// roles grant nothing even while the link rows still exist.
pub async fn load_granted_roles(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<String>, PalisadeError> {
    let links = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .find_also_related(Role)
        .all(db)
        .await?;

    Ok(links
        .into_iter()
        .filter_map(|(_, r)| r)
        .filter(|r| r.status && !r.del)
        .map(|r| r.name)
        .collect())
}

/// Full role rows for a user (admin surface; no status filtering).
pub async fn load_user_roles(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<role::Model>, PalisadeError> {
    let links = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .find_also_related(Role)
        .all(db)
        .await?;

    Ok(links.into_iter().filter_map(|(_, r)| r).collect())
}
