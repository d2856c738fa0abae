//! The authorization pipeline: an explicit, ordered pair of middleware
//! layers applied to every route.
//!
//! [`authenticate`] runs first and resolves the request's identity;
//! [`authorize`] runs second and gates on the permission index. Both
//! short-circuit with a structured 401/403 body, so rejected requests
//! never reach a business handler. The order is wired in
//! [`App::router`](crate::App::router), not implied by framework magic.

use axum::{extract::Request, extract::State, http::header, http::Method, middleware::Next,
    response::Response};

use crate::auth::jwt;
use crate::auth::permissions::roles_intersect;
use crate::auth::principal::{find_active_user, load_granted_roles, CurrentUser};
use crate::config::UnmatchedPolicy;
use crate::controllers::AppState;
use crate::error::PalisadeError;

/// Authentication layer. One pass per request:
///
/// 1. Public-listed path → untouched pass-through.
/// 2. No bearer header → anonymous; the access decision rejects later
///    unless the path permits anonymous access.
/// 3. Bearer token → validate, re-load the principal (enabled and
///    soft-delete flags re-checked every request), attach [`CurrentUser`]
///    to the request. Any validation failure is terminal: 401, no retry.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, PalisadeError> {
    if state.is_public(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let Some(header_value) = req.headers().get(header::AUTHORIZATION) else {
        // Anonymous pass-through; no context is attached.
        return Ok(next.run(req).await);
    };

    let token = header_value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            PalisadeError::Unauthenticated("Invalid Authorization header format".to_string())
        })?;

    let claims = match jwt::validate_token(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(err) => {
            // Only the error class is logged, never the token.
            tracing::warn!(class = %err, "bearer token rejected");
            return Err(err.into());
        }
    };

    let user = find_active_user(&state.db, &claims.sub).await?;
    let roles = load_granted_roles(&state.db, user.id).await?;

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
        roles,
    });

    Ok(next.run(req).await)
}

/// Access decision layer. Runs strictly after [`authenticate`] and
/// strictly before the handler.
///
/// OPTIONS requests and public-listed paths always pass. Everything else
/// is matched against the current permission index snapshot: a matched
/// rule requires a non-empty intersection between its role set and the
/// granted roles; an unmatched path falls under the configured
/// [`UnmatchedPolicy`]. Allow/deny is a single boolean gate.
pub async fn authorize(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, PalisadeError> {
    // CORS preflight carries no credentials.
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let path = req.uri().path();
    if state.is_public(path) {
        return Ok(next.run(req).await);
    }

    let current = req.extensions().get::<CurrentUser>();
    let index = state.permissions.snapshot().await;

    match index.required_roles(path, req.method()) {
        Some(required) => match current {
            None => Err(PalisadeError::Unauthenticated(
                "Authentication required".to_string(),
            )),
            Some(user) if roles_intersect(required, &user.roles) => Ok(next.run(req).await),
            Some(user) => {
                tracing::debug!(
                    username = %user.username,
                    path,
                    "access denied: granted roles do not satisfy rule"
                );
                Err(PalisadeError::Forbidden(
                    "Insufficient role for this resource".to_string(),
                ))
            }
        },
        None => match (state.config.unmatched_policy, current) {
            (_, None) => Err(PalisadeError::Unauthenticated(
                "Authentication required".to_string(),
            )),
            (UnmatchedPolicy::RequireAuthenticated, Some(_)) => Ok(next.run(req).await),
            (UnmatchedPolicy::Deny, Some(_)) => Err(PalisadeError::Forbidden(
                "No access rule permits this resource".to_string(),
            )),
        },
    }
}
