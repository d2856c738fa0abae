use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Standard error type for Palisade.
///
/// Authentication and authorization failures are converted to structured
/// responses at the middleware boundary; they never reach generic error
/// handling as exceptions.
#[derive(Debug, Error)]
pub enum PalisadeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing, malformed, expired token, or a disabled/removed account.
    /// Always surfaces as 401 with code `UNAUTHENTICATED`.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but the granted roles do not satisfy the matched rule.
    /// Always surfaces as 403 with code `FORBIDDEN`.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Credential verification failure at the login endpoint.
    #[error(transparent)]
    Login(#[from] LoginFailure),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Why a login attempt was rejected. No token is issued in any of these
/// cases and no security context is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginFailure {
    #[error("Unknown username or password")]
    UnknownUser,

    #[error("Unknown username or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,
}

impl PalisadeError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PalisadeError::NotFound(_) => StatusCode::NOT_FOUND,
            PalisadeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PalisadeError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            PalisadeError::Forbidden(_) => StatusCode::FORBIDDEN,
            PalisadeError::Login(_) => StatusCode::UNAUTHORIZED,
            PalisadeError::Conflict(_) => StatusCode::CONFLICT,
            PalisadeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PalisadeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PalisadeError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            PalisadeError::NotFound(_) => "NOT_FOUND",
            PalisadeError::BadRequest(_) => "BAD_REQUEST",
            PalisadeError::Unauthenticated(_) => "UNAUTHENTICATED",
            PalisadeError::Forbidden(_) => "FORBIDDEN",
            PalisadeError::Login(LoginFailure::UnknownUser) => "UNKNOWN_USER",
            PalisadeError::Login(LoginFailure::InvalidCredentials) => "INVALID_CREDENTIALS",
            PalisadeError::Login(LoginFailure::AccountDisabled) => "ACCOUNT_DISABLED",
            PalisadeError::Conflict(_) => "CONFLICT",
            PalisadeError::Validation(_) => "VALIDATION_ERROR",
            PalisadeError::Internal(_) => "INTERNAL_ERROR",
            PalisadeError::Database(_) => "DATABASE_ERROR",
        }
    }
}

/// Error detail for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// The `success: false` counterpart of the success envelope.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

impl axum::response::IntoResponse for PalisadeError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        // Internal/store detail stays out of the response body.
        let message = match &self {
            PalisadeError::Internal(_) | PalisadeError::Database(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_maps_to_401() {
        let err = PalisadeError::Unauthenticated("missing token".into());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
    }

    #[test]
    fn forbidden_maps_to_403() {
        let err = PalisadeError::Forbidden("role required".into());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[test]
    fn login_failures_are_distinguished() {
        assert_eq!(
            PalisadeError::Login(LoginFailure::UnknownUser).error_code(),
            "UNKNOWN_USER"
        );
        assert_eq!(
            PalisadeError::Login(LoginFailure::InvalidCredentials).error_code(),
            "INVALID_CREDENTIALS"
        );
        assert_eq!(
            PalisadeError::Login(LoginFailure::AccountDisabled).error_code(),
            "ACCOUNT_DISABLED"
        );
    }

    #[test]
    fn unknown_user_and_bad_password_share_a_message() {
        // The response body must not reveal which of the two failed.
        assert_eq!(
            LoginFailure::UnknownUser.to_string(),
            LoginFailure::InvalidCredentials.to_string()
        );
    }

    #[test]
    fn database_errors_do_not_leak_detail() {
        let err = PalisadeError::Internal("connection pool exhausted at 10.0.0.3".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_body_carries_code_and_message() {
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: "FORBIDDEN".to_string(),
                message: "Insufficient role".to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "FORBIDDEN");
        assert!(json.get("data").is_none());
    }
}
