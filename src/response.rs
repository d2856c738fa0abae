use serde::Serialize;
use utoipa::ToSchema;

/// Success envelope returned by every Palisade endpoint:
/// ```json
/// {
///   "success": true,
///   "data": { ... }
/// }
/// ```
///
/// Failures never pass through here; they all flow through
/// [`PalisadeError`](crate::error::PalisadeError), which owns the
/// `success: false` error shape.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        (axum::http::StatusCode::OK, axum::Json(self)).into_response()
    }
}
