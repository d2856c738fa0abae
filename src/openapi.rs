use utoipa::OpenApi;

use crate::controllers::auth::{LoginRequest, MessageResponse, TokenResponse, UserInfoResponse};
use crate::controllers::menus::{RouterMeta, RouterVo};
use crate::controllers::resources::ReloadResponse;
use crate::error::ErrorDetail;
use crate::models::user::UserResponse;

/// Auto-generated OpenAPI documentation for Palisade.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Palisade API",
        version = "0.3.0",
        description = "Role-based access control backend with a dynamic URL permission index."
    ),
    paths(
        crate::controllers::auth::login,
        crate::controllers::auth::logout,
        crate::controllers::auth::user_info,
        crate::controllers::resources::reload_index,
    ),
    components(
        schemas(
            LoginRequest,
            TokenResponse,
            MessageResponse,
            UserInfoResponse,
            RouterVo,
            RouterMeta,
            ReloadResponse,
            UserResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "resources", description = "Protected resource rules")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add JWT Bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
