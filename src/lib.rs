//! Palisade: a role-based access control backend.
//!
//! Stateless JWT authentication, a dynamic URL-pattern permission index
//! with atomic hot reload, and the admin CRUD surface for users, roles,
//! protected resources, and navigation menus.

pub mod app;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod openapi;
pub mod response;
pub mod testing;

pub use app::App;
pub use config::{Config, UnmatchedPolicy};
pub use error::{LoginFailure, PalisadeError};
pub use response::ApiResponse;

/// Commonly used imports for applications built on Palisade.
pub mod prelude {
    pub use crate::app::App;
    pub use crate::auth::{CurrentUser, PermissionIndex, PermissionSource};
    pub use crate::config::{Config, UnmatchedPolicy};
    pub use crate::error::{LoginFailure, PalisadeError};
    pub use crate::response::ApiResponse;
}
