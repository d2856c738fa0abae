use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::permissions::{PathPattern, PermissionSource};
use crate::config::Config;

/// Shared application state available in all handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub permissions: PermissionSource,
    /// Compiled public list; these paths bypass authentication and the
    /// access decision entirely.
    pub public_urls: Arc<Vec<PathPattern>>,
}

impl AppState {
    pub fn is_public(&self, path: &str) -> bool {
        self.public_urls.iter().any(|p| p.matches(path))
    }
}

/// Pagination query parameters (`?page=1&page_size=20`). Page numbers are
/// 1-based; page 0 is treated as page 1.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

impl Pagination {
    /// Zero-based page index for the store.
    pub fn index(&self) -> u64 {
        self.page.saturating_sub(1)
    }
}

/// A page of results.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

pub mod auth;
pub mod menus;
pub mod resources;
pub mod roles;
pub mod users;
