use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PalisadeError;
use crate::models::menu::{self, Entity as Menu};
use crate::models::role::Entity as Role;
use crate::models::role_menu::{self, Entity as RoleMenu};
use crate::models::user_role::{self, Entity as UserRole};
use crate::response::ApiResponse;

use super::{AppState, PageResponse, Pagination};

// ── Projections ──

/// A menu with its descendants, as served to the admin console.
#[derive(Debug, Serialize, ToSchema)]
pub struct MenuNode {
    #[serde(flatten)]
    pub menu: menu::Model,
    pub children: Vec<MenuNode>,
}

/// Front-end router metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct RouterMeta {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Router projection consumed by the front-end navigation. Nodes with
/// children are always shown expanded and redirect nowhere themselves.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouterVo {
    pub name: String,
    pub path: String,
    pub component: String,
    pub hidden: bool,
    pub meta: RouterMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub always_show: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[schema(no_recursion)]
    pub children: Vec<RouterVo>,
}

// ── Request types ──

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuRequest {
    #[serde(default)]
    pub parent_id: i32,
    pub title: String,
    pub name: String,
    pub icon: Option<String>,
    pub component: String,
    pub path: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub sort: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMenuRequest {
    pub parent_id: Option<i32>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub component: Option<String>,
    pub path: Option<String>,
    pub sort: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HiddenRequest {
    pub hidden: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListFilter {
    /// Restrict to children of this node; 0 lists the roots.
    pub parent_id: Option<i32>,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_menus).post(create_menu))
        .route("/tree", get(menu_tree))
        .route(
            "/{id}",
            get(get_menu).put(update_menu).delete(delete_menu),
        )
        .route("/{id}/hidden", patch(change_hidden))
}

// ── Handlers ──

async fn list_menus(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<ListFilter>,
) -> Result<ApiResponse<PageResponse<menu::Model>>, PalisadeError> {
    let mut finder = Menu::find();
    if let Some(parent_id) = filter.parent_id {
        finder = finder.filter(menu::Column::ParentId.eq(parent_id));
    }

    let paginator = finder
        .order_by_asc(menu::Column::Sort)
        .order_by_asc(menu::Column::Id)
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

/// Whole navigation tree, children nested under parents, ordered by sort.
async fn menu_tree(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<MenuNode>>, PalisadeError> {
    let all = Menu::find()
        .order_by_asc(menu::Column::Sort)
        .order_by_asc(menu::Column::Id)
        .all(&state.db)
        .await?;
    Ok(ApiResponse::success(build_tree(&all, 0)))
}

async fn get_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<menu::Model>, PalisadeError> {
    let found = find_menu(&state, id).await?;
    Ok(ApiResponse::success(found))
}

async fn create_menu(
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuRequest>,
) -> Result<ApiResponse<menu::Model>, PalisadeError> {
    if payload.title.is_empty() || payload.name.is_empty() {
        return Err(PalisadeError::Validation(
            "Menu title and name are required".to_string(),
        ));
    }

    let new_menu = menu::ActiveModel {
        parent_id: Set(payload.parent_id),
        title: Set(payload.title),
        name: Set(payload.name),
        icon: Set(payload.icon),
        component: Set(payload.component),
        path: Set(payload.path),
        hidden: Set(payload.hidden),
        sort: Set(payload.sort),
        create_time: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    let created = new_menu.insert(&state.db).await?;
    tracing::info!(menu = %created.name, "menu created");
    Ok(ApiResponse::success(created))
}

async fn update_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateMenuRequest>,
) -> Result<ApiResponse<menu::Model>, PalisadeError> {
    let found = find_menu(&state, id).await?;

    let mut active: menu::ActiveModel = found.into();
    if let Some(parent_id) = payload.parent_id {
        active.parent_id = Set(parent_id);
    }
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(icon) = payload.icon {
        active.icon = Set(Some(icon));
    }
    if let Some(component) = payload.component {
        active.component = Set(component);
    }
    if let Some(path) = payload.path {
        active.path = Set(path);
    }
    if let Some(sort) = payload.sort {
        active.sort = Set(sort);
    }

    let updated = active.update(&state.db).await?;
    Ok(ApiResponse::success(updated))
}

async fn change_hidden(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<HiddenRequest>,
) -> Result<ApiResponse<menu::Model>, PalisadeError> {
    let found = find_menu(&state, id).await?;

    let mut active: menu::ActiveModel = found.into();
    active.hidden = Set(payload.hidden);
    let updated = active.update(&state.db).await?;
    Ok(ApiResponse::success(updated))
}

async fn delete_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<menu::Model>, PalisadeError> {
    let found = find_menu(&state, id).await?;

    RoleMenu::delete_many()
        .filter(role_menu::Column::MenuId.eq(id))
        .exec(&state.db)
        .await?;
    Menu::delete_by_id(id).exec(&state.db).await?;

    tracing::info!(menu = %found.name, "menu deleted");
    Ok(ApiResponse::success(found))
}

// ── Projections for the authenticated principal ──

/// Router tree for a user: the union of the menus linked to the user's
/// roles, deduplicated and nested. Hidden nodes are included so the
/// front end can decide whether to render them. Disabled or soft-deleted
/// roles contribute nothing, matching the granted-role resolution.
pub async fn routers_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<RouterVo>, PalisadeError> {
    let role_ids: Vec<i32> = UserRole::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .find_also_related(Role)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(_, r)| r)
        .filter(|r| r.status && !r.del)
        .map(|r| r.id)
        .collect();

    if role_ids.is_empty() {
        return Ok(Vec::new());
    }

    let menu_ids: HashSet<i32> = RoleMenu::find()
        .filter(role_menu::Column::RoleId.is_in(role_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.menu_id)
        .collect();

    if menu_ids.is_empty() {
        return Ok(Vec::new());
    }

    let menus = Menu::find()
        .filter(menu::Column::Id.is_in(menu_ids))
        .order_by_asc(menu::Column::Sort)
        .order_by_asc(menu::Column::Id)
        .all(db)
        .await?;

    Ok(build_routers(&menus, 0))
}

fn build_tree(all: &[menu::Model], parent_id: i32) -> Vec<MenuNode> {
    all.iter()
        .filter(|m| m.parent_id == parent_id)
        .map(|m| MenuNode {
            menu: m.clone(),
            children: build_tree(all, m.id),
        })
        .collect()
}

fn build_routers(all: &[menu::Model], parent_id: i32) -> Vec<RouterVo> {
    all.iter()
        .filter(|m| m.parent_id == parent_id)
        .map(|m| {
            let children = build_routers(all, m.id);
            let has_children = !children.is_empty();
            RouterVo {
                name: m.name.clone(),
                path: m.path.clone(),
                component: m.component.clone(),
                hidden: m.hidden,
                meta: RouterMeta {
                    title: m.title.clone(),
                    icon: m.icon.clone(),
                },
                always_show: has_children.then_some(true),
                redirect: has_children.then(|| "noRedirect".to_string()),
                children,
            }
        })
        .collect()
}

async fn find_menu(state: &AppState, id: i32) -> Result<menu::Model, PalisadeError> {
    Menu::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| PalisadeError::NotFound(format!("Menu {} not found", id)))
}
