//! CRUD surface tests.
//!
//! These run under the relaxed unmatched policy so one authenticated
//! admin token reaches every endpoint; the role gate itself is covered
//! by the access control tests.

use palisade::testing::TestApp;

async fn admin_app() -> (TestApp, String) {
    let app = TestApp::new_require_authenticated().await;
    app.seed_user("admin", "secret123", true).await;
    let token = app.login("admin", "secret123").await;
    (app, token)
}

// ── Users ──

#[tokio::test]
async fn user_lifecycle() {
    let (app, token) = admin_app().await;

    let body = serde_json::json!({"username": "alice", "password": "secret123"});
    let created = app
        .client
        .post_with_auth(&app.url("/api/users"), &token, &body.to_string())
        .await;
    assert_eq!(created.status, 200);
    let id = created.data()["id"].as_i64().unwrap();
    // The hash never appears in a response body.
    assert!(created.data().get("password_hash").is_none());

    let updated = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/users/{}", id)),
            &token,
            &serde_json::json!({"icon": "avatar.png"}).to_string(),
        )
        .await;
    assert_eq!(updated.status, 200);
    assert_eq!(updated.data()["icon"].as_str(), Some("avatar.png"));

    let disabled = app
        .client
        .patch_with_auth(
            &app.url(&format!("/api/users/{}/status", id)),
            &token,
            &serde_json::json!({"enabled": false}).to_string(),
        )
        .await;
    assert_eq!(disabled.status, 200);
    assert_eq!(disabled.data()["enabled"].as_bool(), Some(false));

    let deleted = app
        .client
        .delete_with_auth(&app.url(&format!("/api/users/{}", id)), &token)
        .await;
    assert_eq!(deleted.status, 200);

    // Soft-deleted rows are invisible to the admin surface.
    let gone = app
        .client
        .get_with_auth(&app.url(&format!("/api/users/{}", id)), &token)
        .await;
    assert_eq!(gone.status, 404);
}

#[tokio::test]
async fn renaming_a_user_to_a_taken_username_conflicts() {
    let (app, token) = admin_app().await;
    app.seed_user("alice", "secret123", true).await;
    let bob = app.seed_user("bob", "secret123", true).await;

    let res = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/users/{}", bob.id)),
            &token,
            &serde_json::json!({"username": "alice"}).to_string(),
        )
        .await;
    assert_eq!(res.status, 409);

    // Re-submitting the current name is not a collision.
    let unchanged = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/users/{}", bob.id)),
            &token,
            &serde_json::json!({"username": "bob"}).to_string(),
        )
        .await;
    assert_eq!(unchanged.status, 200);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let (app, token) = admin_app().await;

    let body = serde_json::json!({"username": "alice", "password": "secret123"}).to_string();
    let first = app
        .client
        .post_with_auth(&app.url("/api/users"), &token, &body)
        .await;
    assert_eq!(first.status, 200);

    let second = app
        .client
        .post_with_auth(&app.url("/api/users"), &token, &body)
        .await;
    assert_eq!(second.status, 409);
}

#[tokio::test]
async fn user_list_filters_by_keyword_and_paginates() {
    let (app, token) = admin_app().await;
    for name in ["alice", "alicia", "bob"] {
        app.seed_user(name, "secret123", true).await;
    }

    let res = app
        .client
        .get_with_auth(&app.url("/api/users?keyword=alic"), &token)
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["total"].as_u64(), Some(2));

    let page = app
        .client
        .get_with_auth(&app.url("/api/users?page=1&page_size=2"), &token)
        .await;
    assert_eq!(page.data()["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn role_assignment_replaces_the_set() {
    let (app, token) = admin_app().await;
    let user = app.seed_user("alice", "secret123", true).await;
    let a = app.seed_role("A").await;
    let b = app.seed_role("B").await;

    let assigned = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/users/{}/roles", user.id)),
            &token,
            &serde_json::json!({"role_ids": [a.id, b.id]}).to_string(),
        )
        .await;
    assert_eq!(assigned.data().as_array().unwrap().len(), 2);

    let replaced = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/users/{}/roles", user.id)),
            &token,
            &serde_json::json!({"role_ids": [b.id]}).to_string(),
        )
        .await;
    let replaced_data = replaced.data();
    let names: Vec<&str> = replaced_data
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["B"]);
}

// ── Roles ──

#[tokio::test]
async fn role_lifecycle() {
    let (app, token) = admin_app().await;

    let created = app
        .client
        .post_with_auth(
            &app.url("/api/roles"),
            &token,
            &serde_json::json!({"name": "AUDITOR", "description": "read only"}).to_string(),
        )
        .await;
    assert_eq!(created.status, 200);
    let id = created.data()["id"].as_i64().unwrap();

    let duplicate = app
        .client
        .post_with_auth(
            &app.url("/api/roles"),
            &token,
            &serde_json::json!({"name": "AUDITOR"}).to_string(),
        )
        .await;
    assert_eq!(duplicate.status, 409);

    let disabled = app
        .client
        .patch_with_auth(
            &app.url(&format!("/api/roles/{}/status", id)),
            &token,
            &serde_json::json!({"status": false}).to_string(),
        )
        .await;
    assert_eq!(disabled.data()["status"].as_bool(), Some(false));

    let deleted = app
        .client
        .delete_with_auth(&app.url(&format!("/api/roles/{}", id)), &token)
        .await;
    assert_eq!(deleted.status, 200);

    let gone = app
        .client
        .get_with_auth(&app.url(&format!("/api/roles/{}", id)), &token)
        .await;
    assert_eq!(gone.status, 404);
}

#[tokio::test]
async fn assigning_resources_to_a_role_rebuilds_the_index() {
    let (app, token) = admin_app().await;
    let role = app.seed_role("ADMIN").await;
    let rule = app.seed_resource("/api/reports/**", None).await;

    let res = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/roles/{}/resources", role.id)),
            &token,
            &serde_json::json!({"resource_ids": [rule.id]}).to_string(),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data().as_array().unwrap().len(), 1);

    let snapshot = app.permissions.snapshot().await;
    assert!(snapshot
        .required_roles("/api/reports/q3", &axum::http::Method::GET)
        .is_some());
}

// ── Resources ──

#[tokio::test]
async fn resource_lifecycle_and_validation() {
    let (app, token) = admin_app().await;

    let bad = app
        .client
        .post_with_auth(
            &app.url("/api/resources"),
            &token,
            &serde_json::json!({"name": "bad", "pattern": "api/users"}).to_string(),
        )
        .await;
    assert_eq!(bad.status, 422);

    let misplaced = app
        .client
        .post_with_auth(
            &app.url("/api/resources"),
            &token,
            &serde_json::json!({"name": "bad", "pattern": "/api/**/users"}).to_string(),
        )
        .await;
    assert_eq!(misplaced.status, 422);

    let created = app
        .client
        .post_with_auth(
            &app.url("/api/resources"),
            &token,
            &serde_json::json!({"name": "user admin", "pattern": "/api/users/**", "method": "get"})
                .to_string(),
        )
        .await;
    assert_eq!(created.status, 200);
    // Methods are stored normalized.
    assert_eq!(created.data()["method"].as_str(), Some("GET"));
    let id = created.data()["id"].as_i64().unwrap();

    let updated = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/resources/{}", id)),
            &token,
            &serde_json::json!({"pattern": "/api/users/*"}).to_string(),
        )
        .await;
    assert_eq!(updated.data()["pattern"].as_str(), Some("/api/users/*"));

    let deleted = app
        .client
        .delete_with_auth(&app.url(&format!("/api/resources/{}", id)), &token)
        .await;
    assert_eq!(deleted.status, 200);
}

#[tokio::test]
async fn explicit_reload_reports_the_rule_count() {
    let (app, token) = admin_app().await;
    let role = app.seed_role("ADMIN").await;
    let rule = app.seed_resource("/api/users/**", None).await;
    app.grant_resource(role.id, rule.id).await;

    let res = app
        .client
        .post_with_auth(&app.url("/api/resources/reload"), &token, "{}")
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["rules"].as_u64(), Some(1));
}

// ── Menus ──

#[tokio::test]
async fn menu_tree_nests_children() {
    let (app, token) = admin_app().await;
    let parent = app.seed_menu(0, "system", 1).await;
    app.seed_menu(parent.id, "users", 1).await;
    app.seed_menu(parent.id, "roles", 2).await;

    let res = app
        .client
        .get_with_auth(&app.url("/api/menus/tree"), &token)
        .await;
    assert_eq!(res.status, 200);
    let tree = res.data();
    assert_eq!(tree.as_array().unwrap().len(), 1);
    assert_eq!(tree[0]["children"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn menu_crud_and_hidden_switch() {
    let (app, token) = admin_app().await;

    let created = app
        .client
        .post_with_auth(
            &app.url("/api/menus"),
            &token,
            &serde_json::json!({
                "title": "System", "name": "system",
                "component": "Layout", "path": "/system"
            })
            .to_string(),
        )
        .await;
    assert_eq!(created.status, 200);
    let id = created.data()["id"].as_i64().unwrap();

    let hidden = app
        .client
        .patch_with_auth(
            &app.url(&format!("/api/menus/{}/hidden", id)),
            &token,
            &serde_json::json!({"hidden": true}).to_string(),
        )
        .await;
    assert_eq!(hidden.data()["hidden"].as_bool(), Some(true));

    let deleted = app
        .client
        .delete_with_auth(&app.url(&format!("/api/menus/{}", id)), &token)
        .await;
    assert_eq!(deleted.status, 200);

    let gone = app
        .client
        .get_with_auth(&app.url(&format!("/api/menus/{}", id)), &token)
        .await;
    assert_eq!(gone.status, 404);
}

#[tokio::test]
async fn user_info_projects_roles_and_menu_routers() {
    let app = TestApp::new_require_authenticated().await;
    let user = app.seed_user("alice", "secret123", true).await;
    let role = app.seed_role("ADMIN").await;
    app.grant_role(user.id, role.id).await;

    let parent = app.seed_menu(0, "system", 1).await;
    let child = app.seed_menu(parent.id, "users", 1).await;
    app.grant_menu(role.id, parent.id).await;
    app.grant_menu(role.id, child.id).await;

    let token = app.login("alice", "secret123").await;
    let res = app
        .client
        .get_with_auth(&app.url("/api/auth/info"), &token)
        .await;
    assert_eq!(res.status, 200);

    let data = res.data();
    assert_eq!(data["username"].as_str(), Some("alice"));
    assert_eq!(data["roles"][0].as_str(), Some("ADMIN"));

    let menus = data["menus"].as_array().unwrap();
    assert_eq!(menus.len(), 1);
    assert_eq!(menus[0]["name"].as_str(), Some("system"));
    assert_eq!(menus[0]["alwaysShow"].as_bool(), Some(true));
    assert_eq!(menus[0]["redirect"].as_str(), Some("noRedirect"));
    assert_eq!(menus[0]["children"][0]["name"].as_str(), Some("users"));
}

#[tokio::test]
async fn user_info_omits_menus_from_disabled_roles() {
    use palisade::models::role::Entity as Role;
    use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};

    let app = TestApp::new_require_authenticated().await;
    let user = app.seed_user("alice", "secret123", true).await;
    let active_role = app.seed_role("VIEWER").await;
    let dormant_role = app.seed_role("ADMIN").await;
    app.grant_role(user.id, active_role.id).await;
    app.grant_role(user.id, dormant_role.id).await;

    let dashboard = app.seed_menu(0, "dashboard", 1).await;
    let settings = app.seed_menu(0, "settings", 2).await;
    app.grant_menu(active_role.id, dashboard.id).await;
    app.grant_menu(dormant_role.id, settings.id).await;

    let role = Role::find_by_id(dormant_role.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let mut disabled: palisade::models::role::ActiveModel = role.into();
    disabled.status = Set(false);
    disabled.update(&app.db).await.unwrap();

    let token = app.login("alice", "secret123").await;
    let res = app
        .client
        .get_with_auth(&app.url("/api/auth/info"), &token)
        .await;
    assert_eq!(res.status, 200);

    // The projection mirrors the granted set: a disabled role's menus
    // disappear along with its access.
    let res_data = res.data();
    let names: Vec<&str> = res_data["menus"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["dashboard"]);
}
