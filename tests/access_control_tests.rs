use palisade::testing::TestApp;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};

/// Seed a user with one enabled role and return (user id, role id, token).
async fn seed_member(app: &TestApp, username: &str, role_name: &str) -> (i32, i32, String) {
    let user = app.seed_user(username, "secret123", true).await;
    let role = app.seed_role(role_name).await;
    app.grant_role(user.id, role.id).await;
    let token = app.login(username, "secret123").await;
    (user.id, role.id, token)
}

#[tokio::test]
async fn public_path_needs_no_token() {
    let app = TestApp::new().await;
    let res = app.client.get(&app.url("/health")).await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn anonymous_request_to_protected_path_is_401() {
    let app = TestApp::new().await;
    let res = app.client.get(&app.url("/api/users")).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.error_code(), "UNAUTHENTICATED");
}

#[tokio::test]
async fn options_requests_bypass_the_access_decision() {
    let app = TestApp::new().await;
    let res = app.client.options(&app.url("/api/users")).await;
    // Preflight must never be challenged; whatever the router answers,
    // it is not an auth rejection.
    assert_ne!(res.status, 401);
    assert_ne!(res.status, 403);
}

#[tokio::test]
async fn garbage_token_is_401() {
    let app = TestApp::new().await;
    let res = app
        .client
        .get_with_auth(&app.url("/api/users"), "not.a.token")
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn non_bearer_authorization_header_is_401() {
    let app = TestApp::new().await;
    let res = app
        .client
        .get_with_header(&app.url("/api/users"), "Basic YWxpY2U6c2VjcmV0")
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn role_gate_rejects_then_admits_after_grant() {
    let app = TestApp::new().await;
    let (_, admin_role, admin_token) = seed_member(&app, "admin", "ADMIN").await;
    let (_, editor_role, editor_token) = seed_member(&app, "editor", "EDITOR").await;

    let rule = app.seed_resource("/api/users/**", None).await;
    app.grant_resource(admin_role, rule.id).await;

    let admin_res = app
        .client
        .get_with_auth(&app.url("/api/users"), &admin_token)
        .await;
    assert_eq!(admin_res.status, 200);

    let editor_res = app
        .client
        .get_with_auth(&app.url("/api/users"), &editor_token)
        .await;
    assert_eq!(editor_res.status, 403);
    assert_eq!(editor_res.error_code(), "FORBIDDEN");

    // Granting the rule to EDITOR rebuilds the index; the same token now
    // passes without a new login.
    app.grant_resource(editor_role, rule.id).await;
    let editor_res = app
        .client
        .get_with_auth(&app.url("/api/users"), &editor_token)
        .await;
    assert_eq!(editor_res.status, 200);
}

#[tokio::test]
async fn rule_change_needs_a_reload_to_take_effect() {
    let app = TestApp::new().await;
    let (_, role_id, token) = seed_member(&app, "admin", "ADMIN").await;
    let rule = app.seed_resource("/api/users/**", None).await;

    // Raw link row, no index rebuild: the running snapshot still has no
    // rule for the path, so the fail-closed policy denies.
    palisade::models::role_resource::ActiveModel {
        role_id: Set(role_id),
        resource_id: Set(rule.id),
        ..Default::default()
    }
    .insert(&app.db)
    .await
    .unwrap();

    let before = app
        .client
        .get_with_auth(&app.url("/api/users"), &token)
        .await;
    assert_eq!(before.status, 403);

    app.reload_permissions().await;
    let after = app
        .client
        .get_with_auth(&app.url("/api/users"), &token)
        .await;
    assert_eq!(after.status, 200);
}

#[tokio::test]
async fn user_disabled_after_token_issuance_is_rejected() {
    let app = TestApp::new().await;
    let (user_id, role_id, token) = seed_member(&app, "admin", "ADMIN").await;
    let rule = app.seed_resource("/api/users/**", None).await;
    app.grant_resource(role_id, rule.id).await;

    let ok = app
        .client
        .get_with_auth(&app.url("/api/users"), &token)
        .await;
    assert_eq!(ok.status, 200);

    let user = palisade::models::user::Entity::find_by_id(user_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: palisade::models::user::ActiveModel = user.into();
    active.enabled = Set(false);
    active.update(&app.db).await.unwrap();

    // The token still verifies cryptographically, but the enabled flag is
    // re-checked per request.
    let rejected = app
        .client
        .get_with_auth(&app.url("/api/users"), &token)
        .await;
    assert_eq!(rejected.status, 401);
}

#[tokio::test]
async fn disabled_role_stops_granting_access() {
    let app = TestApp::new().await;
    let (_, role_id, token) = seed_member(&app, "admin", "ADMIN").await;
    let rule = app.seed_resource("/api/users/**", None).await;
    app.grant_resource(role_id, rule.id).await;

    let role = palisade::models::role::Entity::find_by_id(role_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: palisade::models::role::ActiveModel = role.into();
    active.status = Set(false);
    active.update(&app.db).await.unwrap();
    app.reload_permissions().await;

    let res = app
        .client
        .get_with_auth(&app.url("/api/users"), &token)
        .await;
    // The rule evaporated with its only role; fail-closed denies.
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn unmatched_path_is_denied_under_the_default_policy() {
    let app = TestApp::new().await;
    let (_, _, token) = seed_member(&app, "admin", "ADMIN").await;

    let res = app
        .client
        .get_with_auth(&app.url("/api/menus"), &token)
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn unmatched_path_passes_authenticated_users_under_the_relaxed_policy() {
    let app = TestApp::new_require_authenticated().await;
    let (_, _, token) = seed_member(&app, "admin", "ADMIN").await;

    let authed = app
        .client
        .get_with_auth(&app.url("/api/menus"), &token)
        .await;
    assert_eq!(authed.status, 200);

    let anonymous = app.client.get(&app.url("/api/menus")).await;
    assert_eq!(anonymous.status, 401);
}

#[tokio::test]
async fn method_restricted_rule_overrides_the_any_method_rule() {
    let app = TestApp::new().await;
    let (_, admin_role, admin_token) = seed_member(&app, "admin", "ADMIN").await;
    let (_, editor_role, editor_token) = seed_member(&app, "editor", "EDITOR").await;

    let read_rule = app.seed_resource("/api/users", None).await;
    app.grant_resource(editor_role, read_rule.id).await;
    app.grant_resource(admin_role, read_rule.id).await;

    let write_rule = app.seed_resource("/api/users", Some("POST")).await;
    app.grant_resource(admin_role, write_rule.id).await;

    let editor_read = app
        .client
        .get_with_auth(&app.url("/api/users"), &editor_token)
        .await;
    assert_eq!(editor_read.status, 200);

    let body = serde_json::json!({"username": "newbie", "password": "secret123"});
    let editor_write = app
        .client
        .post_with_auth(&app.url("/api/users"), &editor_token, &body.to_string())
        .await;
    assert_eq!(editor_write.status, 403);

    let admin_write = app
        .client
        .post_with_auth(&app.url("/api/users"), &admin_token, &body.to_string())
        .await;
    assert_eq!(admin_write.status, 200);
}
