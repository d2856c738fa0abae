//! Integration test harness.
//!
//! [`TestApp`] boots a full Palisade server with an in-memory SQLite
//! database on a random port and exposes seeding helpers, so tests
//! exercise the real middleware chain over HTTP.

use std::net::SocketAddr;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tokio::net::TcpListener;

use crate::auth::hash_password;
use crate::config::{Config, UnmatchedPolicy};
use crate::models::{menu, resource, role, role_menu, role_resource, user, user_role};

/// A test application wrapping a running server.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn login_works() {
///     let app = TestApp::new().await;
///     app.seed_user("alice", "secret123", true).await;
///     let token = app.login("alice", "secret123").await;
///     assert!(!token.is_empty());
/// }
/// ```
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: TestClient,
    pub db: DatabaseConnection,
    pub config: Config,
    pub permissions: crate::auth::PermissionSource,
}

impl TestApp {
    /// Boot a test app with an in-memory database and the fail-closed
    /// unmatched policy.
    pub async fn new() -> Self {
        Self::with_config(Self::test_config()).await
    }

    /// Boot a test app where unmatched paths only require authentication.
    pub async fn new_require_authenticated() -> Self {
        let mut config = Self::test_config();
        config.unmatched_policy = UnmatchedPolicy::RequireAuthenticated;
        Self::with_config(config).await
    }

    fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-key-for-testing".to_string(),
            jwt_expiry_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            environment: "test".to_string(),
            public_urls: Config::default_public_urls(),
            unmatched_policy: UnmatchedPolicy::Deny,
        }
    }

    /// Boot a test app with a custom config.
    pub async fn with_config(config: Config) -> Self {
        let app = crate::App::with_config(config.clone())
            .await
            .expect("Failed to create test app");

        let router = app.router();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = TestClient::new(addr);

        TestApp {
            addr,
            client,
            db: app.db,
            config: app.config,
            permissions: app.permissions,
        }
    }

    /// Full URL for a path on the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    // ── Seeding helpers (write straight to the store) ──

    /// Insert a user with a hashed password.
    pub async fn seed_user(&self, username: &str, password: &str, enabled: bool) -> user::Model {
        let now = Utc::now().naive_utc();
        user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(hash_password(password).expect("hashing failed")),
            icon: Set(None),
            enabled: Set(enabled),
            del: Set(false),
            create_time: Set(now),
            login_time: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to seed user")
    }

    /// Insert an enabled role.
    pub async fn seed_role(&self, name: &str) -> role::Model {
        role::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            status: Set(true),
            del: Set(false),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to seed role")
    }

    /// Link a user to a role.
    pub async fn grant_role(&self, user_id: i32, role_id: i32) {
        user_role::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role_id),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to grant role");
    }

    /// Insert a protected resource rule.
    pub async fn seed_resource(&self, pattern: &str, method: Option<&str>) -> resource::Model {
        resource::ActiveModel {
            name: Set(pattern.to_string()),
            pattern: Set(pattern.to_string()),
            method: Set(method.map(|m| m.to_string())),
            description: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to seed resource")
    }

    /// Link a role to a resource and rebuild the permission index.
    pub async fn grant_resource(&self, role_id: i32, resource_id: i32) {
        role_resource::ActiveModel {
            role_id: Set(role_id),
            resource_id: Set(resource_id),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to grant resource");
        self.reload_permissions().await;
    }

    /// Insert a menu node.
    pub async fn seed_menu(&self, parent_id: i32, name: &str, sort: i32) -> menu::Model {
        menu::ActiveModel {
            parent_id: Set(parent_id),
            title: Set(name.to_string()),
            name: Set(name.to_string()),
            icon: Set(None),
            component: Set("Layout".to_string()),
            path: Set(format!("/{}", name)),
            hidden: Set(false),
            sort: Set(sort),
            create_time: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to seed menu")
    }

    /// Link a role to a menu.
    pub async fn grant_menu(&self, role_id: i32, menu_id: i32) {
        role_menu::ActiveModel {
            role_id: Set(role_id),
            menu_id: Set(menu_id),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to grant menu");
    }

    /// Rebuild the permission index from the current store contents.
    pub async fn reload_permissions(&self) {
        self.permissions
            .reload(&self.db)
            .await
            .expect("Failed to reload permissions");
    }

    /// Log in over HTTP and return the token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let res = self
            .client
            .post(&self.url("/api/auth/login"), &body.to_string())
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.body);

        res.data()["token"]
            .as_str()
            .expect("no token in login response")
            .to_string()
    }
}

/// A simple HTTP test client with helper methods.
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
}

impl TestClient {
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
        }
    }

    pub async fn get(&self, url: &str) -> TestResponse {
        let res = self.inner.get(url).send().await.expect("GET request failed");
        TestResponse::from_response(res).await
    }

    pub async fn get_with_auth(&self, url: &str, token: &str) -> TestResponse {
        let res = self
            .inner
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("GET request failed");
        TestResponse::from_response(res).await
    }

    /// Send a GET with a raw Authorization header value (no Bearer prefix
    /// added).
    pub async fn get_with_header(&self, url: &str, authorization: &str) -> TestResponse {
        let res = self
            .inner
            .get(url)
            .header("Authorization", authorization)
            .send()
            .await
            .expect("GET request failed");
        TestResponse::from_response(res).await
    }

    pub async fn options(&self, url: &str) -> TestResponse {
        let res = self
            .inner
            .request(reqwest::Method::OPTIONS, url)
            .send()
            .await
            .expect("OPTIONS request failed");
        TestResponse::from_response(res).await
    }

    pub async fn post(&self, url: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed");
        TestResponse::from_response(res).await
    }

    pub async fn post_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed");
        TestResponse::from_response(res).await
    }

    pub async fn put_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .put(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .body(body.to_string())
            .send()
            .await
            .expect("PUT request failed");
        TestResponse::from_response(res).await
    }

    pub async fn patch_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .patch(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .body(body.to_string())
            .send()
            .await
            .expect("PATCH request failed");
        TestResponse::from_response(res).await
    }

    pub async fn delete_with_auth(&self, url: &str, token: &str) -> TestResponse {
        let res = self
            .inner
            .delete(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("DELETE request failed");
        TestResponse::from_response(res).await
    }
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        TestResponse { status, body }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    pub fn is_success(&self) -> bool {
        self.json()["success"].as_bool().unwrap_or(false)
    }

    pub fn data(&self) -> serde_json::Value {
        self.json()["data"].clone()
    }

    pub fn error(&self) -> serde_json::Value {
        self.json()["error"].clone()
    }

    /// The `error.code` field, empty string when absent.
    pub fn error_code(&self) -> String {
        self.json()["error"]["code"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}
