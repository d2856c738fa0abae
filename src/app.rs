use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::auth::middleware::{authenticate, authorize};
use crate::auth::permissions::{PathPattern, PermissionSource};
use crate::config::Config;
use crate::controllers::{self, AppState};
use crate::migrations::Migrator;
use crate::openapi::ApiDoc;
use crate::response::ApiResponse;

/// The Palisade application: configuration, database handle, and the
/// shared permission index.
pub struct App {
    pub config: Config,
    pub db: DatabaseConnection,
    pub permissions: PermissionSource,
}

impl App {
    /// Create an application from environment configuration.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::from_env()?;
        Self::with_config(config).await
    }

    /// Create an application with a given config. Runs pending migrations
    /// and performs the initial permission index load.
    pub async fn with_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = crate::db::connect(&config).await?;

        tracing::info!("Running pending database migrations...");
        Migrator::up(&db, None).await?;
        tracing::info!("Migrations complete.");

        let permissions = PermissionSource::new();
        let rules = permissions.reload(&db).await?;
        tracing::info!(rules, "initial permission index loaded");

        Ok(App {
            config,
            db,
            permissions,
        })
    }

    /// Build the router with the full middleware chain.
    ///
    /// Request order is CORS, then authentication, then the access
    /// decision, then the handler; the layers are added innermost-first
    /// because the last `.layer()` call wraps all the earlier ones.
    pub fn router(&self) -> Router {
        let config = Arc::new(self.config.clone());
        let public_urls = Arc::new(
            self.config
                .public_urls
                .iter()
                .map(|p| PathPattern::parse(p))
                .collect::<Vec<_>>(),
        );

        let state = AppState {
            db: self.db.clone(),
            config: config.clone(),
            permissions: self.permissions.clone(),
            public_urls,
        };

        let mut router = Router::new()
            .route("/health", get(health))
            .nest("/api/auth", controllers::auth::routes())
            .nest("/api/users", controllers::users::routes())
            .nest("/api/roles", controllers::roles::routes())
            .nest("/api/resources", controllers::resources::routes())
            .nest("/api/menus", controllers::menus::routes())
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                authorize,
            ))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                authenticate,
            ))
            .with_state(state)
            .merge(Scalar::with_url("/api-docs", ApiDoc::openapi()))
            .layer(CorsLayer::permissive());

        if self.config.is_dev() {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server until ctrl-c.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.server_addr();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Palisade listening on http://{}", addr);
        tracing::info!("API docs at http://{}/api-docs", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to install CTRL+C signal handler");
        return;
    }
    tracing::info!("Shutting down...");
}

async fn health() -> ApiResponse<&'static str> {
    ApiResponse::success("ok")
}
