use serde::Deserialize;

/// Policy applied when a request path matches no configured resource rule.
///
/// The permission index only knows about URL patterns that administrators
/// have registered. Everything else falls under this policy, which must be
/// an explicit choice rather than an accident of lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnmatchedPolicy {
    /// Fail closed: no rule means no access (default).
    Deny,
    /// Any authenticated principal passes; anonymous requests are rejected.
    RequireAuthenticated,
}

impl UnmatchedPolicy {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "authenticated" | "require_authenticated" => UnmatchedPolicy::RequireAuthenticated,
            _ => UnmatchedPolicy::Deny,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL (e.g. sqlite://palisade.db, postgres://...)
    pub database_url: String,

    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT token expiry in hours (default: 24)
    pub jwt_expiry_hours: u64,

    /// Server host (default: 127.0.0.1)
    pub server_host: String,

    /// Server port (default: 3000)
    pub server_port: u16,

    /// Environment: development, production, test
    pub environment: String,

    /// Path patterns that bypass both authentication and the access
    /// decision entirely (login endpoint, health checks, docs).
    pub public_urls: Vec<String>,

    /// What happens when a path matches no configured rule.
    pub unmatched_policy: UnmatchedPolicy,
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://palisade.db?mode=rwc".to_string()),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "palisade-dev-secret-change-me".to_string()),
            jwt_expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            public_urls: std::env::var("PUBLIC_URLS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| Self::default_public_urls()),
            unmatched_policy: std::env::var("UNMATCHED_POLICY")
                .map(|v| UnmatchedPolicy::parse(&v))
                .unwrap_or(UnmatchedPolicy::Deny),
        })
    }

    /// Built-in public list: login, health check, API docs.
    pub fn default_public_urls() -> Vec<String> {
        vec![
            "/api/auth/login".to_string(),
            "/health".to_string(),
            "/api-docs/**".to_string(),
        ]
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
