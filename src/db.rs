use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};
use std::time::Duration;

use crate::config::Config;

/// Initialize the database connection from config.
///
/// A bounded acquire timeout keeps a stalled store from hanging the
/// authorization path; timeouts surface as errors (5xx), never as a
/// false authenticated or authorized result.
pub async fn connect(config: &Config) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opts = ConnectOptions::new(&config.database_url);
    // An in-memory SQLite database exists per connection; more than one
    // connection in the pool would split the data.
    let (max_conns, min_conns) = if config.database_url.contains(":memory:") {
        (1, 1)
    } else {
        (100, 5)
    };
    opts.max_connections(max_conns)
        .min_connections(min_conns)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .sqlx_logging(config.is_dev());

    SeaDatabase::connect(opts).await
}
