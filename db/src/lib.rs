pub mod models;
pub mod test_utils;

use sea_orm::{Database, DatabaseConnection, DbErr};
use std::path::Path;
use std::time::{Duration, Instant};

/// Raised when the store cannot be reached within the configured window.
/// Callers are expected to fail fast on this rather than hang.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("database unavailable after {waited:?}: {source}")]
    Unavailable {
        waited: Duration,
        #[source]
        source: DbErr,
    },
}

/// Connects using `DATABASE_PATH` from the application config.
pub async fn connect() -> Result<DatabaseConnection, ConnectError> {
    let config = common::config::AppConfig::get();
    connect_to(
        &config.database_path,
        Duration::from_secs(config.db_connect_timeout_seconds),
    )
    .await
}

/// Connects to `path_or_url`, retrying until `timeout` has elapsed.
///
/// If it's already a DSN, use it as-is; otherwise treat it as a SQLite file
/// path (SQLite won't create intermediate dirs, so we do).
pub async fn connect_to(
    path_or_url: &str,
    timeout: Duration,
) -> Result<DatabaseConnection, ConnectError> {
    let url = if path_or_url.starts_with("sqlite:")
        || path_or_url.starts_with("postgres://")
        || path_or_url.starts_with("mysql://")
    {
        path_or_url.to_owned()
    } else {
        if let Some(parent) = Path::new(path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    let started = Instant::now();
    loop {
        match Database::connect(&url).await {
            Ok(db) => return Ok(db),
            Err(err) => {
                if started.elapsed() >= timeout {
                    return Err(ConnectError::Unavailable {
                        waited: started.elapsed(),
                        source: err,
                    });
                }
                log::warn!("database connect failed, retrying: {err}");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
}
