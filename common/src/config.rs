use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::env;

/// Runtime configuration for the attendance system, loaded once from the
/// environment. Policy knobs (grace period, end tolerance, early access,
/// tick interval) default to the values the scanners were rolled out with.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub database_path: String,
    /// How long `db::connect` may keep retrying before giving up.
    pub db_connect_timeout_seconds: u64,
    /// Minutes after session start during which a scan still counts as present.
    pub grace_minutes: u32,
    /// Minutes after session end during which late scans are still accepted.
    pub end_tolerance_minutes: u32,
    /// Minutes before session start at which a session may go live.
    pub early_access_minutes: i64,
    /// Interval of the session lifecycle tick.
    pub lifecycle_tick_seconds: u64,
}

static CONFIG: OnceCell<AppConfig> = OnceCell::new();

impl AppConfig {
    pub fn init() -> &'static Self {
        dotenvy::dotenv().ok();

        CONFIG.get_or_init(|| {
            let project_name = env::var("PROJECT_NAME").unwrap_or_else(|_| "rollcall".into());
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
            let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/rollcall.log".into());
            let database_path = env::var("DATABASE_PATH").expect("DATABASE_PATH must be set");

            AppConfig {
                project_name,
                log_level,
                log_file,
                database_path,
                db_connect_timeout_seconds: env_parse("DB_CONNECT_TIMEOUT_SECONDS", 10),
                grace_minutes: env_parse("GRACE_MINUTES", 10),
                end_tolerance_minutes: env_parse("END_TOLERANCE_MINUTES", 5),
                early_access_minutes: env_parse("EARLY_ACCESS_MINUTES", 15),
                lifecycle_tick_seconds: env_parse("LIFECYCLE_TICK_SECONDS", 30),
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("AppConfig not initialized")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
