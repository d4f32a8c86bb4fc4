//! Long-running host for the session lifecycle manager.

use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use common::logger;
use services::events::BroadcastNotifier;
use services::session_lifecycle_service::SessionLifecycleManager;

#[tokio::main]
async fn main() {
    let config = AppConfig::init();
    logger::init_logger(&config.log_level, &config.log_file);

    let db = match db::connect().await {
        Ok(db) => db,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };

    // The realtime transport subscribes on its side; the lifecycle loop
    // itself never blocks on delivery.
    let notifier = Arc::new(BroadcastNotifier::new(64));

    let manager = SessionLifecycleManager::new(
        db,
        notifier,
        Duration::from_secs(config.lifecycle_tick_seconds),
        config.early_access_minutes,
    );
    let handle = manager.start();

    log::info!(
        "{} scheduler running (tick every {}s, early access {}m)",
        config.project_name,
        config.lifecycle_tick_seconds,
        config.early_access_minutes
    );

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    log::info!("shutting down");
    manager.stop();
    let _ = handle.await;
}
