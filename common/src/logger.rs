use chrono::Local;
use colored::Colorize;
use fern::Dispatch;
use log::LevelFilter;
use std::path::Path;

/// Routes log records to stdout (colored level tags) and an append-only
/// file. Owns log-directory creation; callers pass the configured path and
/// nothing else.
pub fn init_logger(log_level: &str, log_file_path: &str) {
    if let Some(dir) = Path::new(log_file_path).parent() {
        std::fs::create_dir_all(dir).expect("Failed to create log directory");
    }

    let level: LevelFilter = log_level.parse().unwrap_or(LevelFilter::Info);

    Dispatch::new()
        .format(|out, message, record| {
            let tag = match record.level() {
                log::Level::Error => "ERROR".red(),
                log::Level::Warn => "WARN".yellow(),
                log::Level::Info => "INFO".green(),
                log::Level::Debug => "DEBUG".cyan(),
                log::Level::Trace => "TRACE".normal(),
            };

            out.finish(format_args!(
                "{} {} {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                tag,
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .chain(fern::log_file(log_file_path).expect("Cannot open log file"))
        .apply()
        .expect("Failed to initialize logger");
}
