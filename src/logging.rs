use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

/// Writes `[timestamp][LEVEL] message` lines to stderr.
pub struct BridgeLogger {
    level: Level,
}

impl BridgeLogger {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Installs the logger for the rest of the process.
    pub fn init(level: Level) -> Result<(), SetLoggerError> {
        let logger: &'static BridgeLogger = Box::leak(Box::new(BridgeLogger::new(level)));
        log::set_logger(logger).map(|()| log::set_max_level(level.to_level_filter()))
    }
}

impl log::Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!(
                "{}",
                format_line(&Local::now(), record.level(), &record.args().to_string())
            );
        }
    }

    fn flush(&self) {}
}

pub fn format_line(timestamp: &DateTime<Local>, level: Level, message: &str) -> String {
    format!(
        "[{}][{}] {}",
        timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
        level,
        message
    )
}

/// Sets up logging for the process.
///
/// `RUST_LOG` hands control to env_logger; otherwise the bridge logger is
/// installed at `level`, with env_logger as the fallback if that fails.
pub fn init(level: Level) {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
    } else if BridgeLogger::init(level).is_err() {
        env_logger::builder()
            .filter_level(LevelFilter::Info)
            .init();
    }
    log::info!("Logging initialized");
}
