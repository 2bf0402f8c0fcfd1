use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

impl From<&Config> for LogConfig {
    fn from(config: &Config) -> Self {
        Self {
            log_level: config.log_level.clone(),
            enable_file_logs: config.enable_file_logs,
            log_dir: config.log_dir.clone(),
        }
    }
}

/// Install the global subscriber. Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    let registry = Registry::default().with(env_filter).with(stderr_layer);

    if config.enable_file_logs {
        let file_appender = match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("sightwords")
            .filename_suffix("log")
            .max_log_files(14)
            .build(&config.log_dir)
        {
            Ok(appender) => appender,
            Err(e) => {
                eprintln!("file logging disabled, cannot create appender in {}: {e}", config.log_dir);
                let _ = registry.try_init();
                return;
            }
        };
        let file_layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .json();
        // A subscriber already installed (tests, embedding hosts) is not an error.
        let _ = registry.with(file_layer).try_init();
    } else {
        let _ = registry.try_init();
    }
}
