use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FILE_PREFIX: &str = "mastery-backend";
const MAX_LOG_FILES: usize = 30;

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

/// Installs the global subscriber: human-readable stdout, plus daily-rolling
/// JSON files when enabled. Safe to call more than once; repeat calls are
/// no-ops so tests can initialize freely.
pub fn init_tracing(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let file_layer = config
        .enable_file_logs
        .then(|| json_file_layer(&config.log_dir));

    let result = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init();

    if let Err(e) = result {
        // A second init in-process is fine; a broken first init is not.
        if !e.to_string().contains("already been set") {
            panic!("Failed to initialize tracing: {e}");
        }
    }
}

fn json_file_layer<S>(log_dir: &str) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .expect("Failed to create rolling file appender");

    fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .json()
        .boxed()
}
