//! Logging configuration.

use crate::models::LogLevel;
use crate::pipeline::render::RenderMode;
use crate::pipeline::sink::OverflowPolicy;
use std::env;
use std::path::PathBuf;

/// Deployment environment; selects the renderer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// JSON lines in production, human-readable lines in development.
    pub fn render_mode(&self) -> RenderMode {
        match self {
            Environment::Development => RenderMode::Human,
            Environment::Production => RenderMode::Json,
        }
    }
}

/// Configuration for the log pipeline
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Application name stamped onto every event by the app-context stage
    pub app_name: String,
    /// Deployment environment (selects JSON vs. human rendering)
    pub environment: Environment,
    /// Minimum level an event needs to be processed at all
    pub log_level: LogLevel,
    /// Bounded sink queue capacity
    pub queue_capacity: usize,
    /// What enqueue does when the queue is full
    pub overflow_policy: OverflowPolicy,
    /// Whether to write a rotating log file in addition to the console
    pub file_logging_enabled: bool,
    /// Directory holding the rotating log file
    pub log_dir: PathBuf,
    /// Rotation threshold for the log file
    pub rotation_max_bytes: u64,
    /// Number of rotated backups kept
    pub rotation_backup_count: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: "tweight-core".to_string(),
            environment: Environment::Development,
            log_level: LogLevel::Info,
            queue_capacity: 1000,
            overflow_policy: OverflowPolicy::Block,
            file_logging_enabled: false,
            log_dir: PathBuf::from("logs"),
            rotation_max_bytes: 10 * 1024 * 1024, // 10 MiB
            rotation_backup_count: 5,
        }
    }
}

impl LoggingConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let app_name = env::var("APP_NAME").unwrap_or(defaults.app_name);

        let environment = match env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            // Unknown values fall back to development for safety.
            _ => Environment::Development,
        };

        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| LogLevel::parse(&v))
            .unwrap_or(defaults.log_level);

        let queue_capacity = env::var("LOG_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&c| c > 0)
            .unwrap_or(defaults.queue_capacity);

        let overflow_policy = env::var("LOG_OVERFLOW_POLICY")
            .ok()
            .and_then(|v| OverflowPolicy::parse(&v))
            .unwrap_or(defaults.overflow_policy);

        let file_logging_enabled = env::var("LOG_FILE_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(defaults.file_logging_enabled);

        let log_dir = env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);

        let rotation_max_bytes = env::var("LOG_ROTATION_MAX_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rotation_max_bytes);

        let rotation_backup_count = env::var("LOG_ROTATION_BACKUP_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rotation_backup_count);

        Self {
            app_name,
            environment,
            log_level,
            queue_capacity,
            overflow_policy,
            file_logging_enabled,
            log_dir,
            rotation_max_bytes,
            rotation_backup_count,
        }
    }
}
