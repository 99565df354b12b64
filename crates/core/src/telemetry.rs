// Logging setup
//
// Batch jobs log progress and per-item failures through `tracing`. This module
// installs the subscriber: an EnvFilter plus a fmt layer writing to stderr, so
// stdout stays free for the run summary.

use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
};

/// Log line encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a format name; anything unknown falls back to text
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directive (e.g. "info", "refminer_core=debug")
    pub log_filter: Option<String>,
    /// Output encoding
    pub format: LogFormat,
    /// Include the event target (module path) in each line
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: None,
            format: LogFormat::Text,
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// - `RUST_LOG` or `LOG_LEVEL`: log filter
    /// - `REFMINER_LOG_FORMAT`: `text` (default) or `json`
    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
            format: std::env::var("REFMINER_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            with_target: true,
        }
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Filter to install; invalid or missing directives fall back to `info`
    pub fn env_filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Install the global subscriber.
///
/// Fails only if a global subscriber is already set.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TryInitError> {
    let filter = config.env_filter();

    let layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(config.with_target)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(config.with_target)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init()?;

    tracing::debug!(format = ?config.format, "Logging initialized");
    Ok(())
}
