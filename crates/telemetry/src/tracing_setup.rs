//! Structured logging for the provisioner.
//!
//! Everything is written to stderr; stdout carries command output only.
//! Controlled by `RUST_LOG` (filter), `LOG_JSON` (JSON lines) and
//! `LOG_SPANS` (span open/close events, useful to time provisioning steps).

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines
    Text,
    /// One JSON object per line with the current span
    Json,
}

/// Tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "provisioning_engine=debug")
    pub filter: String,
    pub format: LogFormat,
    /// Emit an event when each span opens and closes
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Text,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Read `RUST_LOG`, `LOG_JSON` and `LOG_SPANS`.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("RUST_LOG").ok(),
            std::env::var("LOG_JSON").ok(),
            std::env::var("LOG_SPANS").ok(),
        )
    }

    fn from_vars(filter: Option<String>, json: Option<String>, spans: Option<String>) -> Self {
        let filter = filter
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = if flag(json.as_deref()) {
            LogFormat::Json
        } else {
            LogFormat::Text
        };

        Self {
            filter,
            format,
            span_events: flag(spans.as_deref()),
        }
    }
}

fn flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Install the global subscriber. Returns `false` if one was already installed.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events);
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(layer.json().with_current_span(true).with_target(true))
            .try_init(),
        LogFormat::Text => registry.with(layer.compact().with_target(false)).try_init(),
    }
    .is_ok();

    if installed {
        tracing::debug!(filter = %config.filter, format = ?config.format, "Tracing initialized");
    }
    installed
}

/// Initialize tracing from environment variables.
pub fn init_tracing_from_env() {
    init_tracing(&TracingConfig::from_env());
}
