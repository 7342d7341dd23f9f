//! Job progress logging.
//!
//! Progress lines go through `tracing` so the CLI, a log collector and
//! tests all see the same events. The `log_*` helpers keep call sites
//! short and give every message a [`LogLevel`] and an indent level.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ConfigError, ConfigResult};

/// Severity of a progress message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single progress message.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth, for sub-steps of a job.
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Message with its indent and level marker applied.
    pub fn render(&self) -> String {
        let marker = match self.level {
            LogLevel::Info => "",
            LogLevel::Success => "✓ ",
            LogLevel::Warning => "! ",
            LogLevel::Error => "✗ ",
        };
        format!("{}{}{}", "  ".repeat(self.indent as usize), marker, self.message)
    }

    /// Emit as a `tracing` event.
    pub fn emit(&self) {
        let line = self.render();
        match self.level {
            LogLevel::Info => tracing::info!("{line}"),
            LogLevel::Success => tracing::info!(outcome = "success", "{line}"),
            LogLevel::Warning => tracing::warn!("{line}"),
            LogLevel::Error => tracing::error!("{line}"),
        }
    }
}

pub fn log_info(msg: impl Into<String>) {
    LogEntry::info(msg).emit();
}

pub fn log_success(msg: impl Into<String>) {
    LogEntry::success(msg).emit();
}

pub fn log_warning(msg: impl Into<String>) {
    LogEntry::warning(msg).emit();
}

pub fn log_error(msg: impl Into<String>) {
    LogEntry::error(msg).emit();
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LogEntry::info(msg).with_indent(indent).emit();
}

// =============================================================================
// Subscriber
// =============================================================================

/// Output format of the fmt subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::Invalid {
                key: "log format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `level` is an `EnvFilter` directive used when `RUST_LOG` is unset.
/// Installing twice is a no-op.
pub fn init_logging(level: &str, format: LogFormat) -> ConfigResult<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives),
        Err(_) => EnvFilter::try_new(level),
    }
    .map_err(|_| ConfigError::Invalid {
        key: "log level".to_string(),
        value: level.to_string(),
    })?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}
