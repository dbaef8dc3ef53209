use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as sfmt, reload, EnvFilter, Layer, Registry};

/// Log verbosity exposed to applications
///
/// Mirrors the five levels applications are allowed to pick from; `Off`
/// silences the SDK entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// The `EnvFilter` directive for this level
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(Error::Config(format!("Invalid log level: {}", other))),
        }
    }
}

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// The log level to use
    pub level: LogLevel,
    /// Whether to enable JSON formatting
    pub json: bool,
    /// Whether to include file and line information
    pub file_info: bool,
    /// Whether to log spans
    pub log_spans: bool,
    /// Application name to include in logs
    pub app_name: String,
    /// Extra `EnvFilter` directives, e.g. `"streamrtc_signaling=debug"`
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Warn,
            json: false,
            file_info: false,
            log_spans: false,
            app_name: "streamrtc".to_string(),
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new(level: LogLevel, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Enable JSON formatting
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Enable file and line information in logs
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Enable span logging
    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }

    /// Add an `EnvFilter` directive on top of the base level
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }
}

/// Handle that changes the active log level after setup
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    directives: Vec<String>,
}

impl fmt::Debug for LogLevelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogLevelHandle")
            .field("directives", &self.directives)
            .finish()
    }
}

impl LogLevelHandle {
    /// Swap the active filter for one built from `level`
    pub fn set_level(&self, level: LogLevel) -> Result<()> {
        let filter = build_filter(level, &self.directives)?;
        self.handle
            .reload(filter)
            .map_err(|e| Error::Logging(format!("Failed to reload log filter: {}", e)))
    }
}

/// Build the filter for a level plus extra directives
pub(crate) fn build_filter(level: LogLevel, directives: &[String]) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new(level.as_directive());
    for directive in directives {
        let parsed = directive
            .parse()
            .map_err(|e| Error::Config(format!("Invalid log directive '{}': {}", directive, e)))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

/// Set up the logging system with the provided configuration
///
/// Installs a global subscriber; calling it a second time in the same
/// process returns [`Error::Logging`].
pub fn setup_logging(config: LoggingConfig) -> Result<LogLevelHandle> {
    let filter = build_filter(config.level, &config.directives)?;
    let (filter_layer, handle) = reload::Layer::new(filter);

    let span_events = if config.log_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = sfmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let fmt_layer = if config.json {
        fmt_layer.json().boxed()
    } else {
        fmt_layer.boxed()
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Logging(format!("Failed to install subscriber: {}", e)))?;

    log_welcome(&config.app_name, config.level);

    Ok(LogLevelHandle {
        handle,
        directives: config.directives,
    })
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> Result<LogLevel> {
    LogLevel::from_str(level)
}

fn log_welcome(app_name: &str, level: LogLevel) {
    tracing::info!("Logging for {} initialized at level {}", app_name, level);
}
