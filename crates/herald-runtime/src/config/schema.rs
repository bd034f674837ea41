//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use herald_framework::{GuildSettings, RoutingPolicy};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// How events are parsed and routed.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event intake limits.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatch settings. Everything but `policy` and `self_id` forms the
/// default [`GuildSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Which event shapes are accepted.
    pub policy: RoutingPolicy,

    /// Prefix for free-text commands.
    pub prefix: String,

    /// Match command labels regardless of case.
    pub ignore_case: bool,

    /// Drop messages written by bots.
    pub ignore_bots: bool,

    /// Accept a mention of the bot in place of the prefix.
    pub parse_mentions: bool,

    /// Labels that turn a message into a help request.
    pub help_labels: Vec<String>,

    /// The bot's own user id, used to recognise mentions.
    pub self_id: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let defaults = GuildSettings::default();
        Self {
            policy: RoutingPolicy::default(),
            prefix: defaults.prefix,
            ignore_case: defaults.ignore_case,
            ignore_bots: defaults.ignore_bots,
            parse_mentions: defaults.parse_mentions,
            help_labels: defaults.help_labels,
            self_id: None,
        }
    }
}

impl DispatchConfig {
    /// The settings every guild starts with.
    pub fn guild_settings(&self) -> GuildSettings {
        GuildSettings {
            prefix: self.prefix.clone(),
            ignore_case: self.ignore_case,
            ignore_bots: self.ignore_bots,
            parse_mentions: self.parse_mentions,
            help_labels: self.help_labels.clone(),
            ..GuildSettings::default()
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Output destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    Daily,
    #[default]
    Never,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    pub level: LogLevel,

    pub format: LogFormat,

    pub output: LogOutput,

    /// Log file, required for file output.
    pub file_path: Option<PathBuf>,

    pub rotation: LogRotation,

    /// Rotated files to keep.
    pub max_files: usize,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include source file and line.
    pub file_location: bool,

    pub span_events: SpanEventConfig,

    /// Per-module levels, e.g. `herald_framework = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: 5,
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Event intake limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Events dispatched concurrently; further events wait for a slot.
    pub max_in_flight: usize,

    /// How long shutdown waits for in-flight events.
    pub shutdown_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 64,
            shutdown_timeout_secs: 10,
        }
    }
}

impl RuntimeConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
