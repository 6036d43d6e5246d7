//! Log records and an in-memory log buffer.

use crate::ConfigParams;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level. Higher levels are more verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogLevel {
    /// Nothing is logged
    None = 0,
    /// Fatal errors that stop the process
    Fatal = 1,
    /// Errors
    Error = 2,
    /// Warnings
    Warn = 3,
    /// Informational messages
    Info = 4,
    /// Debug messages
    Debug = 5,
    /// Trace messages (most verbose)
    Trace = 6,
}

impl LogLevel {
    /// Get level from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" | "0" => Some(LogLevel::None),
            "fatal" | "1" => Some(LogLevel::Fatal),
            "error" | "2" => Some(LogLevel::Error),
            "warn" | "warning" | "3" => Some(LogLevel::Warn),
            "info" | "4" => Some(LogLevel::Info),
            "debug" | "5" => Some(LogLevel::Debug),
            "trace" | "6" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::None => "NONE",
            LogLevel::Fatal => "FATAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Log Messages
// ============================================================================

/// Error attached to a log message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescription {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl ErrorDescription {
    /// Describe an error, using its source chain as the trace.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        Self {
            message: err.to_string(),
            stack_trace: if chain.is_empty() {
                None
            } else {
                Some(chain.join(" <- "))
            },
        }
    }
}

/// A buffered log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub time: DateTime<Utc>,
    pub source: Option<String>,
    pub level: LogLevel,
    pub correlation_id: Option<String>,
    pub error: Option<ErrorDescription>,
    pub message: String,
}

// ============================================================================
// Cached Logger
// ============================================================================

/// Level-filtered, bounded in-memory log buffer.
///
/// Writers append; a single flusher takes the whole buffer with
/// [`CachedLogger::drain`].
pub struct CachedLogger {
    level: RwLock<LogLevel>,
    source: RwLock<Option<String>>,
    max_cache_size: RwLock<usize>,
    cache: Mutex<Vec<LogMessage>>,
}

impl Default for CachedLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl CachedLogger {
    /// Default buffer bound.
    pub const DEFAULT_MAX_CACHE_SIZE: usize = 100;

    /// Create a logger at `Info` level.
    pub fn new() -> Self {
        Self {
            level: RwLock::new(LogLevel::Info),
            source: RwLock::new(None),
            max_cache_size: RwLock::new(Self::DEFAULT_MAX_CACHE_SIZE),
            cache: Mutex::new(Vec::new()),
        }
    }

    /// Read `level`, `source` and `options.max_cache_size`.
    pub fn configure(&self, config: &ConfigParams) {
        if let Some(level) = config.get("level").and_then(LogLevel::from_str) {
            *self.level.write() = level;
        }
        if let Some(source) = config.get_as_nullable_string("source") {
            *self.source.write() = Some(source);
        }
        let max = config.get_as_integer_with_default(
            "options.max_cache_size",
            *self.max_cache_size.read() as i64,
        );
        *self.max_cache_size.write() = max.max(1) as usize;
    }

    /// Current level.
    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    /// Set the level.
    pub fn set_level(&self, level: LogLevel) {
        *self.level.write() = level;
    }

    /// Message source.
    pub fn source(&self) -> Option<String> {
        self.source.read().clone()
    }

    /// Set the source if none is configured.
    pub fn default_source(&self, source: &str) {
        let mut current = self.source.write();
        if current.is_none() {
            *current = Some(source.to_string());
        }
    }

    /// Buffer a message if its level passes the filter.
    ///
    /// When the buffer is full the oldest message is dropped.
    pub fn write(
        &self,
        level: LogLevel,
        correlation_id: Option<&str>,
        error: Option<ErrorDescription>,
        message: impl Into<String>,
    ) {
        if level == LogLevel::None || self.level() < level {
            return;
        }

        let record = LogMessage {
            time: Utc::now(),
            source: self.source(),
            level,
            correlation_id: correlation_id.map(String::from),
            error,
            message: message.into(),
        };

        let max = *self.max_cache_size.read();
        let mut cache = self.cache.lock();
        cache.push(record);
        if cache.len() > max {
            let excess = cache.len() - max;
            cache.drain(..excess);
        }
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Take all buffered messages, leaving the buffer empty.
    pub fn drain(&self) -> Vec<LogMessage> {
        std::mem::take(&mut *self.cache.lock())
    }

    /// Drop all buffered messages.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}
