//! Error types for the logging pipeline

use std::fmt;

/// Configuration rejected at build time
///
/// Carries every violation found during validation, not just the first, so a
/// bad config can be fixed in one pass. Nothing is partially constructed when
/// this is returned.
#[derive(Debug)]
pub struct ConfigError {
    violations: Vec<String>,
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid configuration ({} violation{}): {}",
            self.violations.len(),
            if self.violations.len() == 1 { "" } else { "s" },
            self.violations.join("; ")
        )
    }
}

/// Delivery failure reported by a sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Retryable failure (I/O hiccup, timeout, rotation glitch)
    #[error("transient sink error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Unrecoverable failure; the sink is marked unhealthy until reset
    #[error("fatal sink error: {message}")]
    Fatal {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl SinkError {
    /// Create a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        SinkError::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient error wrapping an I/O source
    pub fn transient_io(message: impl Into<String>, source: std::io::Error) -> Self {
        SinkError::Transient {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        SinkError::Fatal {
            message: message.into(),
            source: None,
        }
    }

    /// Create a fatal error wrapping an I/O source
    pub fn fatal_io(message: impl Into<String>, source: std::io::Error) -> Self {
        SinkError::Fatal {
            message: message.into(),
            source: Some(source),
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transient { .. })
    }
}

/// A single record failed to serialize
///
/// The record is dropped for the affected sink only; the pipeline keeps
/// running and the failure is counted.
#[derive(Debug, thiserror::Error)]
#[error("format error ({formatter}): {message}")]
pub struct FormatError {
    pub formatter: String,
    pub message: String,
    #[source]
    pub source: Option<serde_json::Error>,
}

impl FormatError {
    pub fn new(formatter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            formatter: formatter.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn json(formatter: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            formatter: formatter.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}
