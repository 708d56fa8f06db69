//! Validated configuration consumed by the pipeline builder
//!
//! These types are what an external loader (YAML/JSON file, environment
//! variables, a literal in tests) deserializes into. Parsing lives outside
//! the crate; validation lives in `PipelineBuilder::build`.

use super::formatter::OutputFormat;
use super::level::Level;
use super::overflow::OverflowPolicy;
use crate::sinks::rotating::RotationPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Deployment environment tag
///
/// Dev enables colored console output; test and prod keep plain lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Test,
    #[default]
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: '{}'", s)),
        }
    }
}

/// Bounded-retry settings for transient sink errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    #[serde(default = "RetryPolicy::default_max_retries")]
    pub max_retries: u32,
    /// Base delay; attempt n sleeps `backoff * 2^(n-1)`
    #[serde(default = "RetryPolicy::default_backoff")]
    pub backoff: Duration,
}

impl RetryPolicy {
    fn default_max_retries() -> u32 {
        3
    }

    fn default_backoff() -> Duration {
        Duration::from_millis(100)
    }

    /// Delay before retry attempt `attempt` (1-based)
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * 2_u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            backoff: Self::default_backoff(),
        }
    }
}

/// Parameters handed to the remote transport factory at build time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParams {
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "RemoteParams::default_timeout")]
    pub timeout: Duration,
}

impl RemoteParams {
    fn default_timeout() -> Duration {
        Duration::from_secs(5)
    }
}

/// Destination kind plus its kind-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HandlerKind {
    Console {
        /// Records at or above this level go to stderr
        #[serde(default = "HandlerKind::default_stderr_from")]
        stderr_from: Level,
    },
    File {
        path: PathBuf,
        #[serde(default)]
        rotation: RotationPolicy,
    },
    Remote {
        #[serde(flatten)]
        params: RemoteParams,
    },
    Custom {
        name: String,
    },
}

impl HandlerKind {
    fn default_stderr_from() -> Level {
        Level::Error
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            HandlerKind::Console { .. } => "console",
            HandlerKind::File { .. } => "file",
            HandlerKind::Remote { .. } => "remote",
            HandlerKind::Custom { .. } => "custom",
        }
    }
}

/// One destination declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(flatten)]
    pub kind: HandlerKind,
    /// Per-handler minimum level; defaults to the global minimum
    #[serde(default)]
    pub level: Option<Level>,
    /// Per-handler format override; defaults to the global format
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

impl HandlerConfig {
    pub fn new(kind: HandlerKind) -> Self {
        Self {
            kind,
            level: None,
            format: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// The validated configuration object the builder consumes
///
/// # Example
///
/// ```
/// use logpipe::{Config, HandlerConfig, HandlerKind, Level};
///
/// let config = Config::new()
///     .with_min_level(Level::Debug)
///     .with_redact_fields(vec!["password".to_string()])
///     .with_handler(HandlerConfig::new(HandlerKind::Console {
///         stderr_from: Level::Error,
///     }));
/// assert_eq!(config.handlers.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub env: Environment,
    #[serde(default)]
    pub min_level: Level,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
    #[serde(default)]
    pub redact_fields: Vec<String>,
    /// Bounded per-sink queue capacity
    #[serde(default = "Config::default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Config {
    fn default_queue_capacity() -> usize {
        1024
    }

    pub fn new() -> Self {
        Self {
            env: Environment::default(),
            min_level: Level::default(),
            format: OutputFormat::default(),
            handlers: Vec::new(),
            redact_fields: Vec::new(),
            queue_capacity: Self::default_queue_capacity(),
            overflow: OverflowPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_handler(mut self, handler: HandlerConfig) -> Self {
        self.handlers.push(handler);
        self
    }

    #[must_use]
    pub fn with_redact_fields(mut self, fields: Vec<String>) -> Self {
        self.redact_fields = fields;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
