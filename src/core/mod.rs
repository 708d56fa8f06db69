//! Core pipeline types and traits

pub mod builder;
pub mod config;
pub mod error;
pub mod formatter;
pub mod level;
pub mod metrics;
pub mod overflow;
pub mod pipeline;
pub mod record;
pub mod redaction;
pub mod sink;

pub use builder::{build_pipeline, PipelineBuilder, SinkFactory, TransportFactory};
pub use config::{Config, Environment, HandlerConfig, HandlerKind, RemoteParams, RetryPolicy};
pub use error::{ConfigError, FormatError, SinkError};
pub use formatter::{Formatter, JsonFormatter, OutputFormat, TextFormatter};
pub use level::Level;
pub use metrics::PipelineMetrics;
pub use overflow::OverflowPolicy;
pub use pipeline::{Pipeline, DEFAULT_SHUTDOWN_TIMEOUT};
pub use record::{AttrValue, ErrorInfo, Record};
pub use redaction::{RedactionFilter, REDACTED};
pub use sink::Sink;
