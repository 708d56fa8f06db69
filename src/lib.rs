//! # Logpipe
//!
//! A structured-logging pipeline: records flow through a redaction filter
//! and fan out to independently-queued sinks (console, rotating files,
//! remote collectors).
//!
//! ## Features
//!
//! - **Field Redaction**: mask sensitive attributes by name or dotted path
//! - **Multiple Sinks**: console, rotating file, remote, and custom sinks
//! - **Isolated Delivery**: one sink's failure never affects the others
//! - **Thread Safe**: emit from any number of producers without blocking
//!
//! ## Quick start
//!
//! ```no_run
//! use logpipe::{build_pipeline, Config, HandlerConfig, HandlerKind, Level};
//!
//! let config = Config::new()
//!     .with_min_level(Level::Info)
//!     .with_redact_fields(vec!["password".to_string()])
//!     .with_handler(HandlerConfig::new(HandlerKind::Console {
//!         stderr_from: Level::Error,
//!     }));
//!
//! let mut pipeline = build_pipeline(config).expect("valid config");
//! pipeline.info("app.main", "service started");
//! pipeline.shutdown(std::time::Duration::from_secs(5));
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        build_pipeline, AttrValue, Config, ConfigError, Environment, ErrorInfo, FormatError,
        Formatter, HandlerConfig, HandlerKind, JsonFormatter, Level, OutputFormat, OverflowPolicy,
        Pipeline, PipelineBuilder, PipelineMetrics, Record, RedactionFilter, RemoteParams,
        RetryPolicy, Sink, SinkError, TextFormatter, DEFAULT_SHUTDOWN_TIMEOUT, REDACTED,
    };
    pub use crate::sinks::{ConsoleSink, RemoteSink, RotatingFileSink, RotationPolicy, RotationStrategy, Transport};
}

pub use crate::core::{
    build_pipeline, AttrValue, Config, ConfigError, Environment, ErrorInfo, FormatError,
    Formatter, HandlerConfig, HandlerKind, JsonFormatter, Level, OutputFormat, OverflowPolicy,
    Pipeline, PipelineBuilder, PipelineMetrics, Record, RedactionFilter, RemoteParams,
    RetryPolicy, Sink, SinkError, TextFormatter, DEFAULT_SHUTDOWN_TIMEOUT, REDACTED,
};
pub use crate::sinks::{
    ConsoleSink, RemoteSink, RotatingFileSink, RotationPolicy, RotationStrategy, Transport,
};
