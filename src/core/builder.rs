//! Pipeline construction from a validated configuration object

use super::config::{Config, Environment, HandlerConfig, HandlerKind, RemoteParams};
use super::error::{ConfigError, SinkError};
use super::formatter::{Formatter, JsonFormatter, OutputFormat, TextFormatter};
use super::metrics::PipelineMetrics;
use super::pipeline::{spawn_worker, Pipeline, SinkSlot};
use super::redaction::RedactionFilter;
use super::sink::Sink;
use crate::sinks::console::ConsoleSink;
use crate::sinks::remote::{RemoteSink, Transport};
use crate::sinks::rotating::{RotatingFileSink, RotationStrategy};
use crossbeam_channel::bounded;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Factory producing a custom sink from its handler declaration
pub type SinkFactory = Box<dyn Fn(&HandlerConfig) -> Result<Box<dyn Sink>, SinkError>>;

/// Factory producing the transport behind a remote handler
pub type TransportFactory = Box<dyn Fn(&RemoteParams) -> Result<Box<dyn Transport>, SinkError>>;

/// Build a pipeline from a validated configuration.
///
/// Shorthand for `PipelineBuilder::new().build(config)`; use the builder
/// directly to register custom sinks or a remote transport.
pub fn build_pipeline(config: Config) -> Result<Pipeline, ConfigError> {
    PipelineBuilder::new().build(config)
}

/// Turns a [`Config`] into a running [`Pipeline`].
///
/// Validation happens before anything is constructed, and every violation is
/// reported at once. Custom handler kinds and remote transports are
/// registered here, at build time.
///
/// # Example
///
/// ```no_run
/// use logpipe::{Config, HandlerConfig, HandlerKind, Level, PipelineBuilder};
///
/// let config = Config::new()
///     .with_min_level(Level::Info)
///     .with_handler(HandlerConfig::new(HandlerKind::Console {
///         stderr_from: Level::Error,
///     }));
///
/// let pipeline = PipelineBuilder::new().build(config).expect("valid config");
/// pipeline.info("app.main", "pipeline up");
/// ```
pub struct PipelineBuilder {
    custom_sinks: HashMap<String, SinkFactory>,
    transport: Option<TransportFactory>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            custom_sinks: HashMap::new(),
            transport: None,
        }
    }

    /// Register a factory for a custom handler kind
    #[must_use = "builder methods return a new value"]
    pub fn register_sink<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&HandlerConfig) -> Result<Box<dyn Sink>, SinkError> + 'static,
    {
        self.custom_sinks.insert(name.into(), Box::new(factory));
        self
    }

    /// Register the transport factory backing remote handlers
    #[must_use = "builder methods return a new value"]
    pub fn register_transport<F>(mut self, factory: F) -> Self
    where
        F: Fn(&RemoteParams) -> Result<Box<dyn Transport>, SinkError> + 'static,
    {
        self.transport = Some(Box::new(factory));
        self
    }

    /// Validate the config and construct the pipeline.
    ///
    /// On any violation, returns a [`ConfigError`] listing all of them and
    /// constructs nothing: no files are opened and no workers are spawned
    /// until validation passes.
    pub fn build(self, config: Config) -> Result<Pipeline, ConfigError> {
        let violations = self.validate(&config);
        if !violations.is_empty() {
            return Err(ConfigError::new(violations));
        }

        let metrics = Arc::new(PipelineMetrics::new());

        // One formatter instance per distinct declared format, shared across
        // the sinks that use it
        let mut formatters: HashMap<OutputFormat, Arc<dyn Formatter>> = HashMap::new();
        let mut formatter_for = |format: OutputFormat| -> Arc<dyn Formatter> {
            let metrics = Arc::clone(&metrics);
            Arc::clone(formatters.entry(format).or_insert_with(|| match format {
                OutputFormat::Json => Arc::new(JsonFormatter::new(metrics)),
                OutputFormat::Text => Arc::new(TextFormatter::new()),
            }))
        };

        // Construct sinks; a failure here still means no pipeline
        let mut build_errors = Vec::new();
        let mut slots = Vec::new();
        for (index, handler) in config.handlers.iter().enumerate() {
            let sink = match self.construct_sink(handler, config.env) {
                Ok(sink) => sink,
                Err(e) => {
                    build_errors.push(format!("handler #{} ({}): {}", index, handler.kind.kind_name(), e));
                    continue;
                }
            };

            let formatter = formatter_for(handler.format.unwrap_or(config.format));
            let name = sink_name(handler, index);
            let (sender, receiver) = bounded(config.queue_capacity);
            let unhealthy = Arc::new(AtomicBool::new(false));

            let worker = spawn_worker(
                name.clone(),
                sink,
                formatter,
                receiver.clone(),
                config.retry.clone(),
                Arc::clone(&unhealthy),
                Arc::clone(&metrics),
            );
            let worker = match worker {
                Ok(handle) => handle,
                Err(e) => {
                    build_errors.push(format!(
                        "handler #{} ({}): failed to spawn delivery worker: {}",
                        index,
                        handler.kind.kind_name(),
                        e
                    ));
                    continue;
                }
            };

            slots.push(SinkSlot {
                name,
                min_level: handler.level,
                overflow: config.overflow.clone(),
                sender: Some(sender),
                evict_handle: receiver,
                unhealthy,
                worker: Some(worker),
            });
        }

        if !build_errors.is_empty() {
            // Tear down whatever came up before the failure
            let mut partial = Pipeline::from_parts(
                config.min_level,
                RedactionFilter::default(),
                slots,
                Arc::clone(&metrics),
            );
            partial.shutdown(Duration::from_secs(1));
            drop(partial);
            return Err(ConfigError::new(build_errors));
        }

        Ok(Pipeline::from_parts(
            config.min_level,
            RedactionFilter::new(config.redact_fields.clone()),
            slots,
            metrics,
        ))
    }

    /// Collect every validation violation in the config
    fn validate(&self, config: &Config) -> Vec<String> {
        let mut violations = Vec::new();

        if config.queue_capacity == 0 {
            violations.push("queue_capacity must be positive".to_string());
        }
        if config.retry.backoff == Duration::ZERO && config.retry.max_retries > 0 {
            violations.push("retry backoff must be positive when retries are enabled".to_string());
        }

        let mut seen_fields = HashSet::new();
        for field in &config.redact_fields {
            if !seen_fields.insert(field.as_str()) {
                violations.push(format!("duplicate redact field '{}'", field));
            }
        }

        for (index, handler) in config.handlers.iter().enumerate() {
            let prefix = format!("handler #{} ({})", index, handler.kind.kind_name());
            match &handler.kind {
                HandlerKind::Console { .. } => {}
                HandlerKind::File { path, rotation } => {
                    if path.as_os_str().is_empty() {
                        violations.push(format!("{}: file path must not be empty", prefix));
                    }
                    match &rotation.strategy {
                        RotationStrategy::Size { max_bytes } if *max_bytes == 0 => {
                            violations.push(format!("{}: rotation size must be positive", prefix));
                        }
                        RotationStrategy::Interval { every } if *every == Duration::ZERO => {
                            violations
                                .push(format!("{}: rotation interval must be positive", prefix));
                        }
                        RotationStrategy::Daily { hour } if *hour > 23 => {
                            violations
                                .push(format!("{}: rotation hour must be 0-23, got {}", prefix, hour));
                        }
                        RotationStrategy::Hybrid { max_bytes, every } => {
                            if *max_bytes == 0 {
                                violations
                                    .push(format!("{}: rotation size must be positive", prefix));
                            }
                            if *every == Duration::ZERO {
                                violations
                                    .push(format!("{}: rotation interval must be positive", prefix));
                            }
                        }
                        _ => {}
                    }
                }
                HandlerKind::Remote { params } => {
                    if params.endpoint.is_empty() {
                        violations.push(format!("{}: endpoint must not be empty", prefix));
                    } else if !params.endpoint.contains("://") {
                        violations.push(format!(
                            "{}: endpoint '{}' is not a scheme-qualified URL",
                            prefix, params.endpoint
                        ));
                    }
                    if self.transport.is_none() {
                        violations.push(format!(
                            "{}: no transport registered; call register_transport before build",
                            prefix
                        ));
                    }
                }
                HandlerKind::Custom { name } => {
                    if !self.custom_sinks.contains_key(name) {
                        violations.push(format!(
                            "{}: custom sink kind '{}' is not registered",
                            prefix, name
                        ));
                    }
                }
            }
        }

        violations
    }

    fn construct_sink(
        &self,
        handler: &HandlerConfig,
        env: Environment,
    ) -> Result<Box<dyn Sink>, SinkError> {
        match &handler.kind {
            HandlerKind::Console { stderr_from } => Ok(Box::new(
                ConsoleSink::new()
                    .with_stderr_from(*stderr_from)
                    .with_colors(env == Environment::Dev),
            )),
            HandlerKind::File { path, rotation } => Ok(Box::new(RotatingFileSink::with_policy(
                path,
                rotation.clone(),
            )?)),
            HandlerKind::Remote { params } => {
                let factory = self
                    .transport
                    .as_ref()
                    .ok_or_else(|| SinkError::fatal("no transport registered"))?;
                let transport = factory(params)?;
                Ok(Box::new(RemoteSink::new(params, transport)))
            }
            HandlerKind::Custom { name } => {
                let factory = self
                    .custom_sinks
                    .get(name)
                    .ok_or_else(|| SinkError::fatal(format!("custom sink '{}' not registered", name)))?;
                factory(handler)
            }
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable per-handler sink name: the kind, disambiguated by position
fn sink_name(handler: &HandlerConfig, index: usize) -> String {
    match &handler.kind {
        HandlerKind::Custom { name } => name.clone(),
        other => format!("{}-{}", other.kind_name(), index),
    }
}
