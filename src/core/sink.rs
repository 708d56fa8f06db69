//! Sink trait for formatted log output destinations

use super::{error::SinkError, level::Level};

/// A destination capability consuming formatted bytes.
///
/// Each sink is owned exclusively by its delivery worker, so implementations
/// only need `Send`. Payloads carry no trailing newline; line-oriented sinks
/// append their own. The record's level is passed alongside the payload so
/// sinks can route by threshold (stdout vs. stderr) without re-parsing bytes.
pub trait Sink: Send {
    fn name(&self) -> &str;

    fn write(&mut self, level: Level, payload: &[u8]) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError>;

    /// Release the underlying resource. Called once during shutdown; writes
    /// after `close` are invalid.
    fn close(&mut self) -> Result<(), SinkError>;
}
