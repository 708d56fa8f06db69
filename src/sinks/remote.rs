//! Remote sink adapter
//!
//! The pipeline does not ship a network transport. A remote destination is
//! expressed as the `Transport` capability, supplied to the builder via
//! `register_transport`; this sink adapts it to the `Sink` interface. The
//! delivery worker handles retry/backoff for transient errors and unhealthy
//! marking for fatal ones.

use crate::core::config::RemoteParams;
use crate::core::error::SinkError;
use crate::core::level::Level;
use crate::core::sink::Sink;

/// Transport capability a remote collector integration must satisfy
///
/// `send` classifies failures itself: `SinkError::Transient` is retried by
/// the pipeline with bounded backoff, `SinkError::Fatal` stops routing to
/// the sink until an explicit reset.
pub trait Transport: Send {
    fn send(&mut self, payload: &[u8]) -> Result<(), SinkError>;

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sink adapter over a user-supplied transport
pub struct RemoteSink {
    endpoint: String,
    transport: Box<dyn Transport>,
}

impl RemoteSink {
    pub fn new(params: &RemoteParams, transport: Box<dyn Transport>) -> Self {
        Self {
            endpoint: params.endpoint.clone(),
            transport,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Sink for RemoteSink {
    fn name(&self) -> &str {
        "remote"
    }

    fn write(&mut self, _level: Level, payload: &[u8]) -> Result<(), SinkError> {
        self.transport.send(payload)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.transport.close()
    }
}
