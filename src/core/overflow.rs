//! Overflow policies for bounded per-sink queues
//!
//! When a sink's delivery queue is full, the policy decides what happens to
//! the colliding record. Drops are always tracked in `PipelineMetrics`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Policy for handling a full per-sink queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued record to make room for the new one.
    ///
    /// The default: producers are never blocked by a slow sink, and the
    /// freshest records win. Evictions increment the overflow drop counter.
    DropOldest,

    /// Wait up to the timeout for queue space, then drop the new record.
    ///
    /// Trades bounded producer latency for better delivery under bursts.
    BlockWithTimeout(Duration),
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::DropOldest
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
        }
    }
}
