//! Pipeline metrics for observability
//!
//! Counters for monitoring pipeline health: overflow drops, exhausted
//! retries, serialization failures, and unhealthy sinks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for pipeline observability
///
/// # Example
///
/// ```
/// use logpipe::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
/// metrics.record_emitted();
/// metrics.record_delivered();
/// assert_eq!(metrics.emitted(), 1);
/// assert_eq!(metrics.delivered(), 1);
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Records accepted by `emit` (above the global level gate)
    emitted: AtomicU64,

    /// Formatted payloads successfully written to a sink
    delivered: AtomicU64,

    /// Records evicted or refused because a sink queue was full
    dropped_overflow: AtomicU64,

    /// Records dropped after exhausting transient-error retries
    retry_exhausted: AtomicU64,

    /// Records dropped for one sink because serialization failed
    format_errors: AtomicU64,

    /// Attributes dropped because they collided with a reserved output key
    attr_collisions: AtomicU64,

    /// Sinks marked unhealthy by a fatal error
    sink_fatal_events: AtomicU64,
}

impl PipelineMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            emitted: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped_overflow: AtomicU64::new(0),
            retry_exhausted: AtomicU64::new(0),
            format_errors: AtomicU64::new(0),
            attr_collisions: AtomicU64::new(0),
            sink_fatal_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_overflow(&self) -> u64 {
        self.dropped_overflow.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retry_exhausted(&self) -> u64 {
        self.retry_exhausted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn format_errors(&self) -> u64 {
        self.format_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn attr_collisions(&self) -> u64 {
        self.attr_collisions.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_fatal_events(&self) -> u64 {
        self.sink_fatal_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_emitted(&self) -> u64 {
        self.emitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped_overflow(&self) -> u64 {
        self.dropped_overflow.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_retry_exhausted(&self) -> u64 {
        self.retry_exhausted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_format_error(&self) -> u64 {
        self.format_errors.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_attr_collision(&self) -> u64 {
        self.attr_collisions.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_fatal(&self) -> u64 {
        self.sink_fatal_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Overflow drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been emitted.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_overflow() as f64;
        let total = self.emitted() as f64;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.emitted.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.dropped_overflow.store(0, Ordering::Relaxed);
        self.retry_exhausted.store(0, Ordering::Relaxed);
        self.format_errors.store(0, Ordering::Relaxed);
        self.attr_collisions.store(0, Ordering::Relaxed);
        self.sink_fatal_events.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    /// Create a snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            emitted: AtomicU64::new(self.emitted()),
            delivered: AtomicU64::new(self.delivered()),
            dropped_overflow: AtomicU64::new(self.dropped_overflow()),
            retry_exhausted: AtomicU64::new(self.retry_exhausted()),
            format_errors: AtomicU64::new(self.format_errors()),
            attr_collisions: AtomicU64::new(self.attr_collisions()),
            sink_fatal_events: AtomicU64::new(self.sink_fatal_events()),
        }
    }
}
