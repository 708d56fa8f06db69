//! Pipeline dispatch engine
//!
//! Routes records through the redaction filter and fans them out to sinks.
//! Each sink gets a bounded queue and a dedicated delivery thread, so file
//! writes and rotations are single-writer and producers never block past the
//! configured overflow policy.

use super::config::RetryPolicy;
use super::error::SinkError;
use super::formatter::Formatter;
use super::level::Level;
use super::metrics::PipelineMetrics;
use super::overflow::OverflowPolicy;
use super::record::Record;
use super::redaction::RedactionFilter;
use super::sink::Sink;
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default shutdown timeout used when the pipeline is dropped without an
/// explicit `shutdown()` call.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Work item on a sink queue
pub(crate) enum Command {
    Record(Arc<Record>),
    Flush,
}

/// One registered sink: its queue handles, health flag, and worker
pub(crate) struct SinkSlot {
    pub(crate) name: String,
    /// Per-sink minimum level; `None` falls back to the global minimum
    pub(crate) min_level: Option<Level>,
    pub(crate) overflow: OverflowPolicy,
    pub(crate) sender: Option<Sender<Command>>,
    /// MPMC receiver clone used by producers for drop-oldest eviction
    pub(crate) evict_handle: Receiver<Command>,
    pub(crate) unhealthy: Arc<AtomicBool>,
    pub(crate) worker: Option<thread::JoinHandle<()>>,
}

/// The dispatch engine owning the filter chain and all sinks
///
/// Construct through [`crate::build_pipeline`] or
/// [`crate::PipelineBuilder`]. `emit` is callable concurrently from any
/// number of threads; delivery to each sink preserves a single producer's
/// emission order, with no ordering guaranteed across different sinks.
pub struct Pipeline {
    min_level: RwLock<Level>,
    redaction: RedactionFilter,
    slots: Vec<SinkSlot>,
    metrics: Arc<PipelineMetrics>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("min_level", &*self.min_level.read())
            .field("redaction", &self.redaction)
            .field("sinks", &self.slots.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl Pipeline {
    pub(crate) fn from_parts(
        min_level: Level,
        redaction: RedactionFilter,
        slots: Vec<SinkSlot>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            min_level: RwLock::new(min_level),
            redaction,
            slots,
            metrics,
        }
    }

    /// Submit one record to every eligible sink.
    ///
    /// Non-blocking up to the bounded per-sink queue; a full queue is
    /// resolved by the configured overflow policy. A failing sink never
    /// affects delivery to the others and never surfaces to the caller.
    pub fn emit(&self, record: Record) {
        let global = *self.min_level.read();
        if record.level < global {
            return;
        }

        let redacted = if self.redaction.is_empty() {
            record
        } else {
            self.redaction.apply(&record)
        };
        self.metrics.record_emitted();

        let shared = Arc::new(redacted);
        for slot in &self.slots {
            if shared.level < slot.min_level.unwrap_or(global) {
                continue;
            }
            if slot.unhealthy.load(Ordering::Relaxed) {
                continue;
            }
            self.submit(slot, Arc::clone(&shared));
        }
    }

    fn submit(&self, slot: &SinkSlot, record: Arc<Record>) {
        let Some(sender) = slot.sender.as_ref() else {
            return;
        };
        match sender.try_send(Command::Record(record)) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => self.handle_overflow(slot, sender, cmd),
            Err(TrySendError::Disconnected(_)) => {
                // Pipeline is shutting down
            }
        }
    }

    fn handle_overflow(&self, slot: &SinkSlot, sender: &Sender<Command>, mut cmd: Command) {
        match &slot.overflow {
            OverflowPolicy::DropOldest => {
                // Evict the oldest queued record to make room. The loop
                // terminates because every iteration either evicts an item
                // or the worker has drained the queue; the bound covers
                // pathological producer races.
                for _ in 0..64 {
                    if let Ok(evicted) = slot.evict_handle.try_recv() {
                        if matches!(evicted, Command::Record(_)) {
                            self.metrics.record_dropped_overflow();
                        }
                    }
                    match sender.try_send(cmd) {
                        Ok(()) => return,
                        Err(TrySendError::Full(returned)) => cmd = returned,
                        Err(TrySendError::Disconnected(_)) => return,
                    }
                }
                self.metrics.record_dropped_overflow();
            }
            OverflowPolicy::BlockWithTimeout(timeout) => {
                match sender.send_timeout(cmd, *timeout) {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.metrics.record_dropped_overflow();
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {}
                }
            }
        }
    }

    /// Convenience: emit a message at the given level under a logger name
    pub fn log(&self, level: Level, logger: impl Into<String>, message: impl Into<String>) {
        self.emit(Record::new(level, message).with_logger(logger));
    }

    #[inline]
    pub fn debug(&self, logger: impl Into<String>, message: impl Into<String>) {
        self.log(Level::Debug, logger, message);
    }

    #[inline]
    pub fn info(&self, logger: impl Into<String>, message: impl Into<String>) {
        self.log(Level::Info, logger, message);
    }

    #[inline]
    pub fn warn(&self, logger: impl Into<String>, message: impl Into<String>) {
        self.log(Level::Warn, logger, message);
    }

    #[inline]
    pub fn error(&self, logger: impl Into<String>, message: impl Into<String>) {
        self.log(Level::Error, logger, message);
    }

    #[inline]
    pub fn fatal(&self, logger: impl Into<String>, message: impl Into<String>) {
        self.log(Level::Fatal, logger, message);
    }

    /// Adjust the global minimum level at runtime
    pub fn set_min_level(&self, level: Level) {
        *self.min_level.write() = level;
    }

    #[must_use]
    pub fn min_level(&self) -> Level {
        *self.min_level.read()
    }

    /// Ask every sink to flush buffered output, best effort.
    ///
    /// The request rides the delivery queues, so it applies after everything
    /// already enqueued; a full queue skips the flush rather than block.
    pub fn flush(&self) {
        for slot in &self.slots {
            if let Some(sender) = slot.sender.as_ref() {
                let _ = sender.try_send(Command::Flush);
            }
        }
    }

    /// Re-enable a sink previously marked unhealthy by a fatal error.
    ///
    /// Returns false when no sink with that name exists.
    pub fn reset_sink(&self, name: &str) -> bool {
        let mut found = false;
        for slot in self.slots.iter().filter(|s| s.name == name) {
            slot.unhealthy.store(false, Ordering::Relaxed);
            found = true;
        }
        found
    }

    /// Health of a named sink; `None` when no such sink exists
    #[must_use]
    pub fn is_sink_healthy(&self, name: &str) -> Option<bool> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .map(|s| !s.unhealthy.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn sink_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    /// Observability counters
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Drain pending records and release every sink.
    ///
    /// Closes the queues, then waits for the delivery workers to finish
    /// draining; workers flush and close their sinks on exit. Returns false
    /// if a worker missed the deadline or panicked — pending records past
    /// the deadline are discarded.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        for slot in &mut self.slots {
            drop(slot.sender.take());
        }

        let start = std::time::Instant::now();
        let mut clean = true;

        for slot in &mut self.slots {
            let Some(handle) = slot.worker.take() else {
                continue;
            };
            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGPIPE ERROR] sink '{}' worker panicked during shutdown: {:?}",
                            slot.name, e
                        );
                        clean = false;
                    }
                    break;
                }
                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGPIPE WARNING] sink '{}' did not drain within {:?}; remaining records discarded",
                        slot.name, timeout
                    );
                    clean = false;
                    break;
                }
                // Avoid busy-waiting while the worker drains
                thread::sleep(Duration::from_millis(10));
            }
        }

        clean
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.slots.iter().any(|s| s.sender.is_some() || s.worker.is_some()) {
            self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }

        let dropped = self.metrics.dropped_overflow();
        if dropped > 0 {
            eprintln!(
                "[LOGPIPE WARNING] pipeline shut down with {} overflow-dropped records (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

/// Outcome of one delivery attempt chain
enum Delivery {
    Delivered,
    Dropped,
    SinkDown,
}

/// Spawn the delivery worker owning one sink.
///
/// The worker drains its queue until the channel closes, then flushes and
/// closes the sink. Per-record processing is wrapped in `catch_unwind`: a
/// panicking sink is marked unhealthy and the worker survives to drain.
pub(crate) fn spawn_worker(
    name: String,
    mut sink: Box<dyn Sink>,
    formatter: Arc<dyn Formatter>,
    receiver: Receiver<Command>,
    retry: RetryPolicy,
    unhealthy: Arc<AtomicBool>,
    metrics: Arc<PipelineMetrics>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("logpipe-{}", name))
        .spawn(move || {
            while let Ok(cmd) = receiver.recv() {
                match cmd {
                    Command::Flush => {
                        if let Err(e) = sink.flush() {
                            eprintln!("[LOGPIPE ERROR] sink '{}' flush failed: {}", name, e);
                        }
                    }
                    Command::Record(record) => {
                        if unhealthy.load(Ordering::Relaxed) {
                            continue;
                        }
                        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            deliver(&name, sink.as_mut(), formatter.as_ref(), &record, &retry, &metrics)
                        }));
                        match outcome {
                            Ok(Delivery::Delivered) => {
                                metrics.record_delivered();
                            }
                            Ok(Delivery::Dropped) => {}
                            Ok(Delivery::SinkDown) => {
                                unhealthy.store(true, Ordering::Relaxed);
                            }
                            Err(_) => {
                                eprintln!(
                                    "[LOGPIPE CRITICAL] sink '{}' panicked; marked unhealthy. \
                                     Other sinks continue to function.",
                                    name
                                );
                                metrics.record_sink_fatal();
                                unhealthy.store(true, Ordering::Relaxed);
                            }
                        }
                    }
                }
            }

            // Channel closed: release the sink's resources on the way out
            if let Err(e) = sink.flush() {
                eprintln!("[LOGPIPE ERROR] sink '{}' final flush failed: {}", name, e);
            }
            if let Err(e) = sink.close() {
                eprintln!("[LOGPIPE ERROR] sink '{}' close failed: {}", name, e);
            }
        })
}

/// Serialize and write one record, retrying transient failures with bounded
/// exponential backoff.
fn deliver(
    name: &str,
    sink: &mut dyn Sink,
    formatter: &dyn Formatter,
    record: &Record,
    retry: &RetryPolicy,
    metrics: &PipelineMetrics,
) -> Delivery {
    let payload = match formatter.serialize(record) {
        Ok(bytes) => bytes,
        Err(e) => {
            metrics.record_format_error();
            eprintln!("[LOGPIPE ERROR] sink '{}' dropped one record: {}", name, e);
            return Delivery::Dropped;
        }
    };

    let mut attempt = 0;
    loop {
        match sink.write(record.level, &payload) {
            Ok(()) => return Delivery::Delivered,
            Err(e @ SinkError::Transient { .. }) => {
                if attempt >= retry.max_retries {
                    metrics.record_retry_exhausted();
                    eprintln!(
                        "[LOGPIPE WARNING] sink '{}' dropped one record after {} retries: {}",
                        name, retry.max_retries, e
                    );
                    return Delivery::Dropped;
                }
                attempt += 1;
                thread::sleep(retry.backoff_for(attempt));
            }
            Err(e @ SinkError::Fatal { .. }) => {
                metrics.record_sink_fatal();
                eprintln!(
                    "[LOGPIPE ERROR] sink '{}' marked unhealthy: {}. \
                     Routing stops until reset_sink(\"{}\").",
                    name, e, name
                );
                return Delivery::SinkDown;
            }
        }
    }
}
