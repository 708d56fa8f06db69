//! Rotating file sink with size- and time-based rollover
//!
//! The active file lives at the configured base path; rotated backups are
//! named `<base>.1` (newest) through `<base>.<max_backups>` (oldest), with
//! optional gzip compression. Rotation happens before the write that would
//! cross the policy boundary, inside the sink's single-writer worker, so no
//! record is lost or split across a rollover.

use crate::core::error::SinkError;
use crate::core::level::Level;
use crate::core::sink::Sink;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Rotation strategy defining when to roll the active file
///
/// # Examples
///
/// ```
/// use logpipe::sinks::RotationStrategy;
/// use std::time::Duration;
///
/// // Roll when the next write would push the file past 10 MiB
/// let by_size = RotationStrategy::Size { max_bytes: 10 * 1024 * 1024 };
///
/// // Roll at midnight UTC
/// let daily = RotationStrategy::Daily { hour: 0 };
///
/// // Roll on size or interval, whichever comes first
/// let hybrid = RotationStrategy::Hybrid {
///     max_bytes: 50 * 1024 * 1024,
///     every: Duration::from_secs(24 * 3600),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// Roll when the pending write would push the file past `max_bytes`
    Size { max_bytes: u64 },

    /// Roll once `every` has elapsed since the last rotation
    Interval { every: Duration },

    /// Roll when crossing the given UTC hour boundary (0-23)
    Daily { hour: u8 },

    /// Roll on size or interval, whichever comes first
    Hybrid { max_bytes: u64, every: Duration },

    /// Never roll (plain append file)
    Never,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        // 10 MiB, matching the source system's rotating handler default
        RotationStrategy::Size {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl RotationStrategy {
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        RotationStrategy::Size { max_bytes }
    }

    #[must_use]
    pub fn interval(every: Duration) -> Self {
        RotationStrategy::Interval { every }
    }

    #[must_use]
    pub fn daily(hour: u8) -> Self {
        RotationStrategy::Daily { hour }
    }

    #[must_use]
    pub fn hybrid(max_bytes: u64, every: Duration) -> Self {
        RotationStrategy::Hybrid { max_bytes, every }
    }

    #[must_use]
    pub fn never() -> Self {
        RotationStrategy::Never
    }
}

/// Rotation configuration for a file handler
///
/// # Examples
///
/// ```
/// use logpipe::sinks::{RotationPolicy, RotationStrategy};
///
/// let policy = RotationPolicy::new()
///     .with_strategy(RotationStrategy::Size { max_bytes: 1024 * 1024 })
///     .with_max_backups(7)
///     .with_compression(true);
/// assert_eq!(policy.max_backups, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationPolicy {
    #[serde(default)]
    pub strategy: RotationStrategy,
    /// Rotated files kept on disk; older backups are deleted
    #[serde(default = "RotationPolicy::default_max_backups")]
    pub max_backups: usize,
    /// Gzip rotated backups
    #[serde(default)]
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::default(),
            max_backups: Self::default_max_backups(),
            compress: false,
        }
    }
}

impl RotationPolicy {
    fn default_max_backups() -> usize {
        7
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_strategy(mut self, strategy: RotationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

/// Most recent occurrence of `hour:00` UTC at or before `now`
fn last_boundary(now: DateTime<Utc>, hour: u8) -> DateTime<Utc> {
    let candidate = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), u32::from(hour), 0, 0)
        .single()
        .unwrap_or(now);
    if candidate <= now {
        candidate
    } else {
        candidate - chrono::Duration::days(1)
    }
}

/// Sibling path with `.gz` appended to the full file name, so numbered
/// backups keep their index (`app.log.2` -> `app.log.2.gz`)
fn gz_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("backup");
    path.with_file_name(format!("{}.gz", name))
}

/// File sink that rolls the active log per its rotation policy
pub struct RotatingFileSink {
    base_path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    last_rotation: DateTime<Utc>,
    /// Consecutive backup-deletion failures; rotation degrades to append-only
    /// once the cap is hit
    deletion_failures: usize,
}

const MAX_DELETION_FAILURES: usize = 5;

impl RotatingFileSink {
    /// Open (or create) the file at `path` with the default policy
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Open (or create) the file at `path` with a custom policy
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self, SinkError> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SinkError::fatal_io(
                        format!("failed to create log directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&base_path)
            .map_err(|e| {
                SinkError::fatal_io(
                    format!("failed to open log file '{}'", base_path.display()),
                    e,
                )
            })?;

        let metadata = file.metadata().map_err(|e| {
            SinkError::fatal_io(
                format!("cannot read metadata for '{}'", base_path.display()),
                e,
            )
        })?;
        let current_size = metadata.len();
        let last_rotation = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Self {
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
            last_rotation,
            deletion_failures: 0,
        })
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Decide whether the pending write of `incoming` bytes requires a roll.
    ///
    /// Size modes check whether THIS write would cross the threshold; an
    /// oversized record on an empty file is written anyway, since rotating
    /// an empty file gains nothing.
    fn should_rotate(&self, incoming: u64, now: DateTime<Utc>) -> bool {
        match &self.policy.strategy {
            RotationStrategy::Never => false,

            RotationStrategy::Size { max_bytes } => {
                self.current_size > 0 && self.current_size + incoming > *max_bytes
            }

            RotationStrategy::Interval { every } => {
                now.signed_duration_since(self.last_rotation).to_std().unwrap_or(Duration::ZERO)
                    >= *every
            }

            RotationStrategy::Daily { hour } => self.last_rotation < last_boundary(now, *hour),

            RotationStrategy::Hybrid { max_bytes, every } => {
                let size_hit = self.current_size > 0 && self.current_size + incoming > *max_bytes;
                let time_hit = now
                    .signed_duration_since(self.last_rotation)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    >= *every;
                size_hit || time_hit
            }
        }
    }

    /// Backup file path for the given index
    fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log");
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }

    /// Perform the roll: close, shift backups, reopen fresh
    fn rotate(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                SinkError::transient_io(
                    format!("flush before rotation of '{}'", self.base_path.display()),
                    e,
                )
            })?;
            // Writer dropped here, releasing the file handle
        }

        // Retention count 0: keep no backups at all
        if self.policy.max_backups == 0 {
            if self.base_path.exists() {
                fs::remove_file(&self.base_path).map_err(|e| {
                    SinkError::transient_io(
                        format!("failed to discard '{}'", self.base_path.display()),
                        e,
                    )
                })?;
            }
            return self.reopen();
        }

        // Delete the backup that would fall off the end of the retention
        // window, tracking consecutive failures
        let oldest = self.backup_path(self.policy.max_backups);
        let oldest_gz = gz_sibling(&oldest);
        let mut deletion_failed = false;
        for stale in [&oldest_gz, &oldest] {
            if stale.exists() {
                if let Err(e) = fs::remove_file(stale) {
                    deletion_failed = true;
                    eprintln!(
                        "[LOGPIPE WARNING] failed to remove old backup {}: {} (failure #{}/{})",
                        stale.display(),
                        e,
                        self.deletion_failures + 1,
                        MAX_DELETION_FAILURES
                    );
                }
            }
        }
        if deletion_failed {
            self.deletion_failures += 1;
            if self.deletion_failures >= MAX_DELETION_FAILURES {
                // Reopen so logging continues even though pruning is stuck
                self.reopen()?;
                return Err(SinkError::transient(format!(
                    "rotation of '{}' aborted: backup deletion failed {} consecutive times",
                    self.base_path.display(),
                    self.deletion_failures
                )));
            }
        } else {
            self.deletion_failures = 0;
        }

        // Shift base.N -> base.N+1, gzip-aware
        for i in (1..self.policy.max_backups).rev() {
            let old = self.backup_path(i);
            let new = self.backup_path(i + 1);
            let old_gz = gz_sibling(&old);
            let new_gz = gz_sibling(&new);

            let (from, to) = if old_gz.exists() {
                (old_gz, new_gz)
            } else if old.exists() {
                (old, new)
            } else {
                continue;
            };

            if fs::rename(&from, &to).is_err() {
                // Some platforms refuse to rename over an existing file
                let _ = fs::remove_file(&to);
                fs::rename(&from, &to).map_err(|e| {
                    SinkError::transient_io(
                        format!("failed to shift backup '{}'", from.display()),
                        e,
                    )
                })?;
            }
        }

        // Move the active file to .1 and optionally compress it
        let newest = self.backup_path(1);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &newest).map_err(|e| {
                SinkError::transient_io(
                    format!("failed to rotate '{}'", self.base_path.display()),
                    e,
                )
            })?;
            if self.policy.compress {
                self.compress_backup(&newest)?;
            }
        }

        self.reopen()
    }

    fn reopen(&mut self) -> Result<(), SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.base_path)
            .map_err(|e| {
                SinkError::fatal_io(
                    format!("failed to reopen '{}'", self.base_path.display()),
                    e,
                )
            })?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = 0;
        self.last_rotation = Utc::now();
        Ok(())
    }

    /// Gzip a rotated backup via a temp file so a failure never loses data.
    ///
    /// The uncompressed original is removed only after the compressed copy
    /// is fully in place.
    fn compress_backup(&self, path: &Path) -> Result<(), SinkError> {
        use std::io::{BufReader, Read};

        let gz_path = gz_sibling(path);
        let tmp_path = gz_sibling(path).with_extension("gz.tmp");

        let input = File::open(path).map_err(|e| {
            SinkError::transient_io(
                format!("failed to open '{}' for compression", path.display()),
                e,
            )
        })?;
        let mut reader = BufReader::with_capacity(64 * 1024, input);

        let output = File::create(&tmp_path).map_err(|e| {
            SinkError::transient_io(
                format!("failed to create '{}'", tmp_path.display()),
                e,
            )
        })?;
        let mut encoder = flate2::write::GzEncoder::new(
            BufWriter::with_capacity(64 * 1024, output),
            flate2::Compression::default(),
        );

        // Stream in chunks so large backups never load fully into memory
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buffer).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                SinkError::transient_io(format!("failed to read '{}'", path.display()), e)
            })?;
            if n == 0 {
                break;
            }
            encoder.write_all(&buffer[..n]).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                SinkError::transient_io("failed to compress backup chunk", e)
            })?;
        }

        encoder.finish().map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            SinkError::transient_io("failed to finish backup compression", e)
        })?;

        fs::rename(&tmp_path, &gz_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            SinkError::transient_io(
                format!("failed to move compressed backup to '{}'", gz_path.display()),
                e,
            )
        })?;

        if let Err(e) = fs::remove_file(path) {
            eprintln!(
                "[LOGPIPE WARNING] compressed {} but could not remove the original: {}",
                path.display(),
                e
            );
        }

        Ok(())
    }
}

impl Sink for RotatingFileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn write(&mut self, _level: Level, payload: &[u8]) -> Result<(), SinkError> {
        let incoming = payload.len() as u64 + 1; // trailing newline

        if self.should_rotate(incoming, Utc::now()) {
            if let Err(e) = self.rotate() {
                // Keep logging on the current file rather than lose records
                eprintln!(
                    "[LOGPIPE WARNING] rotation failed: {}. Continuing with current file.",
                    e
                );
                if self.writer.is_none() {
                    self.reopen()?;
                }
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::fatal("file writer not initialized"))?;
        writer.write_all(payload).map_err(|e| {
            SinkError::transient_io(
                format!("failed to write to '{}'", self.base_path.display()),
                e,
            )
        })?;
        writer.write_all(b"\n").map_err(|e| {
            SinkError::transient_io(
                format!("failed to write to '{}'", self.base_path.display()),
                e,
            )
        })?;
        self.current_size += incoming;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                SinkError::transient_io(
                    format!("failed to flush '{}'", self.base_path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                SinkError::transient_io(
                    format!("failed to flush '{}' on close", self.base_path.display()),
                    e,
                )
            })?;
            // Writer dropped here, releasing the handle
        }
        Ok(())
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        // Best effort: never leak a dirty buffer or an open handle
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
