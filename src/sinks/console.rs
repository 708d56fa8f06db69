//! Console sink implementation

use crate::core::error::SinkError;
use crate::core::level::Level;
use crate::core::sink::Sink;
use colored::Colorize;
use std::io::Write;

/// Writes formatted lines to stdout, routing severe records to stderr.
///
/// Records at or above `stderr_from` go to the error stream; everything else
/// goes to standard output. A newline is appended to every payload. Coloring
/// tints the whole line by level and is enabled for dev environments.
pub struct ConsoleSink {
    stderr_from: Level,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            stderr_from: Level::Error,
            use_colors: false,
        }
    }

    #[must_use]
    pub fn with_stderr_from(mut self, level: Level) -> Self {
        self.stderr_from = level;
        self
    }

    #[must_use]
    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.use_colors = enabled;
        self
    }

    fn render(&self, level: Level, payload: &[u8]) -> String {
        let line = String::from_utf8_lossy(payload);
        if self.use_colors {
            line.as_ref().color(level.color_code()).to_string()
        } else {
            line.into_owned()
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write(&mut self, level: Level, payload: &[u8]) -> Result<(), SinkError> {
        let line = self.render(level, payload);
        if level >= self.stderr_from {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        // Both streams may carry output
        std::io::stdout()
            .flush()
            .map_err(|e| SinkError::transient_io("failed to flush stdout", e))?;
        std::io::stderr()
            .flush()
            .map_err(|e| SinkError::transient_io("failed to flush stderr", e))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.flush()
    }
}
