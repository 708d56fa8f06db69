//! Logging macros for ergonomic record emission.
//!
//! The macros stamp the calling module's path (dotted) as the logger name
//! and support `format!`-style message arguments.
//!
//! # Examples
//!
//! ```
//! use logpipe::{build_pipeline, info, Config};
//!
//! let pipeline = build_pipeline(Config::new()).unwrap();
//!
//! // Basic logging
//! info!(pipeline, "server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(pipeline, "listening on port {}", port);
//! ```

/// Emit a record at the given level with automatic formatting.
///
/// # Examples
///
/// ```
/// # use logpipe::{build_pipeline, Config};
/// # let pipeline = build_pipeline(Config::new()).unwrap();
/// use logpipe::{log, Level};
/// log!(pipeline, Level::Info, "simple message");
/// log!(pipeline, Level::Error, "error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($pipeline:expr, $level:expr, $($arg:tt)+) => {
        $pipeline.emit(
            $crate::Record::new($level, format!($($arg)+))
                .with_logger(module_path!().replace("::", ".")),
        )
    };
}

/// Emit a debug-level record.
#[macro_export]
macro_rules! debug {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Level::Debug, $($arg)+)
    };
}

/// Emit an info-level record.
#[macro_export]
macro_rules! info {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Level::Info, $($arg)+)
    };
}

/// Emit a warning-level record.
#[macro_export]
macro_rules! warn {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Level::Warn, $($arg)+)
    };
}

/// Emit an error-level record.
#[macro_export]
macro_rules! error {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Level::Error, $($arg)+)
    };
}

/// Emit a fatal-level record.
#[macro_export]
macro_rules! fatal {
    ($pipeline:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::Level::Fatal, $($arg)+)
    };
}
