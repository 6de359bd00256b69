//! Shared types: the injectable [`Logger`] and the [`DiskInfo`] a driver
//! reports back once it has opened an image.

use std::fmt;
use std::sync::Arc;

/// Severity of a single log line, matching the four levels the original
/// `LOG_ERROR`/`LOG_WARNING`/`LOG_INFO`/`LOG_VERBOSE` macros used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 1,
    Warning = 2,
    Info = 3,
    Verbose = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Verbose => "VERBOSE",
        };
        f.write_str(s)
    }
}

/// A caller-supplied log sink, injected at `Image::open`.
///
/// Every driver also emits ambient `tracing` events at matching levels;
/// this callback exists so a caller can capture the exact same lines
/// without installing a `tracing` subscriber. The default is a no-op, so
/// callers that don't care about logging pay nothing for it.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Fn(LogLevel, &str) + Send + Sync>,
}

impl Logger {
    /// Build a logger around a write callback.
    pub fn new(sink: impl Fn(LogLevel, &str) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// The logger nobody asked for: every call is dropped.
    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        (self.sink)(level, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    pub fn verbose(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Verbose, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

/// What a driver reports about the image it opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskInfo {
    /// Logical size of the virtual disk in bytes, as seen by a guest.
    pub disksize: u64,
}

impl DiskInfo {
    pub fn new(disksize: u64) -> Self {
        Self { disksize }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn noop_logger_does_nothing_observable() {
        let logger = Logger::noop();
        logger.error("this goes nowhere");
    }

    #[test]
    fn logger_invokes_sink_with_level() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let logger = Logger::new(move |level, msg| {
            assert_eq!(level, LogLevel::Warning);
            assert_eq!(msg, "careful");
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        logger.warning("careful");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_logger_is_noop() {
        let logger = Logger::default();
        logger.info("quiet");
    }

    #[test]
    fn disk_info_holds_size() {
        let info = DiskInfo::new(1 << 30);
        assert_eq!(info.disksize, 1 << 30);
    }

    #[test]
    fn log_level_ordering_matches_verbosity() {
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Verbose);
    }
}
