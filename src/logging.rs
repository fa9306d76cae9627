// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-instance, optional leveled logging.
//!
//! Unlike a process-global logger, every buffer/window in this crate is an
//! injectable collaborator, so the logging hook is too: each instance holds
//! an `Option<Arc<dyn StepLogger>>` plus a debug prefix. Absent a logger,
//! calls are no-ops.

use std::fmt;
use std::sync::Arc;

/// Severity of a log line, ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leveled log sink. Implementations must be safe to share across an
/// instance's lifetime; they are not required to be called from multiple
/// threads concurrently (this crate's components are single-threaded).
pub trait StepLogger: Send + Sync {
    fn log(&self, level: LogLevel, target: &str, message: &str);
}

/// Forwards to the `log` crate facade, so host applications wire this crate's
/// diagnostics into whatever subscriber they already use.
#[cfg(feature = "logging")]
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeLogger;

#[cfg(feature = "logging")]
impl StepLogger for FacadeLogger {
    fn log(&self, level: LogLevel, target: &str, message: &str) {
        let level = match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        };
        log::log!(target: "nimble_steps", level, "[{target}] {message}");
    }
}

/// Convenience holder used by `PendingWindow`/`AuthoritativeBuffer`: an
/// optional logger plus an instance prefix (mirrors the distilled spec's
/// "per-instance prefix" external interface).
#[derive(Clone, Default)]
pub struct LogSink {
    logger: Option<Arc<dyn StepLogger>>,
    prefix: &'static str,
}

impl LogSink {
    pub fn new(logger: Option<Arc<dyn StepLogger>>, prefix: &'static str) -> Self {
        Self { logger, prefix }
    }

    pub fn none(prefix: &'static str) -> Self {
        Self { logger: None, prefix }
    }

    #[inline]
    pub fn log(&self, level: LogLevel, message: fmt::Arguments<'_>) {
        if let Some(logger) = &self.logger {
            logger.log(level, self.prefix, &message.to_string());
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("prefix", &self.prefix)
            .field("has_logger", &self.logger.is_some())
            .finish()
    }
}

macro_rules! log_sink {
    ($sink:expr, $level:ident, $($arg:tt)*) => {
        $sink.log($crate::logging::LogLevel::$level, format_args!($($arg)*))
    };
}

pub(crate) use log_sink;
