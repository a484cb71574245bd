#![deny(missing_docs)]
//! Shared logging utilities for the grade-watch workspace.
//!
//! This crate provides the `watch_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Every macro takes either plain `format!` arguments or a leading
//! `job = <id>;` clause, which tags the line with the job it concerns:
//!
//! ```
//! let job_id = "J1";
//! watch_logging::watch_debug!(job = job_id; "tick discarded: {}", "timeout");
//! watch_logging::watch_info!("{} loops active", 3);
//! ```

#[doc(hidden)]
pub use log as __log;

/// Formats the tag placed in front of job-scoped log lines.
pub fn job_tag(job_id: &str) -> String {
    format!("[job {job_id}]")
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! watch_trace {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::trace!("{} {}", $crate::job_tag(&$job), format_args!($($arg)+));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! watch_debug {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::debug!("{} {}", $crate::job_tag(&$job), format_args!($($arg)+));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! watch_info {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::info!("{} {}", $crate::job_tag(&$job), format_args!($($arg)+));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! watch_warn {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::warn!("{} {}", $crate::job_tag(&$job), format_args!($($arg)+));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! watch_error {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::error!("{} {}", $crate::job_tag(&$job), format_args!($($arg)+));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
