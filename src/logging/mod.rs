//! Logging and observability
//!
//! Structured logging with:
//! - Human readable console output
//! - Optional JSON log files with rotation
//! - Configurable log levels
//!
//! # Example
//!
//! ```no_run
//! use formex::logging::init_logging;
//! use formex::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of an export operation
///
/// # Example
///
/// ```no_run
/// use formex::log_export_start;
///
/// log_export_start!("household_survey", 120);
/// ```
#[macro_export]
macro_rules! log_export_start {
    ($form_id:expr, $candidates:expr) => {
        tracing::info!(
            form_id = %$form_id,
            candidates = $candidates,
            "Starting export"
        );
    };
}

/// Log the completion of an export operation
///
/// # Example
///
/// ```no_run
/// use formex::log_export_complete;
/// use std::time::Duration;
///
/// log_export_complete!(42, Duration::from_secs(10));
/// ```
#[macro_export]
macro_rules! log_export_complete {
    ($count:expr, $duration:expr) => {
        tracing::info!(
            count = $count,
            duration_ms = $duration.as_millis(),
            "Export completed"
        );
    };
}

/// Log a submission dropped from the export
///
/// # Example
///
/// ```no_run
/// use formex::log_submission_skipped;
///
/// log_submission_skipped!("instances/uuid1/submission.xml", "Missing media file");
/// ```
#[macro_export]
macro_rules! log_submission_skipped {
    ($path:expr, $reason:expr) => {
        tracing::warn!(
            path = %$path,
            reason = %$reason,
            "Skipping submission"
        );
    };
}

/// Log export progress
#[macro_export]
macro_rules! log_export_progress {
    ($processed:expr, $total:expr) => {
        tracing::info!(
            processed = $processed,
            total = $total,
            progress_pct = ($processed as f64 / ($total as f64).max(1.0) * 100.0).round(),
            "Export progress"
        );
    };
}
