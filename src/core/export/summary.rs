//! Export summary and reporting
//!
//! This module defines structures for tracking and reporting export results.

use super::event::ExportOutcome;
use crate::domain::errors::ExportErrorDetail;
use chrono::{DateTime, FixedOffset};
use std::time::Duration;

/// Summary of an export operation
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Submissions found after the date filter
    pub candidates: usize,

    /// Submissions whose rows were written
    pub exported: usize,

    /// Submissions dropped because of a submission error
    pub skipped: usize,

    /// Exported submissions whose signature did not match
    pub invalid_signatures: usize,

    /// Candidates never started because of a shutdown request
    pub not_started: usize,

    /// Submission date of the chronologically last exported row
    pub last_exported_date: Option<DateTime<FixedOffset>>,

    /// Tables written, main table first
    pub tables_written: Vec<String>,

    /// Whether a shutdown request cut the export short
    pub interrupted: bool,

    /// Duration of the export
    pub duration: Duration,

    /// Why submissions were skipped
    pub errors: Vec<ExportErrorDetail>,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new() -> Self {
        Self {
            candidates: 0,
            exported: 0,
            skipped: 0,
            invalid_signatures: 0,
            not_started: 0,
            last_exported_date: None,
            tables_written: Vec::new(),
            interrupted: false,
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a skipped submission
    pub fn add_error(&mut self, error: ExportErrorDetail) {
        self.skipped += 1;
        self.errors.push(error);
    }

    pub fn outcome(&self) -> ExportOutcome {
        ExportOutcome::from_counts(self.candidates, self.exported)
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.candidates == 0 {
            return 100.0;
        }
        (self.exported as f64 / self.candidates as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            candidates = self.candidates,
            exported = self.exported,
            skipped = self.skipped,
            invalid_signatures = self.invalid_signatures,
            interrupted = self.interrupted,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            outcome = %self.outcome(),
            "Export finished"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Export completed with skipped submissions"
            );
            for error in &self.errors {
                tracing::warn!(
                    path = ?error.path,
                    instance_id = ?error.instance_id,
                    message = %error.message,
                    "Skipped submission"
                );
            }
        }
    }
}

impl Default for ExportSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_summary_creation() {
        let summary = ExportSummary::new();

        assert_eq!(summary.candidates, 0);
        assert_eq!(summary.exported, 0);
        assert_eq!(summary.skipped, 0);
        assert!(!summary.interrupted);
        assert!(summary.errors.is_empty());
        assert_eq!(summary.outcome(), ExportOutcome::AllExported);
    }

    #[test]
    fn test_export_summary_with_duration() {
        let summary = ExportSummary::new().with_duration(Duration::from_secs(120));
        assert_eq!(summary.duration, Duration::from_secs(120));
    }

    #[test]
    fn test_add_error_counts_skip() {
        let mut summary = ExportSummary::new();
        summary.candidates = 10;
        summary.exported = 9;
        summary.add_error(ExportErrorDetail::new("Unparsable").with_path("instances/a"));

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors[0].path.as_deref(), Some("instances/a"));
        assert_eq!(summary.outcome(), ExportOutcome::SomeSkipped);
    }

    #[test]
    fn test_success_rate() {
        let mut summary = ExportSummary::new();
        summary.candidates = 10;
        summary.exported = 6;
        assert_eq!(summary.success_rate(), 60.0);

        summary.candidates = 0;
        assert_eq!(summary.success_rate(), 100.0);
    }
}
