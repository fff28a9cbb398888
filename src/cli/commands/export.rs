//! Export command implementation
//!
//! This module implements the `export` command, which turns a form's
//! submissions into CSV tables.

use crate::config::{load_config, FormexConfig};
use crate::core::export::{ExportCoordinator, ExportEvent, ExportOutcome, ExportSummary};
use crate::domain::FormexError;
use chrono::NaiveDate;
use clap::Args;
use tokio::sync::{mpsc, watch};

/// Exit codes of the export command
pub mod exit_code {
    pub const ALL_EXPORTED: i32 = 0;
    pub const SOME_SKIPPED: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const ALL_SKIPPED: i32 = 3;
    pub const FATAL: i32 = 5;
    pub const INTERRUPTED: i32 = 130;
}

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Override the export directory
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<String>,

    /// Only export submissions on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<NaiveDate>,

    /// Only export submissions on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    /// Replace existing output files instead of appending
    #[arg(long)]
    pub overwrite: bool,

    /// Export attachment file names without copying the files
    #[arg(long)]
    pub no_media: bool,
}

impl ExportArgs {
    /// Applies the command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut FormexConfig) {
        if let Some(export_dir) = &self.export_dir {
            tracing::info!(export_dir = %export_dir, "Overriding export directory from CLI");
            config.export.export_dir = export_dir.clone();
        }
        if let Some(start) = self.start_date {
            tracing::info!(start_date = %start, "Overriding start date from CLI");
            config.export.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            tracing::info!(end_date = %end, "Overriding end date from CLI");
            config.export.end_date = Some(end);
        }
        if self.overwrite {
            tracing::info!("Enabling overwrite from CLI");
            config.export.overwrite_files = true;
        }
        if self.no_media {
            tracing::info!("Disabling media export from CLI");
            config.export.export_media = false;
        }
    }

    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("{e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(exit_code::CONFIGURATION);
        }

        let coordinator = match ExportCoordinator::from_config(&config, shutdown_signal) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize export");
                eprintln!("Failed to initialize export: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(print_progress(events_rx));
        let mut coordinator = coordinator.with_events(events_tx);

        println!(
            "Exporting {} to {}",
            coordinator.form().name,
            config.export.export_dir
        );
        println!();

        let result = coordinator.execute_export().await;
        // The coordinator owns the sender; dropping it ends the printer
        drop(coordinator);
        let _ = printer.await;

        let summary = match result {
            Ok(summary) => summary,
            Err(e @ FormexError::Configuration(_)) => {
                eprintln!("Export aborted: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
            Err(e) => {
                eprintln!("Export failed: {e}");
                return Ok(exit_code::FATAL);
            }
        };

        summary.log_summary();
        print_summary(&summary);

        Ok(exit_code_for(&summary))
    }
}

/// Maps a finished export to the process exit code
pub fn exit_code_for(summary: &ExportSummary) -> i32 {
    if summary.interrupted {
        return exit_code::INTERRUPTED;
    }
    match summary.outcome() {
        ExportOutcome::AllExported => exit_code::ALL_EXPORTED,
        ExportOutcome::SomeSkipped => exit_code::SOME_SKIPPED,
        ExportOutcome::AllSkipped => exit_code::ALL_SKIPPED,
    }
}

async fn print_progress(mut events: mpsc::UnboundedReceiver<ExportEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ExportEvent::Started { candidates } => {
                println!("Found {candidates} submissions to export");
            }
            ExportEvent::Progress {
                processed,
                candidates,
            } => {
                println!("  {processed}/{candidates} submissions processed");
            }
            ExportEvent::SubmissionSkipped { path, reason } => {
                println!("  skipped {path}: {reason}");
            }
            ExportEvent::Interrupted {
                processed,
                candidates,
            } => {
                println!("Interrupted after {processed} of {candidates} submissions");
            }
            ExportEvent::Completed { outcome } => {
                println!("Export completed: {outcome}");
            }
            ExportEvent::Failed { reason } => {
                println!("Export failed: {reason}");
            }
        }
    }
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("Export Summary:");
    println!("  Candidates: {}", summary.candidates);
    println!("  Exported: {}", summary.exported);
    println!("  Skipped: {}", summary.skipped);
    if summary.invalid_signatures > 0 {
        println!("  Invalid signatures: {}", summary.invalid_signatures);
    }
    if summary.not_started > 0 {
        println!("  Not started: {}", summary.not_started);
    }
    if let Some(last) = summary.last_exported_date {
        println!("  Last exported submission: {}", last.to_rfc3339());
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    println!();

    if !summary.tables_written.is_empty() {
        println!("Files written:");
        for table in &summary.tables_written {
            println!("  {table}");
        }
        println!();
    }

    if summary.interrupted {
        println!("Export interrupted. Rows of the submissions already processed were written.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const MINIMAL: &str = r#"
[form]
definition = "forms/household.xml"
submissions_dir = "forms/household"

[export]
export_dir = "out"
"#;

    #[test]
    fn test_apply_overrides() {
        let mut config = FormexConfig::from_toml_str(MINIMAL).unwrap();
        let args = ExportArgs {
            export_dir: Some("elsewhere".to_string()),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            end_date: None,
            overwrite: true,
            no_media: true,
        };

        args.apply_overrides(&mut config);

        assert_eq!(config.export.export_dir, "elsewhere");
        assert_eq!(config.export.start_date, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert!(config.export.overwrite_files);
        assert!(!config.export.export_media);
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let mut config = FormexConfig::from_toml_str(MINIMAL).unwrap();
        ExportArgs::default().apply_overrides(&mut config);
        assert_eq!(config.export.export_dir, "out");
        assert!(config.export.export_media);
    }

    #[test_case(10, 10, false, 0)]
    #[test_case(10, 6, false, 1)]
    #[test_case(10, 0, false, 3)]
    #[test_case(10, 4, true, 130)]
    fn test_exit_codes(candidates: usize, exported: usize, interrupted: bool, expected: i32) {
        let mut summary = ExportSummary::new();
        summary.candidates = candidates;
        summary.exported = exported;
        summary.interrupted = interrupted;
        assert_eq!(exit_code_for(&summary), expected);
    }
}
