//! Export coordinator - main orchestrator for the export process
//!
//! Drives one export from the submission directory to finished files:
//!
//! 1. Validate the target (export directory, private key for encrypted or
//!    field-encrypted forms)
//! 2. List the candidate submissions, pre-filtered by date range
//! 3. Prepare every output table
//! 4. Parse, decrypt and map submissions on the blocking pool, merging the
//!    fragments per table as workers finish
//! 5. Write every table, then the audit log and the GeoJSON view
//!
//! Nothing is written to a table or to the audit log before every worker has
//! finished.

use super::csv::{base_file_name, Csv, TableKind};
use super::event::{progress_step, ExportEvent, ExportState};
use super::geojson::{features_for, write_feature_collection, GeoFeature};
use super::lines::CsvLines;
use super::summary::ExportSummary;
use crate::adapters::keys::load_private_key;
use crate::adapters::xform::load_form_definition;
use crate::config::FormexConfig;
use crate::core::model::FormDefinition;
use crate::core::parse::{filter_by_date_range, list_submission_files, parse_submission, DateRange};
use crate::core::transform::{AuditLines, AuditSink, FieldMapper, MappingOptions, MediaStore};
use crate::domain::errors::{ExportErrorDetail, FormexError, SubmissionError};
use crate::domain::submission::ValidationStatus;
use crate::domain::Result;
use crate::{log_export_complete, log_export_progress, log_export_start, log_submission_skipped};
use futures::stream::{self, StreamExt};
use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{mpsc, watch};

const INSTANCES_DIR: &str = "instances";

/// Everything an export needs besides the form and the key
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Form directory holding `instances/`
    pub form_dir: PathBuf,
    pub export_dir: PathBuf,
    pub export_filename: Option<String>,
    pub date_range: DateRange,
    pub export_media: bool,
    pub overwrite_files: bool,
    pub split_select_multiples: bool,
    pub include_geojson: bool,
    pub parallelism: usize,
}

impl ExportSettings {
    pub fn from_config(config: &FormexConfig) -> Self {
        Self {
            form_dir: PathBuf::from(&config.form.submissions_dir),
            export_dir: PathBuf::from(&config.export.export_dir),
            export_filename: config.export.export_filename.clone(),
            date_range: config.export.date_range(),
            export_media: config.export.export_media,
            overwrite_files: config.export.overwrite_files,
            split_select_multiples: config.export.split_select_multiples,
            include_geojson: config.export.include_geojson,
            parallelism: config.export.parallelism.max(1),
        }
    }

    fn instances_dir(&self) -> PathBuf {
        self.form_dir.join(INSTANCES_DIR)
    }

    fn mapping_options(&self) -> MappingOptions {
        MappingOptions {
            export_media: self.export_media,
            split_select_multiples: self.split_select_multiples,
        }
    }
}

/// Shared, read-only state handed to every worker
struct WorkerContext {
    form: FormDefinition,
    tables: Vec<Csv>,
    mapper: FieldMapper,
    audit_sink: AuditSink,
    private_key: Option<RsaPrivateKey>,
    include_geojson: bool,
    fragments: Mutex<HashMap<String, CsvLines>>,
    audit: Mutex<AuditLines>,
    features: Mutex<Vec<GeoFeature>>,
}

impl WorkerContext {
    /// Parses, maps and merges one submission
    ///
    /// Returns the validation status of the exported submission. Nothing is
    /// merged unless every table and the audit log mapped successfully.
    fn process(&self, path: &Path) -> std::result::Result<ValidationStatus, SubmissionError> {
        let submission = parse_submission(path, self.private_key.as_ref())?;

        if self.form.has_repeats() && submission.instance_id().is_none() {
            return Err(SubmissionError::InvalidInstanceId {
                path: path.display().to_string(),
            });
        }

        let fragments = self
            .tables
            .iter()
            .map(|table| table.map(&self.mapper, &self.form, &submission))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let audit = self.mapper.map_audit(&self.form, &submission)?;

        {
            let mut merged = self
                .fragments
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for fragment in fragments {
                let Some(fqn) = fragment.fqn().map(str::to_string) else {
                    continue;
                };
                let slot = merged.entry(fqn).or_default();
                *slot = std::mem::take(slot).merge(fragment);
            }
        }
        if !audit.is_empty() {
            let mut merged = self
                .audit
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *merged = std::mem::take(&mut *merged).merge(audit);
        }

        if self.include_geojson {
            let features = features_for(&self.form, &submission);
            if !features.is_empty() {
                self.features
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .extend(features);
            }
        }

        tracing::debug!(
            path = %path.display(),
            key = %submission.key(),
            validation = ?submission.validation_status(),
            "Submission mapped"
        );
        Ok(submission.validation_status())
    }
}

/// What happened to one candidate
enum WorkerResult {
    NotStarted,
    Exported(ValidationStatus),
    Skipped(ExportErrorDetail),
}

/// Export coordinator
pub struct ExportCoordinator {
    form: FormDefinition,
    settings: ExportSettings,
    private_key: Option<RsaPrivateKey>,
    shutdown_signal: watch::Receiver<bool>,
    events: Option<mpsc::UnboundedSender<ExportEvent>>,
    state: ExportState,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    pub fn new(
        form: FormDefinition,
        settings: ExportSettings,
        private_key: Option<RsaPrivateKey>,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Self {
        Self {
            form,
            settings,
            private_key,
            shutdown_signal,
            events: None,
            state: ExportState::NotStarted,
        }
    }

    /// Loads the form definition and private key named by the configuration
    ///
    /// # Errors
    ///
    /// Returns a form error when the definition cannot be loaded and a
    /// configuration error when the private key cannot be read.
    pub fn from_config(config: &FormexConfig, shutdown_signal: watch::Receiver<bool>) -> Result<Self> {
        let form = load_form_definition(&config.form.definition)?;
        let private_key = config
            .form
            .private_key_file
            .as_deref()
            .map(load_private_key)
            .transpose()?;

        tracing::info!(
            form_id = %form.form_id,
            name = %form.name,
            encrypted = form.encrypted,
            field_encrypted = form.field_encrypted,
            repeats = form.model.repeatable_fields().len(),
            "Loaded form definition"
        );

        Ok(Self::new(
            form,
            ExportSettings::from_config(config),
            private_key,
            shutdown_signal,
        ))
    }

    /// Sends lifecycle and progress events to `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ExportEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn form(&self) -> &FormDefinition {
        &self.form
    }

    fn emit(&self, event: ExportEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening
            let _ = events.send(event);
        }
    }

    fn abort(&mut self, error: FormexError) -> FormexError {
        tracing::error!(error = %error, "Export aborted");
        self.state = ExportState::Aborted;
        self.emit(ExportEvent::Failed {
            reason: error.to_string(),
        });
        error
    }

    /// Execute the export
    ///
    /// Submissions that fail to parse, decrypt or map are skipped and listed
    /// in the summary. A shutdown request stops new submissions from starting;
    /// the ones already running complete and their rows are written.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the export directory cannot be
    /// created or an encrypted form has no private key, and an I/O error when
    /// an output file cannot be written. The state is then
    /// [`ExportState::Aborted`].
    pub async fn execute_export(&mut self) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let mut summary = ExportSummary::new();
        self.state = ExportState::Running;

        if let Err(e) = self.validate() {
            return Err(self.abort(e));
        }

        let candidates = match self.list_candidates() {
            Ok(candidates) => candidates,
            Err(e) => return Err(self.abort(e)),
        };
        summary.candidates = candidates.len();

        let base_name = base_file_name(&self.form, self.settings.export_filename.as_deref());
        let context = match self.prepare(&base_name) {
            Ok(context) => Arc::new(context),
            Err(e) => return Err(self.abort(e)),
        };

        log_export_start!(self.form.form_id, candidates.len());
        self.emit(ExportEvent::Started {
            candidates: candidates.len(),
        });

        let total = candidates.len();
        let step = progress_step(total);
        let parallelism = self.settings.parallelism;

        let mut results = stream::iter(candidates)
            .map(|path| {
                let context = Arc::clone(&context);
                let shutdown = self.shutdown_signal.clone();
                async move {
                    if *shutdown.borrow() {
                        return (path, WorkerResult::NotStarted);
                    }
                    let worker_path = path.clone();
                    let result =
                        tokio::task::spawn_blocking(move || context.process(&worker_path)).await;
                    let result = match result {
                        Ok(Ok(status)) => WorkerResult::Exported(status),
                        Ok(Err(e)) => WorkerResult::Skipped(
                            ExportErrorDetail::new(e.to_string())
                                .with_path(path.display().to_string()),
                        ),
                        Err(e) => WorkerResult::Skipped(
                            ExportErrorDetail::new(format!("Worker failed: {e}"))
                                .with_path(path.display().to_string()),
                        ),
                    };
                    (path, result)
                }
            })
            .buffer_unordered(parallelism);

        let mut processed = 0usize;
        while let Some((path, result)) = results.next().await {
            match result {
                WorkerResult::NotStarted => {
                    summary.not_started += 1;
                    continue;
                }
                WorkerResult::Exported(status) => {
                    summary.exported += 1;
                    if status == ValidationStatus::Invalid {
                        summary.invalid_signatures += 1;
                        tracing::warn!(path = %path.display(), "Submission signature does not match");
                    }
                }
                WorkerResult::Skipped(detail) => {
                    log_submission_skipped!(path.display(), detail.message);
                    self.emit(ExportEvent::SubmissionSkipped {
                        path: path.display().to_string(),
                        reason: detail.message.clone(),
                    });
                    summary.add_error(detail);
                }
            }

            processed += 1;
            if processed % step == 0 || processed == total {
                log_export_progress!(processed, total);
                self.emit(ExportEvent::Progress {
                    processed,
                    candidates: total,
                });
            }
        }
        drop(results);

        summary.interrupted = summary.not_started > 0;
        if summary.interrupted {
            tracing::warn!(
                processed,
                not_started = summary.not_started,
                "Shutdown requested, writing rows of the submissions already processed"
            );
        }

        if let Err(e) = self.write_outputs(&context, &base_name, &mut summary) {
            return Err(self.abort(e));
        }

        let summary = summary.with_duration(start_time.elapsed());
        let outcome = summary.outcome();
        log_export_complete!(summary.exported, summary.duration);

        if summary.interrupted {
            self.emit(ExportEvent::Interrupted {
                processed,
                candidates: total,
            });
        }
        self.emit(ExportEvent::Completed { outcome });
        self.state = ExportState::Completed(outcome);

        Ok(summary)
    }

    /// Checks everything that must hold before the first submission is read
    fn validate(&self) -> Result<()> {
        std::fs::create_dir_all(&self.settings.export_dir).map_err(|e| {
            FormexError::Configuration(format!(
                "Cannot create export directory {}: {}",
                self.settings.export_dir.display(),
                e
            ))
        })?;

        if self.form.requires_private_key() && self.private_key.is_none() {
            let what = if self.form.encrypted { "is encrypted" } else { "has encrypted fields" };
            return Err(FormexError::Configuration(format!(
                "Form {} {what} but no private key was configured",
                self.form.form_id
            )));
        }

        let instances_dir = self.settings.instances_dir();
        if !instances_dir.is_dir() {
            return Err(FormexError::Configuration(format!(
                "Instances directory not found: {}",
                instances_dir.display()
            )));
        }

        Ok(())
    }

    fn list_candidates(&self) -> Result<Vec<PathBuf>> {
        let files = list_submission_files(&self.settings.instances_dir())?;
        let listed = files.len();
        let candidates = filter_by_date_range(files, &self.settings.date_range);

        tracing::info!(
            listed,
            candidates = candidates.len(),
            "Listed candidate submissions"
        );
        Ok(candidates)
    }

    /// Prepares every output table and builds the shared worker state
    fn prepare(&self, base_name: &str) -> Result<WorkerContext> {
        let export_dir = &self.settings.export_dir;
        let tables = Csv::all(
            &self.form,
            export_dir,
            base_name,
            self.settings.overwrite_files,
            self.settings.split_select_multiples,
        );
        for table in &tables {
            table.prepare()?;
        }

        let audit_sink = AuditSink::new(
            export_dir.join(format!("{base_name} - audit.csv")),
            self.settings.overwrite_files,
        );
        audit_sink.prepare()?;
        let mapper = FieldMapper::new(self.settings.mapping_options(), MediaStore::new(export_dir));

        Ok(WorkerContext {
            form: self.form.clone(),
            tables,
            mapper,
            audit_sink,
            private_key: self.private_key.clone(),
            include_geojson: self.settings.include_geojson,
            fragments: Mutex::new(HashMap::new()),
            audit: Mutex::new(AuditLines::empty()),
            features: Mutex::new(Vec::new()),
        })
    }

    fn write_outputs(
        &self,
        context: &WorkerContext,
        base_name: &str,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let mut fragments = std::mem::take(
            &mut *context
                .fragments
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );

        for table in &context.tables {
            let lines = fragments.remove(table.fqn()).unwrap_or_default();
            if table.kind() == TableKind::Main {
                summary.last_exported_date = lines.last_line().and_then(|l| l.submission_date);
            }
            table.append_lines(&lines)?;
            summary
                .tables_written
                .push(table.output().display().to_string());
        }

        let audit = std::mem::take(
            &mut *context
                .audit
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        if !audit.is_empty() {
            context.audit_sink.write(&audit)?;
            summary
                .tables_written
                .push(context.audit_sink.path().display().to_string());
        }

        if self.settings.include_geojson {
            let features = std::mem::take(
                &mut *context
                    .features
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
            );
            let output = self.settings.export_dir.join(format!("{base_name}.geojson"));
            write_feature_collection(&output, features)?;
            summary.tables_written.push(output.display().to_string());
        }

        Ok(())
    }
}
