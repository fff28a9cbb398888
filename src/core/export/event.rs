//! Export lifecycle: states, outcome and progress events

use std::fmt;

/// How many of the candidate submissions made it into the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    AllExported,
    SomeSkipped,
    AllSkipped,
}

impl ExportOutcome {
    /// Classifies an export from its counters
    ///
    /// An export without candidates counts as fully exported.
    pub fn from_counts(candidates: usize, exported: usize) -> Self {
        if exported == candidates {
            ExportOutcome::AllExported
        } else if exported == 0 {
            ExportOutcome::AllSkipped
        } else {
            ExportOutcome::SomeSkipped
        }
    }
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportOutcome::AllExported => write!(f, "all submissions exported"),
            ExportOutcome::SomeSkipped => write!(f, "some submissions skipped"),
            ExportOutcome::AllSkipped => write!(f, "all submissions skipped"),
        }
    }
}

/// State of an export run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    NotStarted,
    Running,
    Completed(ExportOutcome),
    /// A fatal error stopped the export before any table was written
    Aborted,
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Completed(_) | ExportState::Aborted)
    }
}

/// Notifications sent to whoever drives an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Started { candidates: usize },
    Progress { processed: usize, candidates: usize },
    SubmissionSkipped { path: String, reason: String },
    Completed { outcome: ExportOutcome },
    Interrupted { processed: usize, candidates: usize },
    Failed { reason: String },
}

/// Completions between two progress events: one tenth of the candidates
pub fn progress_step(candidates: usize) -> usize {
    (candidates / 10).max(1)
}
