//! Submission discovery
//!
//! Submissions live one per directory under a form's `instances` directory:
//! `<form>/instances/<instanceDir>/submission.xml`.

use super::parser::read_submission_date;
use crate::domain::{FormexError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the submission file inside each instance directory
pub const SUBMISSION_FILE_NAME: &str = "submission.xml";

/// Inclusive calendar-date range over submission dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Whether the range has no bounds at all
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a submission date falls inside the range
    ///
    /// The comparison uses the calendar date in the submission's own offset.
    pub fn contains(&self, date: &DateTime<FixedOffset>) -> bool {
        let day = date.date_naive();
        self.start.map_or(true, |start| day >= start) && self.end.map_or(true, |end| day <= end)
    }
}

/// Lists every `submission.xml` under an instances directory, sorted by path
///
/// Directories without a submission file are ignored.
///
/// # Errors
///
/// Returns an error when the instances directory itself cannot be read.
pub fn list_submission_files(instances_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(instances_dir).map_err(|e| {
        FormexError::Io(format!(
            "Failed to read instances directory {}: {}",
            instances_dir.display(),
            e
        ))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .map(|dir| dir.join(SUBMISSION_FILE_NAME))
        .filter(|file| file.is_file())
        .collect();
    files.sort();

    tracing::debug!(
        instances_dir = %instances_dir.display(),
        count = files.len(),
        "Listed submission files"
    );
    Ok(files)
}

/// Keeps the submissions whose date falls inside the range
///
/// This is a cheap pre-filter run before any decryption. Submissions whose
/// date cannot be read are kept and decided on later.
pub fn filter_by_date_range(files: Vec<PathBuf>, range: &DateRange) -> Vec<PathBuf> {
    if range.is_unbounded() {
        return files;
    }

    files
        .into_iter()
        .filter(|file| match read_submission_date(file) {
            Some(date) => range.contains(&date),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_instance(root: &Path, name: &str, date: Option<&str>) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let attr = date
            .map(|d| format!(" submissionDate=\"{d}\""))
            .unwrap_or_default();
        fs::write(
            dir.join(SUBMISSION_FILE_NAME),
            format!("<data id=\"f\"{attr}><a>1</a></data>"),
        )
        .unwrap();
    }

    #[test]
    fn test_list_submission_files_sorted() {
        let temp = TempDir::new().unwrap();
        write_instance(temp.path(), "b", None);
        write_instance(temp.path(), "a", None);
        fs::create_dir_all(temp.path().join("empty")).unwrap();

        let files = list_submission_files(temp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a/submission.xml"));
        assert!(files[1].ends_with("b/submission.xml"));
    }

    #[test]
    fn test_list_submission_files_missing_dir() {
        assert!(list_submission_files(Path::new("/no/such/instances")).is_err());
    }

    #[test]
    fn test_date_range_contains() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1),
            NaiveDate::from_ymd_opt(2020, 1, 31),
        );
        let inside = DateTime::parse_from_rfc3339("2020-01-31T23:59:00Z").unwrap();
        let outside = DateTime::parse_from_rfc3339("2020-02-01T00:00:00Z").unwrap();

        assert!(range.contains(&inside));
        assert!(!range.contains(&outside));
        assert!(DateRange::default().contains(&outside));
    }

    #[test]
    fn test_filter_by_date_range_keeps_undated() {
        let temp = TempDir::new().unwrap();
        write_instance(temp.path(), "old", Some("2019-06-01T10:00:00.000Z"));
        write_instance(temp.path(), "new", Some("2021-06-01T10:00:00.000Z"));
        write_instance(temp.path(), "undated", None);

        let files = list_submission_files(temp.path()).unwrap();
        let range = DateRange::new(NaiveDate::from_ymd_opt(2020, 1, 1), None);
        let kept = filter_by_date_range(files, &range);

        assert_eq!(kept.len(), 2);
        assert!(kept.iter().any(|f| f.starts_with(temp.path().join("new"))));
        assert!(kept.iter().any(|f| f.starts_with(temp.path().join("undated"))));
    }
}
