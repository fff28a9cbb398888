//! Audit log aggregation
//!
//! Each submission may attach an `audit.csv` event log. All of them are
//! concatenated into `<base> - audit.csv`, every row prefixed with the row key
//! of the submission it came from. Rows are collected per submission as
//! [`AuditLines`] fragments and only reach the file once every submission has
//! been mapped, so a submission dropped later leaves no audit rows behind.

use crate::core::export::lines::{CsvLine, CsvLines};
use crate::domain::context::ResultExt;
use crate::domain::errors::SubmissionError;
use crate::domain::submission::checked_file_name;
use crate::domain::Result;
use chrono::{DateTime, FixedOffset};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const KEY_COLUMN: &str = "instance ID";

/// Audit rows of one or more submissions, not yet written
#[derive(Debug, Clone, Default)]
pub struct AuditLines {
    header: Option<String>,
    lines: CsvLines,
}

impl AuditLines {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn lines(&self) -> &CsvLines {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Concatenates two fragments; the first header seen wins
    pub fn merge(self, other: AuditLines) -> AuditLines {
        AuditLines {
            header: self.header.or(other.header),
            lines: self.lines.merge(other.lines),
        }
    }
}

/// Reads the audit log `file_name` attached to a submission
///
/// A log that is not on disk yields an empty fragment. A name that is not a
/// plain file name is rejected.
pub fn read_audit_log(
    working_dir: &Path,
    file_name: &str,
    row_key: &str,
    submission_date: Option<DateTime<FixedOffset>>,
) -> std::result::Result<AuditLines, SubmissionError> {
    let audit_file = working_dir.join(checked_file_name(working_dir, file_name)?);
    let content = match std::fs::read_to_string(&audit_file) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(file = %audit_file.display(), "Audit log not found");
            return Ok(AuditLines::empty());
        }
        Err(e) => return Err(SubmissionError::io(&audit_file, e)),
    };

    let mut rows = content.lines();
    let header = rows.next().map(|header| format!("{KEY_COLUMN},{header}"));
    let lines = rows
        .filter(|row| !row.trim().is_empty())
        .map(|row| CsvLine::new(submission_date, format!("{row_key},{row}")))
        .collect();
    Ok(AuditLines {
        header,
        lines: CsvLines::of(KEY_COLUMN, lines),
    })
}

/// Writes the aggregated audit rows of an export
#[derive(Debug)]
pub struct AuditSink {
    path: PathBuf,
    overwrite: bool,
}

impl AuditSink {
    pub fn new(path: PathBuf, overwrite: bool) -> Self {
        Self { path, overwrite }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes a previous audit file when overwriting
    pub fn prepare(&self) -> Result<()> {
        if self.overwrite && self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Appends every row ordered by submission date
    ///
    /// The header goes first when the file is missing or empty. Nothing is
    /// created when there are no rows.
    pub fn write(&self, audit: &AuditLines) -> Result<()> {
        if audit.is_empty() {
            return Ok(());
        }

        let has_content = std::fs::metadata(&self.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        if let (false, Some(header)) = (has_content, audit.header()) {
            writeln!(writer, "{header}")
                .with_context(|| format!("Failed to write header of {}", self.path.display()))?;
        }
        for line in audit.lines().sorted_by_date() {
            writeln!(writer, "{}", line.text)
                .with_context(|| format!("Failed to write {}", self.path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;

        tracing::debug!(output = %self.path.display(), rows = audit.lines().len(), "Wrote audit log");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn date(raw: &str) -> Option<DateTime<FixedOffset>> {
        Some(DateTime::parse_from_rfc3339(raw).unwrap())
    }

    fn write_log(dir: &Path, rows: &[&str]) {
        let mut content = String::from("event,node,start,end\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        fs::write(dir.join("audit.csv"), content).unwrap();
    }

    #[test]
    fn test_header_written_once_rows_by_date() {
        let temp = TempDir::new().unwrap();
        let sink = AuditSink::new(temp.path().join("form - audit.csv"), true);
        sink.prepare().unwrap();

        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_log(second.path(), &["question,/data/a,2,3", "form exit,,4,"]);
        write_log(first.path(), &["form start,,1,"]);
        let later = read_audit_log(second.path(), "audit.csv", "uuid:2", date("2021-02-02T00:00:00Z"))
            .unwrap();
        let earlier = read_audit_log(first.path(), "audit.csv", "uuid:1", date("2021-01-01T00:00:00Z"))
            .unwrap();

        sink.write(&later.merge(earlier)).unwrap();

        let output = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            output,
            "instance ID,event,node,start,end\n\
             uuid:1,form start,,1,\n\
             uuid:2,question,/data/a,2,3\n\
             uuid:2,form exit,,4,\n"
        );
    }

    #[test]
    fn test_existing_file_keeps_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("form - audit.csv");
        fs::write(&path, "instance ID,event,node,start,end\n").unwrap();

        let sink = AuditSink::new(path.clone(), false);
        sink.prepare().unwrap();
        let log = TempDir::new().unwrap();
        write_log(log.path(), &["form start,,1,"]);
        sink.write(&read_audit_log(log.path(), "audit.csv", "uuid:9", None).unwrap())
            .unwrap();

        let output = fs::read_to_string(&path).unwrap();
        assert_eq!(output.matches("instance ID").count(), 1);
        assert!(output.ends_with("uuid:9,form start,,1,\n"));
    }

    #[test]
    fn test_overwrite_removes_previous_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("form - audit.csv");
        fs::write(&path, "instance ID,event\nuuid:old,x\n").unwrap();

        let sink = AuditSink::new(path.clone(), true);
        sink.prepare().unwrap();
        sink.write(&AuditLines::empty()).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_log_is_ignored() {
        let temp = TempDir::new().unwrap();
        let audit = read_audit_log(temp.path(), "nope.csv", "uuid:1", None).unwrap();
        assert!(audit.is_empty());
        assert!(audit.header().is_none());
    }

    #[test]
    fn test_log_outside_submission_dir_is_rejected() {
        let root = TempDir::new().unwrap();
        let submission_dir = root.path().join("instances/s1");
        fs::create_dir_all(&submission_dir).unwrap();
        write_log(root.path(), &["secret,,1,"]);
        let absolute = root.path().join("audit.csv").display().to_string();

        for name in ["../../audit.csv", absolute.as_str()] {
            let err = read_audit_log(&submission_dir, name, "uuid:1", None).unwrap_err();
            assert!(matches!(err, SubmissionError::UnsafeFileName { .. }), "{name}");
        }
    }
}
