//! Output line aggregation
//!
//! Workers produce [`CsvLines`] fragments per output table; fragments for the
//! same table are merged in any order and written once every submission has
//! been mapped.

use chrono::{DateTime, FixedOffset};

/// One encoded output row and the date of the submission it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLine {
    pub submission_date: Option<DateTime<FixedOffset>>,
    pub text: String,
}

impl CsvLine {
    pub fn new(submission_date: Option<DateTime<FixedOffset>>, text: impl Into<String>) -> Self {
        Self {
            submission_date,
            text: text.into(),
        }
    }
}

/// Lines destined for one output table
#[derive(Debug, Clone, Default)]
pub struct CsvLines {
    fqn: Option<String>,
    lines: Vec<CsvLine>,
    last_line: Option<CsvLine>,
}

impl CsvLines {
    /// A neutral fragment that merges with anything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Lines belonging to the table identified by `fqn`
    pub fn of(fqn: impl Into<String>, lines: Vec<CsvLine>) -> Self {
        let last_line = lines.iter().fold(None, |last, line| later(last, Some(line.clone())));
        Self {
            fqn: Some(fqn.into()),
            lines,
            last_line,
        }
    }

    pub fn fqn(&self) -> Option<&str> {
        self.fqn.as_deref()
    }

    pub fn lines(&self) -> &[CsvLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Chronologically last line seen so far
    pub fn last_line(&self) -> Option<&CsvLine> {
        self.last_line.as_ref()
    }

    /// Concatenates two fragments of the same table
    ///
    /// # Panics
    ///
    /// Panics when both fragments belong to different tables.
    pub fn merge(mut self, other: CsvLines) -> CsvLines {
        if let (Some(left), Some(right)) = (&self.fqn, &other.fqn) {
            assert_eq!(left, right, "cannot merge lines of different tables");
        }
        self.fqn = self.fqn.or(other.fqn);
        self.lines.extend(other.lines);
        self.last_line = later(self.last_line, other.last_line);
        self
    }

    /// Lines ordered by submission date, undated first, ties in encounter order
    pub fn sorted_by_date(&self) -> Vec<&CsvLine> {
        let mut sorted: Vec<&CsvLine> = self.lines.iter().collect();
        sorted.sort_by_key(|line| line.submission_date);
        sorted
    }
}

fn later(current: Option<CsvLine>, candidate: Option<CsvLine>) -> Option<CsvLine> {
    match (current, candidate) {
        (Some(current), Some(candidate)) => {
            if candidate.submission_date > current.submission_date {
                Some(candidate)
            } else {
                Some(current)
            }
        }
        (current, None) => current,
        (None, candidate) => candidate,
    }
}
