//! Submission discovery, parsing and decryption
//!
//! - [`discovery`] - Enumerating `instances/*/submission.xml` and date filtering
//! - [`parser`] - Turning one submission file into a [`Submission`](crate::domain::Submission),
//!   decrypting and validating it when it is encrypted

pub mod discovery;
pub mod parser;

pub use discovery::{filter_by_date_range, list_submission_files, DateRange};
pub use parser::{parse_submission, read_submission_date};
