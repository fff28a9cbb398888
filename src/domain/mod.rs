//! Domain models and types for Formex.
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`FormId`], [`InstanceId`])
//! - **Submissions** ([`Submission`], [`SubmissionMetaData`], [`ValidationStatus`])
//! - **A navigable XML tree** ([`XmlDocument`], [`XmlElement`])
//! - **Error types** ([`FormexError`], [`SubmissionError`], [`CryptoError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible library operations return [`Result<T, FormexError>`]:
//!
//! ```rust
//! use formex::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = formex::config::FormexConfig::from_toml_str("")?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod errors;
pub mod ids;
pub mod result;
pub mod submission;
pub mod xml;

pub use errors::{CryptoError, ExportErrorDetail, FormexError, SubmissionError};
pub use ids::{FormId, InstanceId};
pub use result::Result;
pub use submission::{Submission, SubmissionMetaData, ValidationStatus};
pub use xml::{XmlDocument, XmlElement};
