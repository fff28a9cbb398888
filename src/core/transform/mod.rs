//! Field-to-CSV mapping engine
//!
//! Converts submissions into encoded CSV rows following the form's schema:
//!
//! - [`encode`] - Cell quoting rules
//! - [`dates`] - Medium date/time rendering
//! - [`mappers`] - Per data type dispatch, main and repeat rows
//! - [`media`] - Attachment copying with content de-duplication
//! - [`audit`] - Audit log aggregation

pub mod audit;
pub mod dates;
pub mod encode;
pub mod mappers;
pub mod media;

pub use audit::{AuditLines, AuditSink};
pub use encode::encode;
pub use mappers::{FieldMapper, MappingOptions};
pub use media::MediaStore;
