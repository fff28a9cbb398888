//! Export orchestration and output tables
//!
//! - [`coordinator`] drives an export end to end
//! - [`csv`] and [`lines`] build, merge and write the CSV tables
//! - [`geojson`] writes the spatial view
//! - [`event`] and [`summary`] report progress and results

pub mod coordinator;
pub mod csv;
pub mod event;
pub mod geojson;
pub mod lines;
pub mod summary;

pub use coordinator::{ExportCoordinator, ExportSettings};
pub use csv::{Csv, TableKind};
pub use event::{ExportEvent, ExportOutcome, ExportState};
pub use lines::{CsvLine, CsvLines};
pub use summary::ExportSummary;
