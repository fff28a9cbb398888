// Formex - Form submission export tool
// Copyright (c) 2025 Formex Contributors
// Licensed under the MIT License

//! # Formex - form submission export
//!
//! Formex turns a directory of collected XForm submissions, plain or
//! encrypted, into flat CSV tables: one main table plus one table per
//! repeating group, with optional media copies and a GeoJSON view.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Export pipeline (crypto, parsing, schema, mapping, output)
//! - [`adapters`] - Form definition and private key loaders
//! - [`domain`] - Errors, identifiers, XML and submission types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formex::config::load_config;
//! use formex::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("formex.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let mut coordinator = ExportCoordinator::from_config(&config, shutdown_rx)?;
//!     let summary = coordinator.execute_export().await?;
//!
//!     println!("Exported {} submissions", summary.exported);
//!     Ok(())
//! }
//! ```
//!
//! ## Output
//!
//! ```text
//! <export_dir>/<base>.csv              main table, sorted by submission date
//! <export_dir>/<base>-<group>.csv      one per repeating group
//! <export_dir>/<base> - audit.csv      concatenated audit logs
//! <export_dir>/<base>.geojson          spatial answers (optional)
//! <export_dir>/media/                  attachments (optional)
//! ```
//!
//! ## Error Handling
//!
//! Fatal problems surface as [`domain::FormexError`]; a submission that cannot
//! be read, decrypted or mapped is skipped and recorded in the
//! [`ExportSummary`](core::export::ExportSummary).

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
