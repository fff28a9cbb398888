//! Core export pipeline
//!
//! # Modules
//!
//! - [`crypto`] - Key unwrapping, per-file ciphers and signature digests
//! - [`parse`] - Submission discovery, parsing and decryption
//! - [`model`] - Form schema tree and column naming
//! - [`transform`] - Field-to-cell mapping, media and audit side effects
//! - [`export`] - Orchestration, table aggregation and writing
//! - [`verification`] - MD5 and CRC32 helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use formex::config::load_config;
//! use formex::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("formex.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let mut coordinator = ExportCoordinator::from_config(&config, shutdown_rx)?;
//! let summary = coordinator.execute_export().await?;
//!
//! println!("Exported {} of {}", summary.exported, summary.candidates);
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod export;
pub mod model;
pub mod parse;
pub mod transform;
pub mod verification;
