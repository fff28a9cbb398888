//! Configuration management
//!
//! TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `FORMEX_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use formex::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("formex.toml")?;
//! println!("Exporting {} to {}", config.form.definition, config.export.export_dir);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [form]
//! definition = "forms/household.xml"
//! submissions_dir = "forms/household"
//! private_key_file = "${FORMEX_KEY_DIR}/household.pem"
//!
//! [export]
//! export_dir = "exports"
//! start_date = "2019-01-01"
//! export_media = true
//! include_geojson = false
//!
//! [logging]
//! local_enabled = true
//! local_path = "./logs"
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{ApplicationConfig, ExportConfig, FormConfig, FormexConfig, LoggingConfig};
