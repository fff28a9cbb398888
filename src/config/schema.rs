//! Configuration schema types

use crate::core::parse::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Main Formex configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormexConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// The form to export
    pub form: FormConfig,

    /// Export settings
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FormexConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value found
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.form.validate()?;
        self.export.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where the form and its submissions live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// XForm definition file
    pub definition: String,

    /// Form directory holding the `instances` directory
    pub submissions_dir: String,

    /// PEM private key, required for encrypted forms
    #[serde(default)]
    pub private_key_file: Option<String>,
}

impl FormConfig {
    fn validate(&self) -> Result<(), String> {
        if self.definition.trim().is_empty() {
            return Err("form.definition cannot be empty".to_string());
        }
        if self.submissions_dir.trim().is_empty() {
            return Err("form.submissions_dir cannot be empty".to_string());
        }
        if let Some(key) = &self.private_key_file {
            if key.trim().is_empty() {
                return Err("form.private_key_file cannot be empty when set".to_string());
            }
        }
        Ok(())
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output directory, created when missing
    pub export_dir: String,

    /// Base name of the output files (defaults to the form name)
    #[serde(default)]
    pub export_filename: Option<String>,

    /// First submission date to export, inclusive (`"YYYY-MM-DD"`)
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Last submission date to export, inclusive
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// Copy attachments into `media/`
    #[serde(default = "default_true")]
    pub export_media: bool,

    /// Replace existing output files instead of appending to them
    #[serde(default)]
    pub overwrite_files: bool,

    /// Emit one column per choice of select-multiple fields
    #[serde(default)]
    pub split_select_multiples: bool,

    /// Write `<base>.geojson` with the spatial fields
    #[serde(default)]
    pub include_geojson: bool,

    /// Number of submissions processed concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.export_dir.trim().is_empty() {
            return Err("export.export_dir cannot be empty".to_string());
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(format!(
                    "export.start_date ({start}) must not be after export.end_date ({end})"
                ));
            }
        }

        if self.parallelism == 0 || self.parallelism > 256 {
            return Err(format!(
                "export.parallelism must be between 1 and 256, got {}",
                self.parallelism
            ));
        }

        Ok(())
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
