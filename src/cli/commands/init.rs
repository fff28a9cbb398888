//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "formex.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        if Path::new(&self.output).exists() && !self.force {
            println!("Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Point [form] at your XForm and its submissions directory");
                println!("  2. Set private_key_file if the form is encrypted");
                println!("  3. Validate configuration: formex validate-config");
                println!("  4. Run export: formex export");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Formex Configuration File

[application]
log_level = "info"

[form]
definition = "forms/household.xml"
submissions_dir = "forms/household"

[export]
export_dir = "exports"
export_media = true
overwrite_files = false

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Formex Configuration File
#
# Values may reference environment variables with ${VAR_NAME}. Any option can
# also be overridden with FORMEX_<SECTION>_<KEY>, e.g. FORMEX_EXPORT_EXPORT_DIR.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Form
# ============================================================================
[form]
# XForm definition file
definition = "forms/household.xml"

# Form directory; submissions are read from <submissions_dir>/instances/*/submission.xml
submissions_dir = "forms/household"

# PEM private key (PKCS#8 or PKCS#1), required for encrypted forms
# private_key_file = "${FORMEX_KEY_DIR}/household.pem"

# ============================================================================
# Export
# ============================================================================
[export]
# Output directory, created when missing
export_dir = "exports"

# Base name of the output files (defaults to the form title)
# export_filename = "household"

# Inclusive submission date range (YYYY-MM-DD)
# start_date = "2024-01-01"
# end_date = "2024-12-31"

# Copy attachments into <export_dir>/media
export_media = true

# Replace existing files instead of appending rows
overwrite_files = false

# One 1/0 column per choice of select-multiple questions
split_select_multiples = false

# Write <base>.geojson with geopoint, geotrace and geoshape answers
include_geojson = false

# Submissions processed concurrently (defaults to the number of CPUs)
# parallelism = 8

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local JSON file logging
local_enabled = false

# Local log directory
local_path = "./logs"

# Log rotation (daily, hourly or never)
local_rotation = "daily"
"#
        .to_string()
    }
}
