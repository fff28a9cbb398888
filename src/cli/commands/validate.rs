//! Validate config command implementation
//!
//! Loads the configuration, then the form definition and private key it
//! names, and reports what an export would do.

use crate::adapters::{load_form_definition, load_private_key};
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("Configuration file loaded and valid");
                c
            }
            Err(e) => {
                println!("Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let form = match load_form_definition(&config.form.definition) {
            Ok(form) => form,
            Err(e) => {
                println!("Failed to load form definition");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Some(key_file) = &config.form.private_key_file {
            if let Err(e) = load_private_key(key_file) {
                println!("Failed to load private key");
                println!("   Error: {e}");
                return Ok(2);
            }
        } else if form.requires_private_key() {
            println!("Form {} is encrypted but no private key is configured", form.form_id);
            return Ok(2);
        }

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Form: {} ({})", form.name, form.form_id);
        if let Some(version) = &form.version {
            println!("  Form Version: {version}");
        }
        println!("  Encrypted: {}", form.encrypted);
        println!("  Encrypted Fields: {}", form.field_encrypted);
        println!("  Repeat Groups: {}", form.model.repeatable_fields().len());
        println!("  Submissions: {}", config.form.submissions_dir);
        println!("  Export Directory: {}", config.export.export_dir);
        let range = config.export.date_range();
        if !range.is_unbounded() {
            println!(
                "  Date Range: {} to {}",
                range.start.map_or("-".to_string(), |d| d.to_string()),
                range.end.map_or("-".to_string(), |d| d.to_string())
            );
        }
        println!("  Export Media: {}", config.export.export_media);
        println!("  Overwrite Files: {}", config.export.overwrite_files);
        println!("  GeoJSON: {}", config.export.include_geojson);
        println!("  Parallelism: {}", config.export.parallelism);
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_is_configuration_error() {
        let args = ValidateArgs {};
        let code = args.execute("no-such-formex.toml").await.unwrap();
        assert_eq!(code, 2);
    }
}
