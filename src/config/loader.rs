//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::FormexConfig;
use crate::domain::errors::FormexError;
use crate::domain::result::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`FormexConfig`]
/// 4. Applies environment variable overrides (`FORMEX_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`FormexError::Configuration`] if the file cannot be read, a
/// referenced variable is unset, the TOML is malformed or validation fails.
///
/// # Examples
///
/// ```no_run
/// use formex::config::loader::load_config;
///
/// let config = load_config("formex.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FormexConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FormexError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FormexError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut config = parse_config(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        FormexError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

impl FormexConfig {
    /// Parses and validates a configuration from TOML text
    ///
    /// `${VAR}` placeholders are substituted; `FORMEX_*` overrides are not
    /// applied.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config = parse_config(contents)?;
        config.validate().map_err(|e| {
            FormexError::Configuration(format!("Configuration validation failed: {e}"))
        })?;
        Ok(config)
    }
}

fn parse_config(contents: &str) -> Result<FormexConfig> {
    let contents = substitute_env_vars(contents)?;
    toml::from_str(&contents)
        .map_err(|e| FormexError::Configuration(format!("Failed to parse TOML: {e}")))
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid placeholder regex"))
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder_regex();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(FormexError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_parsed<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            FormexError::Configuration(format!("Invalid value for {name}: '{val}'"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_date(name: &str) -> Result<Option<NaiveDate>> {
    match std::env::var(name) {
        Ok(val) => NaiveDate::parse_from_str(val.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                FormexError::Configuration(format!(
                    "Invalid value for {name}: '{val}' (expected YYYY-MM-DD)"
                ))
            }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using the `FORMEX_*` prefix
///
/// Variables follow the pattern `FORMEX_<SECTION>_<KEY>`, for example
/// `FORMEX_EXPORT_EXPORT_DIR` or `FORMEX_FORM_PRIVATE_KEY_FILE`.
fn apply_env_overrides(config: &mut FormexConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("FORMEX_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Form overrides
    if let Ok(val) = std::env::var("FORMEX_FORM_DEFINITION") {
        config.form.definition = val;
    }
    if let Ok(val) = std::env::var("FORMEX_FORM_SUBMISSIONS_DIR") {
        config.form.submissions_dir = val;
    }
    if let Ok(val) = std::env::var("FORMEX_FORM_PRIVATE_KEY_FILE") {
        config.form.private_key_file = Some(val);
    }

    // Export overrides
    if let Ok(val) = std::env::var("FORMEX_EXPORT_EXPORT_DIR") {
        config.export.export_dir = val;
    }
    if let Ok(val) = std::env::var("FORMEX_EXPORT_EXPORT_FILENAME") {
        config.export.export_filename = Some(val);
    }
    if let Some(date) = env_date("FORMEX_EXPORT_START_DATE")? {
        config.export.start_date = Some(date);
    }
    if let Some(date) = env_date("FORMEX_EXPORT_END_DATE")? {
        config.export.end_date = Some(date);
    }
    if let Some(flag) = env_parsed("FORMEX_EXPORT_EXPORT_MEDIA")? {
        config.export.export_media = flag;
    }
    if let Some(flag) = env_parsed("FORMEX_EXPORT_OVERWRITE_FILES")? {
        config.export.overwrite_files = flag;
    }
    if let Some(flag) = env_parsed("FORMEX_EXPORT_SPLIT_SELECT_MULTIPLES")? {
        config.export.split_select_multiples = flag;
    }
    if let Some(flag) = env_parsed("FORMEX_EXPORT_INCLUDE_GEOJSON")? {
        config.export.include_geojson = flag;
    }
    if let Some(parallelism) = env_parsed("FORMEX_EXPORT_PARALLELISM")? {
        config.export.parallelism = parallelism;
    }

    // Logging overrides
    if let Some(flag) = env_parsed("FORMEX_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = flag;
    }
    if let Ok(val) = std::env::var("FORMEX_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("FORMEX_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
