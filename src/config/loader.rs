//! Configuration loader
//!
//! Reads a TOML file, expands `${VAR}` placeholders, layers `FHIRSYNC__*`
//! environment overrides on top and validates the result.

use super::schema::FhirSyncConfig;
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use config::{Config, Environment, File, FileFormat};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Prefix for environment overrides, e.g. `FHIRSYNC__SOURCE__BASE_URL`
pub const ENV_PREFIX: &str = "FHIRSYNC";

/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Checks the TOML syntax
/// 4. Layers `FHIRSYNC__<SECTION>__<KEY>` environment overrides on top
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns `SyncError::Configuration` if the file is missing or unreadable,
/// a referenced variable is unset, the TOML is malformed, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use fhirsync::config::loader::load_config;
///
/// let config = load_config("fhirsync.toml").expect("Failed to load config");
/// println!("FHIR server: {}", config.source.base_url);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FhirSyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;
    parse_config(&contents)
}

/// Builds and validates a configuration from already-substituted TOML text
pub fn parse_config(contents: &str) -> Result<FhirSyncConfig> {
    // toml gives line and column information that the layered builder loses
    toml::from_str::<toml::Table>(contents)?;

    let layered = Config::builder()
        .add_source(File::from_str(contents, FileFormat::Toml))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator(ENV_SEPARATOR),
        )
        .build()?;

    let config: FhirSyncConfig = layered.try_deserialize().map_err(|e| {
        SyncError::Configuration(format!("Failed to deserialize configuration: {e}"))
    })?;

    config.validate().map_err(|e| {
        SyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SyncError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DatabaseTarget;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("FHIRSYNC_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${FHIRSYNC_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("FHIRSYNC_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("FHIRSYNC_LOADER_MISSING_VAR");
        let input = "password = \"${FHIRSYNC_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("FHIRSYNC_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("FHIRSYNC_LOADER_COMMENTED_VAR");
        let input = "# password = \"${FHIRSYNC_LOADER_COMMENTED_VAR}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
database_target = "memory"

[source]
base_url = "https://hapi.fhir.org/baseR4"

[generator]
scripts_dir = "/opt/synthea"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.source.base_url, "https://hapi.fhir.org/baseR4");
        assert_eq!(config.database_target, DatabaseTarget::Memory);
        assert_eq!(
            config.generator.scripts_dir,
            std::path::PathBuf::from("/opt/synthea")
        );
        assert_eq!(config.generator.region, "Massachusetts");
    }

    #[test]
    fn test_parse_config_reports_toml_errors() {
        let err = parse_config("database_target = = \"memory\"").unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
    }
}
