//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DispatchConfig, HeraldConfig, LogOutput, LoggingConfig, RuntimeConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HeraldConfig) -> ConfigResult<()> {
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    validate_runtime_config(&config.runtime)?;
    Ok(())
}

fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.policy.accepts_text() {
        if dispatch.prefix.is_empty() {
            return Err(ConfigError::validation(
                "Prefix must not be empty when text commands are accepted",
            ));
        }
        if dispatch.prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation("Prefix cannot contain whitespace"));
        }
    }

    if dispatch.help_labels.is_empty() {
        return Err(ConfigError::validation("At least one help label is required"));
    }
    if let Some(label) = dispatch
        .help_labels
        .iter()
        .find(|l| l.is_empty() || l.chars().any(char::is_whitespace))
    {
        return Err(ConfigError::validation(format!(
            "Invalid help label: '{label}'"
        )));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        if logging.file_path.is_none() {
            return Err(ConfigError::validation(
                "File output requires logging.file_path",
            ));
        }
        if logging.max_files == 0 {
            return Err(ConfigError::validation(
                "logging.max_files must be greater than 0",
            ));
        }
    }
    Ok(())
}

fn validate_runtime_config(runtime: &RuntimeConfig) -> ConfigResult<()> {
    if runtime.max_in_flight == 0 {
        return Err(ConfigError::validation(
            "runtime.max_in_flight must be greater than 0",
        ));
    }
    Ok(())
}
