//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_file() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:5001"
            enforce_ssl = true

            [credentials.alice]
            secret = "s3cret"
            deprecated = true

            [metadata]
            id = "metadata@123"
            field_keys = ["index"]

            [outlet]
            capacity = 10
            deliver_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert!(config.listener.enforce_ssl);
        assert_eq!(config.outlet.capacity, 10);
        assert!(config.credentials["alice"].deprecated);
        assert_eq!(config.metadata.field_keys, vec!["index".to_string()]);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = parse_config("[outlet]\ncapacity = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref v) if v.len() == 1));
        assert_eq!(
            err.to_string(),
            "Validation failed: outlet.capacity must be at least 1"
        );
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        assert!(matches!(
            parse_config("[outlet\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/gateway.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
