//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity, worker count, timeouts)
//! - Check that grouped metadata keys are recognized keys
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// One semantic problem with a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("metadata.field_keys entry {0:?} is not in metadata.query_keys")]
    UnknownFieldKey(String),

    #[error("metadata.id {0:?} may not contain spaces, ']', '\"' or '='")]
    InvalidMetadataId(String),

    #[error("credentials.{0}: secret is empty")]
    EmptySecret(String),

    #[error("forwarder.destination is empty")]
    EmptyDestination,
}

/// Check `config`, collecting every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_body_size",
        });
    }
    if config.listener.body_timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.body_timeout_ms",
        });
    }
    if config.outlet.capacity == 0 {
        errors.push(ValidationError::Zero {
            field: "outlet.capacity",
        });
    }
    if config.outlet.forwarders == 0 {
        errors.push(ValidationError::Zero {
            field: "outlet.forwarders",
        });
    }
    if config.outlet.deliver_timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "outlet.deliver_timeout_ms",
        });
    }

    let metadata = &config.metadata;
    for key in &metadata.field_keys {
        if !metadata.query_keys.contains(key) {
            errors.push(ValidationError::UnknownFieldKey(key.clone()));
        }
    }
    if metadata
        .id
        .chars()
        .any(|c| matches!(c, ' ' | ']' | '"' | '='))
    {
        errors.push(ValidationError::InvalidMetadataId(metadata.id.clone()));
    }

    let mut users: Vec<_> = config.credentials.iter().collect();
    users.sort_by(|a, b| a.0.cmp(b.0));
    for (user, cred) in users {
        if cred.secret.is_empty() {
            errors.push(ValidationError::EmptySecret(user.clone()));
        }
    }

    if config.forwarder.destination.trim().is_empty() {
        errors.push(ValidationError::EmptyDestination);
    }
    if config.forwarder.max_attempts == 0 {
        errors.push(ValidationError::Zero {
            field: "forwarder.max_attempts",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
