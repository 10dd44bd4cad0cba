//! Error hierarchy for Confab.
//!
//! Two surfaces, two enums: `ModelError` is returned to the caller of
//! a reply cycle; `ConfigError` is returned from configuration
//! loading. Durable-store faults have their own type in
//! `confab-history` because they are absorbed there and never cross a
//! public boundary.

use thiserror::Error;

/// The completion collaborator failed to produce a reply.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model error: {message}")]
    Upstream { message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Completion timed out")]
    Timeout,
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_display() {
        let err = ModelError::Upstream {
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "Model error: overloaded");
        assert_eq!(ModelError::Timeout.to_string(), "Completion timed out");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "history.memory_cap".into(),
            message: "must be positive".into(),
        };
        assert!(err.to_string().contains("history.memory_cap"));
    }
}
