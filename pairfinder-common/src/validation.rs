//! Configuration validation for pair finder services.
//!
//! Provides validation logic for configuration fields to ensure
//! all required values are present and within valid ranges.

use thiserror::Error;

use crate::config::{
    Config, ExchangeEndpointConfig, ObservabilityConfig, ScreenerConfig, ServiceConfig,
};

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Shorthand for an [`ValidationError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Collapse a list of errors into a single result.
    pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Names of every field mentioned by this error.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidValue { field, .. } => vec![field.as_str()],
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.fields()).collect(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.service.validate() {
            errors.push(e);
        }
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }
        if let Err(e) = self.screener.validate() {
            errors.push(e);
        }
        for (name, endpoint) in self.exchanges.iter() {
            if let Err(e) = validate_endpoint(name, endpoint) {
                errors.push(e);
            }
        }

        if self.screener.timeout_secs >= self.service.request_timeout_secs {
            errors.push(ValidationError::invalid(
                "screener.timeout_secs",
                format!(
                    "must be less than service.request_timeout_secs ({})",
                    self.service.request_timeout_secs
                ),
            ));
        }

        if !self.exchanges.iter().any(|(_, e)| e.enabled) {
            errors.push(ValidationError::invalid(
                "exchanges",
                "at least one exchange must be enabled",
            ));
        }

        ValidationError::collect(errors)
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.host.is_empty() {
            return Err(ValidationError::MissingField {
                field: "service.host".into(),
            });
        }
        if self.port == 0 {
            return Err(ValidationError::invalid(
                "service.port",
                "must be between 1 and 65535",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::invalid(
                "service.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        if !["json", "pretty"].contains(&self.log_format.as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_format",
                "must be 'json' or 'pretty'",
            ));
        }
        Ok(())
    }
}

impl Validate for ScreenerConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.exchanges.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "screener.exchanges".into(),
            });
        }
        if !self.min_volume.is_finite() || self.min_volume < 0.0 {
            errors.push(ValidationError::invalid(
                "screener.min_volume",
                "must be a finite number >= 0",
            ));
        }
        if self.max_candidates == 0 {
            errors.push(ValidationError::invalid(
                "screener.max_candidates",
                "must be at least 1",
            ));
        }
        if self.limit == 0 {
            errors.push(ValidationError::invalid("screener.limit", "must be at least 1"));
        }
        if self.history_days == 0 {
            errors.push(ValidationError::invalid(
                "screener.history_days",
                "must be at least 1",
            ));
        }
        if self.concurrency == 0 {
            errors.push(ValidationError::invalid(
                "screener.concurrency",
                "must be at least 1",
            ));
        }
        if self.timeout_secs == 0 {
            errors.push(ValidationError::invalid(
                "screener.timeout_secs",
                "must be greater than 0",
            ));
        }

        ValidationError::collect(errors)
    }
}

fn validate_endpoint(name: &str, endpoint: &ExchangeEndpointConfig) -> ValidationResult<()> {
    if !endpoint.enabled {
        return Ok(());
    }
    if endpoint.rate_limit_rpm == Some(0) {
        return Err(ValidationError::invalid(
            format!("exchanges.{}.rate_limit_rpm", name),
            "must be greater than 0",
        ));
    }
    if endpoint.request_timeout_secs == 0 {
        return Err(ValidationError::invalid(
            format!("exchanges.{}.request_timeout_secs", name),
            "must be greater than 0",
        ));
    }
    if let Some(ref url) = endpoint.base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ValidationError::invalid(
                format!("exchanges.{}.base_url", name),
                "must start with http:// or https://",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.observability.log_level = "loud".into();
        let err = config.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["observability.log_level"]);
    }

    #[test]
    fn test_screener_collects_every_error() {
        let config = ScreenerConfig {
            exchanges: vec![],
            min_volume: -1.0,
            limit: 0,
            ..ScreenerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ValidationError::Multiple(ref e) if e.len() == 3));
        assert!(err.fields().contains(&"screener.min_volume"));
    }

    #[test]
    fn test_nan_min_volume_rejected() {
        let config = ScreenerConfig {
            min_volume: f64::NAN,
            ..ScreenerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = Config::default();
        config.exchanges.okx.rate_limit_rpm = Some(0);
        let err = config.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["exchanges.okx.rate_limit_rpm"]);
    }

    #[test]
    fn test_disabled_endpoint_not_validated() {
        let mut config = Config::default();
        config.exchanges.bitunix.enabled = false;
        config.exchanges.bitunix.base_url = Some("ftp://nope".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_exchanges_disabled() {
        let mut config = Config::default();
        config.exchanges.bybit.enabled = false;
        config.exchanges.okx.enabled = false;
        config.exchanges.bitunix.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_screen_timeout_must_fit_request_timeout() {
        let mut config = Config::default();
        config.screener.timeout_secs = config.service.request_timeout_secs;
        let err = config.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["screener.timeout_secs"]);

        config.screener.timeout_secs = u64::MAX;
        assert!(config.validate().is_err());

        config.screener.timeout_secs = config.service.request_timeout_secs - 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_base_url() {
        let mut config = Config::default();
        config.exchanges.bybit.base_url = Some("api.bybit.com".into());
        assert!(config.validate().is_err());
    }
}
