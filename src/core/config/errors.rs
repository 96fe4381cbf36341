//! Configuration errors and the validation trait shared by config types.

use thiserror::Error;

/// Errors raised while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// A message describing the invalid value.
        message: String,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration")]
    Parse(#[from] serde_json::Error),

    /// A configuration file could not be read.
    #[error("failed to read configuration file '{path}'")]
    Read {
        /// Path of the configuration file.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidConfig`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Validation hook for configuration types.
pub trait ConfigValidator {
    /// Checks every field and returns the first violation found.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration for this type.
    fn get_defaults() -> Self
    where
        Self: Sized;
}

/// Loading helpers available to every deserializable, validated config.
pub trait ConfigValidatorExt: ConfigValidator + serde::de::DeserializeOwned + Sized {
    /// Parses a JSON document and validates the result.
    fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file and validates the result.
    fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

impl<T> ConfigValidatorExt for T where T: ConfigValidator + serde::de::DeserializeOwned {}
