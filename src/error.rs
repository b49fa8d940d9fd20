//! Error types for the flagwise library.
//!
//! Misconfiguration (bad rule parameters, missing dependencies, unreadable
//! stores) surfaces as a [`FlagError`]. Lookup misses such as an unknown
//! feature key or an unregistered rule name are not errors; they resolve to a
//! disabled verdict or a pass-through rule.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FlagError>;

/// The type of error that occurred.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A rule parameter could not be coerced to the shape its evaluator needs
    InvalidParameter,
    /// A timestamp or document could not be parsed
    ParseError,
    /// A required collaborator (store, evaluator, store list) was not supplied
    MissingDependency,
    /// A store was seeded with two features sharing a key
    DuplicateKey,
    /// A store backend failed to read its source
    Io,
    /// A store backend did not answer within its timeout
    Timeout,
    /// Invalid input provided to a constructor
    InvalidInput,
}

/// Represents an error raised while loading or evaluating features.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{error_type:?}: {message}")]
pub struct FlagError {
    /// Human-readable error message
    pub message: String,
    /// Type classification of the error
    pub error_type: ErrorType,
}

impl FlagError {
    /// Creates a new invalid parameter error.
    ///
    /// # Arguments
    /// * `message` - Description of the offending parameter
    ///
    /// # Example
    /// ```
    /// use flagwise::error::{ErrorType, FlagError};
    /// let err = FlagError::invalid_parameter("value must be numeric");
    /// assert_eq!(err.error_type, ErrorType::InvalidParameter);
    /// ```
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::InvalidParameter,
        }
    }

    /// Creates a new parse error.
    ///
    /// # Arguments
    /// * `message` - Description of what failed to parse
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::ParseError,
        }
    }

    /// Creates a new missing dependency error.
    ///
    /// # Arguments
    /// * `dependency` - Name of the collaborator that was not supplied
    pub fn missing_dependency(dependency: impl Into<String>) -> Self {
        Self {
            message: format!("Missing required dependency: {}", dependency.into()),
            error_type: ErrorType::MissingDependency,
        }
    }

    /// Creates a new duplicate key error.
    ///
    /// # Arguments
    /// * `key` - The feature key that appeared more than once
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self {
            message: format!("Duplicate feature key: {}", key.into()),
            error_type: ErrorType::DuplicateKey,
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::Io,
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::Timeout,
        }
    }

    /// Creates a new invalid input error.
    ///
    /// # Arguments
    /// * `message` - Description of why the input was invalid
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::InvalidInput,
        }
    }

    /// Converts the error to a JSON string.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error_type":"{}","message":"{}"}}"#,
                serde_json::to_string(&self.error_type).unwrap_or_default(),
                self.message
            )
        })
    }
}

impl From<std::io::Error> for FlagError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}
