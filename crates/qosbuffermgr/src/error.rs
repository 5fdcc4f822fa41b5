//! Error types for the QoS buffer manager.

use std::io;
use std::path::PathBuf;

use sonic_rest_common::{ExecuteError, RestError};
use thiserror::Error;

use crate::tables::ResourceKind;

/// Result type alias for QoS buffer operations.
pub type QosBufferResult<T> = Result<T, QosBufferError>;

/// Errors that can occur while reconciling buffer configuration.
#[derive(Debug, Error)]
pub enum QosBufferError {
    /// The desired configuration is internally inconsistent.
    ///
    /// Raised before any request is built; nothing reaches the device.
    #[error("Invalid {kind} '{name}': {message}")]
    Validation {
        /// Collection of the offending entry.
        kind: ResourceKind,
        /// Key of the offending entry.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// The buffer document fetched from the device could not be parsed.
    #[error("Malformed buffer document from device: {message}")]
    Facts {
        /// Error message.
        message: String,
    },

    /// Fetching device state failed.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// A compiled request was rejected; later requests were not sent.
    #[error(transparent)]
    Execute(#[from] ExecuteError),

    /// A configuration or state file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A YAML document did not match the expected shape.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON document did not match the expected shape.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl QosBufferError {
    /// Creates a validation error.
    pub fn validation(
        kind: ResourceKind,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a facts (device document) error.
    pub fn facts(message: impl Into<String>) -> Self {
        Self::Facts {
            message: message.into(),
        }
    }

    /// Creates an IO error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error was raised before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, QosBufferError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = QosBufferError::validation(
            ResourceKind::Profile,
            "profile1",
            "static_threshold and dynamic_threshold are mutually exclusive",
        );
        assert_eq!(
            err.to_string(),
            "Invalid buffer profile 'profile1': static_threshold and dynamic_threshold \
             are mutually exclusive"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_io_display() {
        let err = QosBufferError::io(
            "/etc/sonic/qos.yaml",
            io::Error::new(io::ErrorKind::NotFound, "No such file"),
        );
        assert_eq!(err.to_string(), "Failed to read /etc/sonic/qos.yaml: No such file");
        assert!(!err.is_validation());
    }
}
