//! Error types for REST resource operations.
//!
//! This module defines the error types shared by the resource manager
//! crates. All errors implement `std::error::Error` via `thiserror`.

use thiserror::Error;

use crate::request::Method;

/// Result type alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;

/// Errors that can occur while talking to a device REST interface.
#[derive(Debug, Error)]
pub enum RestError {
    /// The device rejected a request with a non-2xx status.
    #[error("Device rejected {method} {path} (status {status}): {message}")]
    DeviceRequest {
        /// Method of the rejected request.
        method: Method,
        /// Resource path of the rejected request.
        path: String,
        /// HTTP status code returned by the device.
        status: u16,
        /// Error detail reported by the device.
        message: String,
    },

    /// The request never reached the device (connection, session, timeout).
    #[error("Transport failure during {operation}: {message}")]
    Transport {
        /// The operation that failed (e.g., "fetch", "execute").
        operation: String,
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Creates a device request error.
    pub fn device_request(
        method: Method,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::DeviceRequest {
            method,
            path: path.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns the device status code, if the device answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::DeviceRequest { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RestError::DeviceRequest { status, .. } => *status >= 500,
            RestError::Transport { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RestError::device_request(
            Method::Delete,
            "/data/openconfig-qos:qos/buffer/buffer-pools/buffer-pool=p1",
            409,
            "Resource in use",
        );
        assert_eq!(
            err.to_string(),
            "Device rejected delete /data/openconfig-qos:qos/buffer/buffer-pools/buffer-pool=p1 \
             (status 409): Resource in use"
        );
    }

    #[test]
    fn test_transport_error() {
        let err = RestError::transport("fetch", "Connection refused");
        assert_eq!(
            err.to_string(),
            "Transport failure during fetch: Connection refused"
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_is_retryable() {
        assert!(RestError::device_request(Method::Patch, "/x", 503, "busy").is_retryable());
        assert!(!RestError::device_request(Method::Patch, "/x", 400, "bad").is_retryable());
        assert!(RestError::transport("execute", "timeout").is_retryable());
        assert!(!RestError::device_request(Method::Delete, "/x", 404, "missing").is_retryable());
    }
}
