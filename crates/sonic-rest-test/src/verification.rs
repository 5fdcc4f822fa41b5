//! Verification helpers for testing resource managers
//!
//! Provides assertion helpers over the requests a device received.

use sonic_rest_common::{Method, RestRequest};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected {method} {path} was not sent; sent: {sent}")]
    RequestNotSent {
        method: Method,
        path: String,
        sent: String,
    },

    #[error("Unexpected {method} {path} was sent")]
    UnexpectedRequest { method: Method, path: String },

    #[error("Expected {expected} requests, found {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Request order mismatch: expected {expected}, got {actual}")]
    OrderMismatch { expected: String, actual: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Request log verifier
pub struct RequestVerifier {
    requests: Vec<RestRequest>,
}

impl RequestVerifier {
    /// Create a new request verifier
    pub fn new(requests: Vec<RestRequest>) -> Self {
        Self { requests }
    }

    fn sent(&self, method: Method, path: &str) -> bool {
        self.requests
            .iter()
            .any(|r| r.method == method && r.path == path)
    }

    fn summary(&self) -> String {
        self.requests
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Verify that a request was sent
    pub fn assert_sent(&self, method: Method, path: &str) -> VerifyResult<()> {
        if self.sent(method, path) {
            Ok(())
        } else {
            Err(VerificationError::RequestNotSent {
                method,
                path: path.to_string(),
                sent: self.summary(),
            })
        }
    }

    /// Verify that a request was NOT sent
    pub fn assert_not_sent(&self, method: Method, path: &str) -> VerifyResult<()> {
        if self.sent(method, path) {
            Err(VerificationError::UnexpectedRequest {
                method,
                path: path.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Verify the number of requests sent
    pub fn assert_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.requests.len();
        if actual != expected {
            Err(VerificationError::CountMismatch { expected, actual })
        } else {
            Ok(())
        }
    }

    /// Verify the exact method and path sequence
    pub fn assert_sequence(&self, expected: &[(Method, &str)]) -> VerifyResult<()> {
        let actual: Vec<(Method, &str)> = self
            .requests
            .iter()
            .map(|r| (r.method, r.path.as_str()))
            .collect();
        if actual != expected {
            return Err(VerificationError::OrderMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", actual),
            });
        }
        Ok(())
    }

    /// Verify that every DELETE precedes every PATCH
    pub fn assert_deletes_first(&self) -> VerifyResult<()> {
        let first_patch = self.requests.iter().position(|r| !r.is_delete());
        let last_delete = self.requests.iter().rposition(|r| r.is_delete());
        match (first_patch, last_delete) {
            (Some(patch), Some(delete)) if delete > patch => Err(VerificationError::OrderMismatch {
                expected: "deletes before patches".to_string(),
                actual: self.summary(),
            }),
            _ => Ok(()),
        }
    }

    /// Get all captured requests
    pub fn requests(&self) -> &[RestRequest] {
        &self.requests
    }
}
