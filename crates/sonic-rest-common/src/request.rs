//! REST operation model.
//!
//! A [`RestRequest`] is one operation against the device REST interface.
//! Resource managers produce ordered lists of them; a [`Transport`]
//! executes them.
//!
//! [`Transport`]: crate::Transport

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods used against the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Read a resource.
    Get,
    /// Update-or-create (merge) a resource.
    Patch,
    /// Remove a resource.
    Delete,
}

impl Method {
    /// Returns the method name as used in request logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Patch => "patch",
            Method::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single REST operation: method, resource path and optional JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestRequest {
    /// Resource path (e.g., `/data/openconfig-qos:qos/buffer`).
    pub path: String,
    /// HTTP method.
    pub method: Method,
    /// Request body, present for upserts only.
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RestRequest {
    /// Creates a PATCH (upsert) request.
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            method: Method::Patch,
            body: Some(body),
        }
    }

    /// Creates a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Delete,
            body: None,
        }
    }

    /// Returns true for requests that remove state from the device.
    pub fn is_delete(&self) -> bool {
        self.method == Method::Delete
    }
}

impl fmt::Display for RestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Patch.as_str(), "patch");
        assert_eq!(Method::Delete.to_string(), "delete");
    }

    #[test]
    fn test_request_serializes_like_module_output() {
        let req = RestRequest::patch("/data/x", json!({"a": "1"}));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"path": "/data/x", "method": "patch", "data": {"a": "1"}})
        );

        let del = RestRequest::delete("/data/x/y");
        assert_eq!(
            serde_json::to_value(&del).unwrap(),
            json!({"path": "/data/x/y", "method": "delete"})
        );
        assert!(del.is_delete());
    }

    #[test]
    fn test_request_display() {
        let req = RestRequest::delete("/data/x/y");
        assert_eq!(req.to_string(), "delete /data/x/y");
    }
}
