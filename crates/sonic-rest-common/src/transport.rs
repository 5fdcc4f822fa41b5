//! Device transport abstraction.
//!
//! Resource managers never speak HTTP themselves. The caller injects a
//! [`Transport`] that knows how to reach the device (session, credentials,
//! TLS) and the managers only hand it paths and [`RestRequest`]s.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RestResult;
use crate::request::RestRequest;

/// Connection to a device REST interface.
///
/// # Example
///
/// ```ignore
/// use sonic_rest_common::{RestRequest, RestResult, Transport};
///
/// struct HttpTransport { /* client, base url */ }
///
/// #[async_trait]
/// impl Transport for HttpTransport {
///     async fn fetch(&self, path: &str) -> RestResult<Option<Value>> {
///         // GET, map 404 to Ok(None)
///     }
///
///     async fn execute(&self, request: &RestRequest) -> RestResult<()> {
///         // PATCH / DELETE, map non-2xx to RestError::DeviceRequest
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reads the document at `path`.
    ///
    /// Returns `Ok(None)` when the device reports the resource absent
    /// (404-equivalent). Absence is not an error.
    async fn fetch(&self, path: &str) -> RestResult<Option<Value>>;

    /// Applies one request to the device.
    ///
    /// A non-2xx answer must be reported as
    /// [`RestError::DeviceRequest`](crate::RestError::DeviceRequest).
    async fn execute(&self, request: &RestRequest) -> RestResult<()>;
}
