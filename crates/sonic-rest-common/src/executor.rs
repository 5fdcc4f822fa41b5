//! Sequential request execution.
//!
//! Requests produced by a resource manager depend on each other (a pool
//! must exist before a profile that references it), so they are applied
//! one at a time, in order, and the first failure stops the run.

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::error::RestError;
use crate::request::{Method, RestRequest};
use crate::transport::Transport;

/// A request the device refused, with its position in the list.
///
/// Requests before `index` were applied; the request at `index` and
/// everything after it were not.
#[derive(Debug, Error)]
#[error("Request #{index} ({method} {path}) failed: {source}")]
pub struct ExecuteError {
    /// Zero-based index of the failed request.
    pub index: usize,
    /// Method of the failed request.
    pub method: Method,
    /// Path of the failed request.
    pub path: String,
    /// The underlying transport or device error.
    #[source]
    pub source: RestError,
}

impl ExecuteError {
    /// Number of requests applied before the failure.
    pub fn applied(&self) -> usize {
        self.index
    }
}

/// Executes `requests` one after another.
///
/// Returns the number of applied requests. Stops at the first failure;
/// there is no retry and no rollback of requests already applied.
#[instrument(skip_all, fields(count = requests.len()))]
pub async fn execute_sequentially<T>(
    transport: &T,
    requests: &[RestRequest],
) -> Result<usize, ExecuteError>
where
    T: Transport + ?Sized,
{
    for (index, request) in requests.iter().enumerate() {
        info!("Executing request #{}: {}", index, request);

        if let Err(source) = transport.execute(request).await {
            error!("Request #{} {} failed: {}", index, request, source);
            return Err(ExecuteError {
                index,
                method: request.method,
                path: request.path.clone(),
                source,
            });
        }
    }

    Ok(requests.len())
}
