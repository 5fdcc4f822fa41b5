//! Common REST plumbing for SONiC OpenConfig resource managers.
//!
//! This crate provides the pieces every resource manager shares:
//!
//! - [`RestRequest`] / [`Method`]: the operations a manager emits
//! - [`Transport`]: the injected connection to the device
//! - [`execute_sequentially`]: ordered execution with stop-on-first-failure
//! - [`error`]: error types for device and transport failures
//!
//! # Architecture
//!
//! Resource managers follow this pattern:
//!
//! 1. Fetch the current resource document through the [`Transport`]
//! 2. Diff it against the desired configuration (pure, no I/O)
//! 3. Compile the diff into an ordered list of [`RestRequest`]s
//! 4. Hand the list to [`execute_sequentially`]
//!
//! # Example
//!
//! ```ignore
//! use sonic_rest_common::{execute_sequentially, RestRequest, Transport};
//!
//! async fn apply(transport: &impl Transport) -> Result<(), ExecuteError> {
//!     let requests = vec![RestRequest::delete(
//!         "/data/openconfig-qos:qos/buffer/buffer-profiles/buffer-profile=p1",
//!     )];
//!     execute_sequentially(transport, &requests).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod executor;
pub mod request;
pub mod transport;

// Re-export commonly used items at crate root
pub use error::{RestError, RestResult};
pub use executor::{execute_sequentially, ExecuteError};
pub use request::{Method, RestRequest};
pub use transport::Transport;
