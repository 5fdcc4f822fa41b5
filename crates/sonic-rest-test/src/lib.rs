//! Test infrastructure for SONiC OpenConfig resource managers
//!
//! Provides:
//! - An in-memory device speaking the REST subset managers use
//! - Failure injection per request
//! - Test fixtures for QoS buffer documents
//! - Request log verification helpers

mod device;
pub mod fixtures;
mod verification;

pub use device::MockDevice;
pub use fixtures::*;
pub use verification::*;
