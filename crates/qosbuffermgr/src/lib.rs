//! QoS Buffer Manager - buffer pool and profile reconciliation
//!
//! qosbuffermgr reconciles a declared set of QoS buffer pools and buffer
//! profiles against a device exposing the OpenConfig QoS buffer tree over
//! REST (`/data/openconfig-qos:qos/buffer`).
//!
//! Key features:
//! - Parse the device buffer container into typed pools and profiles
//! - Diff desired vs. device state in merged, replaced, overridden and
//!   deleted modes
//! - Keep static and dynamic thresholds mutually exclusive on the device
//! - Compile the diff into an ordered list of PATCH/DELETE requests,
//!   encoding each leaf as the device schema declares it
//! - Apply the list sequentially through an injected transport
//!
//! # Example
//!
//! ```ignore
//! use sonic_qosbuffermgr::{BufferTask, QosBufferConfig, QosBufferMgr};
//!
//! let task = BufferTask::from_yaml_file("qos_buffer.yaml")?;
//! let mgr = QosBufferMgr::new(QosBufferConfig::default());
//! let outcome = mgr.reconcile(&transport, &task.config, task.state).await?;
//! ```

pub mod compile;
pub mod config;
pub mod diff;
pub mod error;
pub mod facts;
pub mod paths;
pub mod qos_buffer_mgr;
pub mod tables;
pub mod types;

pub use compile::{compile, Batching};
pub use config::{BufferTask, QosBufferConfig};
pub use diff::{diff, ChangeRecord};
pub use error::{QosBufferError, QosBufferResult};
pub use facts::{fetch_buffer_config, parse_buffer_config};
pub use paths::{build_path, Container};
pub use qos_buffer_mgr::{QosBufferMgr, ReconcileOutcome, ReconcilePlan};
pub use tables::{Field, ResourceKind};
pub use types::{
    BufferConfig, BufferPool, BufferProfile, BufferProfileSpec, DesiredConfig, FieldValue, Mode,
    Threshold,
};
