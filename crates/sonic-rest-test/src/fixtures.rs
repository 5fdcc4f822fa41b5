//! Test fixtures for OpenConfig resource managers
//!
//! Provides device documents and preloaded [`MockDevice`]s for common
//! scenarios.

use crate::MockDevice;

/// QoS buffer container fixtures
pub mod buffer_fixtures {
    use super::*;
    use serde_json::{json, Value};

    /// Root path of the QoS buffer container.
    pub const BUFFER_ROOT: &str = "/data/openconfig-qos:qos/buffer";

    /// Module-qualified name of the buffer container.
    pub const BUFFER_CONTAINER: &str = "openconfig-qos-buffer:buffer";

    /// Device with no buffer configuration.
    pub fn empty_device() -> MockDevice {
        MockDevice::new(BUFFER_ROOT, BUFFER_CONTAINER)
    }

    /// Device preloaded with `document`.
    pub fn device_with(document: Value) -> MockDevice {
        empty_device().with_document(document)
    }

    /// Path of a pool entry.
    pub fn pool_path(name: &str) -> String {
        format!("{}/buffer-pools/buffer-pool={}", BUFFER_ROOT, name)
    }

    /// Path of a profile entry.
    pub fn profile_path(name: &str) -> String {
        format!("{}/buffer-profiles/buffer-profile={}", BUFFER_ROOT, name)
    }

    /// Path of a pool config leaf.
    pub fn pool_field_path(name: &str, leaf: &str) -> String {
        format!("{}/config/{}", pool_path(name), leaf)
    }

    /// Path of a profile config leaf.
    pub fn profile_field_path(name: &str, leaf: &str) -> String {
        format!("{}/config/{}", profile_path(name), leaf)
    }

    /// Container present, no entries populated.
    pub fn unpopulated() -> Value {
        json!({ BUFFER_CONTAINER: {} })
    }

    /// Two lossless/lossy pools and three profiles.
    ///
    /// profile1 uses a static threshold with a pause threshold, profile2
    /// and profile3 use dynamic thresholds.
    pub fn populated() -> Value {
        json!({ BUFFER_CONTAINER: {
            "buffer-pools": {"buffer-pool": [
                {"name": "ingress_lossless_pool",
                 "config": {"name": "ingress_lossless_pool", "xoff": "2500000"},
                 "state": {"name": "ingress_lossless_pool", "xoff": "2500000", "size": "12766208"}},
                {"name": "egress_lossy_pool",
                 "config": {"name": "egress_lossy_pool"}}
            ]},
            "buffer-profiles": {"buffer-profile": [
                {"name": "profile1",
                 "config": {"name": "profile1", "pool": "ingress_lossless_pool", "size": "40",
                            "static-threshold": "20", "pause-threshold": "50000"}},
                {"name": "profile2",
                 "config": {"name": "profile2", "pool": "egress_lossless_pool", "size": "75",
                            "dynamic-threshold": -1}},
                {"name": "profile3",
                 "config": {"name": "profile3", "pool": "egress_lossy_pool", "size": "85",
                            "dynamic-threshold": 2}}
            ]}
        }})
    }

    /// A single profile carrying both thresholds, which a device should
    /// never report.
    pub fn conflicting_thresholds() -> Value {
        json!({ BUFFER_CONTAINER: {
            "buffer-profiles": {"buffer-profile": [
                {"name": "bad",
                 "config": {"name": "bad", "static-threshold": "1", "dynamic-threshold": 1}}
            ]}
        }})
    }
}
