//! Resource path builder.
//!
//! Path layout:
//!
//! ```text
//! /data/openconfig-qos:qos/buffer                                    buffer container
//! /data/openconfig-qos:qos/buffer/buffer-pools                       collection
//! /data/openconfig-qos:qos/buffer/buffer-pools/buffer-pool=<key>     entry
//! /data/openconfig-qos:qos/buffer/buffer-pools/buffer-pool=<key>/config/xoff
//! ```

use crate::tables::{Field, ResourceKind, CONFIG, QOS_BUFFER_PATH};

/// Addressable containers under the QoS tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// The buffer container holding both collections.
    Buffer,
    /// `buffer-pools`.
    Pools,
    /// `buffer-profiles`.
    Profiles,
}

impl From<ResourceKind> for Container {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Pool => Container::Pools,
            ResourceKind::Profile => Container::Profiles,
        }
    }
}

impl Container {
    fn kind(self) -> Option<ResourceKind> {
        match self {
            Container::Buffer => None,
            Container::Pools => Some(ResourceKind::Pool),
            Container::Profiles => Some(ResourceKind::Profile),
        }
    }
}

/// Builds the canonical path for a container, entry or field.
///
/// - no key: the container itself
/// - key: the list entry `collection/list=key`
/// - key and field: the leaf `.../config/<wire-name>`
///
/// `Container::Buffer` has no list, so a key (and field) is ignored for it.
pub fn build_path(container: Container, key: Option<&str>, field: Option<Field>) -> String {
    let kind = match container.kind() {
        Some(kind) => kind,
        None => return QOS_BUFFER_PATH.to_string(),
    };

    let mut path = format!("{}/{}", QOS_BUFFER_PATH, kind.collection());
    if let Some(key) = key {
        path.push_str(&format!("/{}={}", kind.list(), encode_key(key)));
        if let Some(field) = field {
            path.push_str(&format!("/{}/{}", CONFIG, field.wire_name()));
        }
    }
    path
}

/// Path of one pool or profile.
pub fn entry_path(kind: ResourceKind, key: &str) -> String {
    build_path(kind.into(), Some(key), None)
}

/// Path of one leaf of a pool or profile.
pub fn field_path(kind: ResourceKind, key: &str, field: Field) -> String {
    build_path(kind.into(), Some(key), Some(field))
}

/// Percent-encodes the characters that would break a path segment.
pub fn encode_key(key: &str) -> String {
    key.replace('%', "%25").replace('/', "%2F")
}
