//! Request compiler: change records to REST requests.
//!
//! Removals become one DELETE each, in record order. Upserts for the same
//! entry are coalesced into one entry body; depending on [`Batching`] the
//! bodies go out as a single PATCH on the buffer container or as one
//! PATCH per entry. Pending upserts are flushed before any later removal,
//! so request order follows record order: pool changes land before the
//! profile DELETEs and PATCHes that may depend on them.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sonic_rest_common::RestRequest;
use tracing::debug;

use crate::diff::ChangeRecord;
use crate::paths::{build_path, entry_path, field_path, Container};
use crate::tables::{Field, ResourceKind, BUFFER_CONTAINER, CONFIG, NAME};
use crate::types::FieldValue;

/// How upserts are grouped into PATCH requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Batching {
    /// One PATCH on the buffer container carrying every entry.
    #[default]
    Container,
    /// One PATCH per pool or profile on its entry path.
    Entry,
}

/// Fields to upsert on one entry, in first-seen order.
struct PendingEntry {
    kind: ResourceKind,
    key: String,
    config: Map<String, Value>,
}

impl PendingEntry {
    fn set(&mut self, field: Field, value: &FieldValue) {
        self.config
            .insert(field.wire_name().to_string(), field.encode(value));
    }

    /// `{"name": key, "config": {"name": key, ...}}`
    fn to_body(&self) -> Value {
        let mut config = Map::new();
        config.insert(NAME.to_string(), Value::String(self.key.clone()));
        config.extend(self.config.clone());

        json!({
            NAME: self.key,
            CONFIG: Value::Object(config),
        })
    }
}

/// Compiles change records into ordered requests.
pub fn compile(records: &[ChangeRecord], batching: Batching) -> Vec<RestRequest> {
    let mut requests = Vec::new();
    let mut pending: Vec<PendingEntry> = Vec::new();

    for record in records {
        if record.is_removal() {
            flush(&mut requests, &mut pending, batching);
        }
        match record {
            ChangeRecord::RemoveField { kind, key, field } => {
                requests.push(RestRequest::delete(field_path(*kind, key, *field)));
            }
            ChangeRecord::RemoveEntry { kind, key } => {
                requests.push(RestRequest::delete(entry_path(*kind, key)));
            }
            ChangeRecord::CreatePool { key, fields } => {
                let entry = pending_entry(&mut pending, ResourceKind::Pool, key);
                for (field, value) in fields {
                    entry.set(*field, value);
                }
            }
            ChangeRecord::CreateProfile { key, fields } => {
                let entry = pending_entry(&mut pending, ResourceKind::Profile, key);
                for (field, value) in fields {
                    entry.set(*field, value);
                }
            }
            ChangeRecord::SetField {
                kind,
                key,
                field,
                value,
            } => {
                pending_entry(&mut pending, *kind, key).set(*field, value);
            }
        }
    }

    flush(&mut requests, &mut pending, batching);

    debug!(
        "Compiled {} change records into {} requests",
        records.len(),
        requests.len()
    );
    requests
}

/// Emits PATCHes for everything pending and clears it.
fn flush(requests: &mut Vec<RestRequest>, pending: &mut Vec<PendingEntry>, batching: Batching) {
    match batching {
        Batching::Container => {
            if let Some(body) = container_body(pending) {
                requests.push(RestRequest::patch(
                    build_path(Container::Buffer, None, None),
                    body,
                ));
            }
        }
        Batching::Entry => {
            for entry in pending.iter() {
                let body = json!({ entry.kind.qualified_list(): [entry.to_body()] });
                requests.push(RestRequest::patch(entry_path(entry.kind, &entry.key), body));
            }
        }
    }
    pending.clear();
}

fn pending_entry<'a>(
    pending: &'a mut Vec<PendingEntry>,
    kind: ResourceKind,
    key: &str,
) -> &'a mut PendingEntry {
    let index = match pending.iter().position(|e| e.kind == kind && e.key == key) {
        Some(index) => index,
        None => {
            pending.push(PendingEntry {
                kind,
                key: key.to_string(),
                config: Map::new(),
            });
            pending.len() - 1
        }
    };
    &mut pending[index]
}

/// `{"openconfig-qos-buffer:buffer": {"buffer-pools": {...}, "buffer-profiles": {...}}}`
fn container_body(pending: &[PendingEntry]) -> Option<Value> {
    if pending.is_empty() {
        return None;
    }

    let mut buffer = Map::new();
    for kind in [ResourceKind::Pool, ResourceKind::Profile] {
        let entries: Vec<Value> = pending
            .iter()
            .filter(|e| e.kind == kind)
            .map(PendingEntry::to_body)
            .collect();
        if !entries.is_empty() {
            buffer.insert(
                kind.collection().to_string(),
                json!({ kind.list(): entries }),
            );
        }
    }

    Some(json!({ BUFFER_CONTAINER: Value::Object(buffer) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_rest_common::Method;

    fn set(kind: ResourceKind, key: &str, field: Field, value: FieldValue) -> ChangeRecord {
        ChangeRecord::SetField {
            kind,
            key: key.to_string(),
            field,
            value,
        }
    }

    #[test]
    fn test_create_records_become_one_container_patch() {
        let records = vec![
            ChangeRecord::CreatePool {
                key: "ingress_lossless_pool".to_string(),
                fields: vec![(Field::Xoff, FieldValue::Unsigned(2500000))],
            },
            ChangeRecord::CreateProfile {
                key: "profile2".to_string(),
                fields: vec![
                    (Field::Pool, FieldValue::Text("egress_lossless_pool".into())),
                    (Field::Size, FieldValue::Unsigned(75)),
                    (Field::DynamicThreshold, FieldValue::Signed(-1)),
                ],
            },
        ];

        let requests = compile(&records, Batching::Container);

        assert_eq!(
            requests,
            vec![RestRequest::patch(
                "/data/openconfig-qos:qos/buffer",
                json!({
                    "openconfig-qos-buffer:buffer": {
                        "buffer-pools": {"buffer-pool": [
                            {"name": "ingress_lossless_pool",
                             "config": {"name": "ingress_lossless_pool", "xoff": "2500000"}}
                        ]},
                        "buffer-profiles": {"buffer-profile": [
                            {"name": "profile2",
                             "config": {"name": "profile2", "pool": "egress_lossless_pool",
                                        "size": "75", "dynamic-threshold": -1}}
                        ]}
                    }
                })
            )]
        );
    }

    #[test]
    fn test_set_fields_coalesce_per_entry() {
        let records = vec![
            set(ResourceKind::Profile, "p1", Field::Size, FieldValue::Unsigned(10)),
            set(ResourceKind::Profile, "p2", Field::Size, FieldValue::Unsigned(20)),
            set(ResourceKind::Profile, "p1", Field::PauseThreshold, FieldValue::Unsigned(30)),
        ];

        let requests = compile(&records, Batching::Entry);

        assert_eq!(
            requests,
            vec![
                RestRequest::patch(
                    "/data/openconfig-qos:qos/buffer/buffer-profiles/buffer-profile=p1",
                    json!({"openconfig-qos-buffer:buffer-profile": [
                        {"name": "p1",
                         "config": {"name": "p1", "size": "10", "pause-threshold": "30"}}
                    ]})
                ),
                RestRequest::patch(
                    "/data/openconfig-qos:qos/buffer/buffer-profiles/buffer-profile=p2",
                    json!({"openconfig-qos-buffer:buffer-profile": [
                        {"name": "p2", "config": {"name": "p2", "size": "20"}}
                    ]})
                ),
            ]
        );
    }

    #[test]
    fn test_removals_are_never_coalesced_and_come_first() {
        let records = vec![
            ChangeRecord::RemoveField {
                kind: ResourceKind::Profile,
                key: "p1".to_string(),
                field: Field::StaticThreshold,
            },
            ChangeRecord::RemoveField {
                kind: ResourceKind::Profile,
                key: "p1".to_string(),
                field: Field::PauseThreshold,
            },
            set(ResourceKind::Profile, "p1", Field::DynamicThreshold, FieldValue::Signed(1)),
        ];

        let requests = compile(&records, Batching::Container);
        let summary: Vec<(Method, &str)> = requests
            .iter()
            .map(|r| (r.method, r.path.as_str()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (
                    Method::Delete,
                    "/data/openconfig-qos:qos/buffer/buffer-profiles/buffer-profile=p1/config/static-threshold"
                ),
                (
                    Method::Delete,
                    "/data/openconfig-qos:qos/buffer/buffer-profiles/buffer-profile=p1/config/pause-threshold"
                ),
                (Method::Patch, "/data/openconfig-qos:qos/buffer"),
            ]
        );
        assert!(requests[0].body.is_none());
    }

    fn pool_then_threshold_switch() -> Vec<ChangeRecord> {
        vec![
            ChangeRecord::CreatePool {
                key: "new_pool".to_string(),
                fields: vec![(Field::Xoff, FieldValue::Unsigned(100))],
            },
            ChangeRecord::RemoveField {
                kind: ResourceKind::Profile,
                key: "profile1".to_string(),
                field: Field::StaticThreshold,
            },
            set(ResourceKind::Profile, "profile1", Field::Pool, FieldValue::Text("new_pool".into())),
            set(ResourceKind::Profile, "profile1", Field::DynamicThreshold, FieldValue::Signed(3)),
        ]
    }

    #[test]
    fn test_pool_upserts_flush_before_profile_removals() {
        let requests = compile(&pool_then_threshold_switch(), Batching::Entry);
        let summary: Vec<(Method, &str)> = requests
            .iter()
            .map(|r| (r.method, r.path.as_str()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (
                    Method::Patch,
                    "/data/openconfig-qos:qos/buffer/buffer-pools/buffer-pool=new_pool"
                ),
                (
                    Method::Delete,
                    "/data/openconfig-qos:qos/buffer/buffer-profiles/buffer-profile=profile1/config/static-threshold"
                ),
                (
                    Method::Patch,
                    "/data/openconfig-qos:qos/buffer/buffer-profiles/buffer-profile=profile1"
                ),
            ]
        );
        assert_eq!(
            requests[2].body,
            Some(json!({"openconfig-qos-buffer:buffer-profile": [
                {"name": "profile1",
                 "config": {"name": "profile1", "pool": "new_pool", "dynamic-threshold": 3}}
            ]}))
        );
    }

    #[test]
    fn test_container_batching_splits_around_profile_removals() {
        let requests = compile(&pool_then_threshold_switch(), Batching::Container);

        assert_eq!(
            requests,
            vec![
                RestRequest::patch(
                    "/data/openconfig-qos:qos/buffer",
                    json!({"openconfig-qos-buffer:buffer": {
                        "buffer-pools": {"buffer-pool": [
                            {"name": "new_pool", "config": {"name": "new_pool", "xoff": "100"}}
                        ]}
                    }})
                ),
                RestRequest::delete(
                    "/data/openconfig-qos:qos/buffer/buffer-profiles/buffer-profile=profile1/config/static-threshold"
                ),
                RestRequest::patch(
                    "/data/openconfig-qos:qos/buffer",
                    json!({"openconfig-qos-buffer:buffer": {
                        "buffer-profiles": {"buffer-profile": [
                            {"name": "profile1",
                             "config": {"name": "profile1", "pool": "new_pool", "dynamic-threshold": 3}}
                        ]}
                    }})
                ),
            ]
        );
    }

    #[test]
    fn test_remove_entry_path() {
        let records = vec![ChangeRecord::RemoveEntry {
            kind: ResourceKind::Pool,
            key: "egress_lossy_pool".to_string(),
        }];

        assert_eq!(
            compile(&records, Batching::Container),
            vec![RestRequest::delete(
                "/data/openconfig-qos:qos/buffer/buffer-pools/buffer-pool=egress_lossy_pool"
            )]
        );
    }

    #[test]
    fn test_batching_names() {
        assert_eq!(Batching::from_str("entry", false), Ok(Batching::Entry));
        assert_eq!(Batching::default(), Batching::Container);
        assert!(Batching::from_str("bulk", false).is_err());
    }

    #[test]
    fn test_no_records_no_requests() {
        assert!(compile(&[], Batching::Container).is_empty());
        assert!(compile(&[], Batching::Entry).is_empty());
    }

    #[test]
    fn test_bare_create_still_sends_key() {
        let records = vec![ChangeRecord::CreatePool {
            key: "p".to_string(),
            fields: Vec::new(),
        }];

        let requests = compile(&records, Batching::Entry);
        assert_eq!(
            requests[0].body,
            Some(json!({"openconfig-qos-buffer:buffer-pool": [
                {"name": "p", "config": {"name": "p"}}
            ]}))
        );
    }
}
