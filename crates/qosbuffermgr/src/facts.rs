//! Device buffer state ("facts") retrieval and parsing.

use serde_json::{Map, Value};
use sonic_rest_common::Transport;
use tracing::{debug, info, instrument};

use crate::error::{QosBufferError, QosBufferResult};
use crate::paths::{build_path, Container};
use crate::tables::{Field, ResourceKind, BUFFER_POOLS, BUFFER_PROFILES, CONFIG, NAME};
use crate::types::{BufferConfig, BufferPool, BufferProfile, FieldValue, Threshold};

/// Fetches and parses the buffer container.
///
/// A device that reports the container absent yields an empty config.
#[instrument(skip_all)]
pub async fn fetch_buffer_config<T>(transport: &T) -> QosBufferResult<BufferConfig>
where
    T: Transport + ?Sized,
{
    let path = build_path(Container::Buffer, None, None);
    let doc = transport.fetch(&path).await?;
    if doc.is_none() {
        info!("Buffer container not found on device, treating as empty");
    }
    parse_buffer_config(doc.as_ref())
}

/// Parses a buffer container document.
///
/// Accepts the module-qualified wrapper (`{"openconfig-qos-buffer:buffer":
/// {...}}`) or the bare container. `None`, `null` or an empty container
/// mean no buffer configuration.
pub fn parse_buffer_config(doc: Option<&Value>) -> QosBufferResult<BufferConfig> {
    let container = match doc.and_then(unwrap_container) {
        Some(Value::Object(container)) => container,
        Some(Value::Null) | None => return Ok(BufferConfig::default()),
        Some(other) => {
            return Err(QosBufferError::facts(format!(
                "expected an object for the buffer container, got {}",
                other
            )))
        }
    };

    let mut config = BufferConfig::default();

    for (name, fields) in entries(container, ResourceKind::Pool)? {
        let mut pool = BufferPool::new(name);
        for (field, value) in fields {
            if let (Field::Xoff, FieldValue::Unsigned(n)) = (field, value) {
                pool.xoff = Some(n);
            }
        }
        config.buffer_pools.push(pool);
    }

    for (name, fields) in entries(container, ResourceKind::Profile)? {
        config.buffer_profiles.push(build_profile(name, fields)?);
    }

    debug!(
        "Parsed {} buffer pools and {} buffer profiles",
        config.buffer_pools.len(),
        config.buffer_profiles.len()
    );
    Ok(config)
}

/// Strips the module-qualified wrapper if present.
fn unwrap_container(doc: &Value) -> Option<&Value> {
    let object = match doc {
        Value::Object(object) => object,
        other => return Some(other),
    };

    let wrapped = object
        .iter()
        .find(|(key, _)| key.rsplit(':').next() == Some("buffer"))
        .map(|(_, value)| value);

    Some(wrapped.unwrap_or(doc))
}

type RawEntry = (String, Vec<(Field, FieldValue)>);

fn entries(container: &Map<String, Value>, kind: ResourceKind) -> QosBufferResult<Vec<RawEntry>> {
    let collection = match container.get(kind.collection()) {
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(collection) => collection,
    };

    let list = match collection.get(kind.list()) {
        Some(Value::Array(list)) => list,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(QosBufferError::facts(format!(
                "{}/{}: expected a list, got {}",
                kind.collection(),
                kind.list(),
                other
            )))
        }
    };

    list.iter().map(|entry| parse_entry(kind, entry)).collect()
}

fn parse_entry(kind: ResourceKind, entry: &Value) -> QosBufferResult<RawEntry> {
    let config = entry.get(CONFIG).and_then(Value::as_object);

    let name = entry
        .get(NAME)
        .or_else(|| config.and_then(|c| c.get(NAME)))
        .and_then(Value::as_str)
        .ok_or_else(|| QosBufferError::facts(format!("{} entry without a name", kind)))?
        .to_string();

    let mut fields = Vec::new();
    if let Some(config) = config {
        for (wire_name, value) in config {
            if value.is_null() {
                continue;
            }
            // name and leaves this manager does not own are skipped
            let Some(field) = Field::from_wire_name(kind, wire_name) else {
                continue;
            };
            let value = field
                .decode(value)
                .map_err(|e| QosBufferError::facts(format!("{} '{}': {}", kind, name, e)))?;
            fields.push((field, value));
        }
    }

    Ok((name, fields))
}

fn build_profile(name: String, fields: Vec<(Field, FieldValue)>) -> QosBufferResult<BufferProfile> {
    let mut profile = BufferProfile::new(name);

    for (field, value) in fields {
        match (field, value) {
            (Field::Pool, FieldValue::Text(pool)) => profile.pool = Some(pool),
            (Field::Size, FieldValue::Unsigned(n)) => profile.size = Some(n),
            (Field::PauseThreshold, FieldValue::Unsigned(n)) => profile.pause_threshold = Some(n),
            (Field::StaticThreshold, FieldValue::Unsigned(n)) => {
                set_threshold(&mut profile, Threshold::Static(n))?
            }
            (Field::DynamicThreshold, FieldValue::Signed(n)) => {
                set_threshold(&mut profile, Threshold::Dynamic(n))?
            }
            _ => {}
        }
    }

    Ok(profile)
}

fn set_threshold(profile: &mut BufferProfile, threshold: Threshold) -> QosBufferResult<()> {
    if profile.threshold != Threshold::Unset {
        return Err(QosBufferError::facts(format!(
            "{} '{}' reports both static-threshold and dynamic-threshold",
            ResourceKind::Profile,
            profile.name
        )));
    }
    profile.threshold = threshold;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_absent_container_is_empty() {
        assert_eq!(parse_buffer_config(None).unwrap(), BufferConfig::default());
        assert!(parse_buffer_config(Some(&json!({}))).unwrap().is_empty());
        assert!(parse_buffer_config(Some(&json!({"openconfig-qos-buffer:buffer": null})))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_populated_container() {
        let doc = json!({
            "openconfig-qos-buffer:buffer": {
                "buffer-pools": {
                    "buffer-pool": [
                        {"name": "ingress_lossless_pool",
                         "config": {"name": "ingress_lossless_pool", "xoff": "2500000"}}
                    ]
                },
                "buffer-profiles": {
                    "buffer-profile": [
                        {"name": "profile1",
                         "config": {"name": "profile1", "pool": "ingress_lossless_pool",
                                    "size": "40", "static-threshold": "20",
                                    "pause-threshold": "50000"}},
                        {"name": "profile3",
                         "config": {"name": "profile3", "pool": "egress_lossy_pool",
                                    "size": "85", "dynamic-threshold": 2}}
                    ]
                }
            }
        });

        let config = parse_buffer_config(Some(&doc)).unwrap();

        assert_eq!(
            config,
            BufferConfig {
                buffer_pools: vec![BufferPool::new("ingress_lossless_pool").with_xoff(2500000)],
                buffer_profiles: vec![
                    BufferProfile::new("profile1")
                        .with_pool("ingress_lossless_pool")
                        .with_size(40)
                        .with_threshold(Threshold::Static(20))
                        .with_pause_threshold(50000),
                    BufferProfile::new("profile3")
                        .with_pool("egress_lossy_pool")
                        .with_size(85)
                        .with_threshold(Threshold::Dynamic(2)),
                ],
            }
        );
    }

    #[test]
    fn test_parse_bare_container_and_state_leaves() {
        let doc = json!({
            "buffer-pools": {
                "buffer-pool": [
                    {"name": "p", "config": {"name": "p"}, "state": {"xoff": "9"}}
                ]
            }
        });

        let config = parse_buffer_config(Some(&doc)).unwrap();
        assert_eq!(config.buffer_pools, vec![BufferPool::new("p")]);
    }

    #[test]
    fn test_parse_rejects_both_thresholds() {
        let doc = json!({
            "openconfig-qos-buffer:buffer": {
                "buffer-profiles": {"buffer-profile": [
                    {"name": "p", "config": {"static-threshold": "1", "dynamic-threshold": 1}}
                ]}
            }
        });
        assert!(parse_buffer_config(Some(&doc)).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        let doc = json!({
            "buffer-pools": {"buffer-pool": [{"name": "p", "config": {"xoff": "lots"}}]}
        });
        let err = parse_buffer_config(Some(&doc)).unwrap_err();
        assert!(err.to_string().contains("xoff"));
    }
}
