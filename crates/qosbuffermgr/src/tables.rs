//! Resource path segments and the buffer field table.
//!
//! The device schema is a fixed contract, so every field the manager
//! knows about is described once in [`FIELD_TABLE`]: its caller-facing
//! name, its wire (YANG leaf) name and how its value is encoded on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::FieldValue;

/// Root of the buffer container on the device.
pub const QOS_BUFFER_PATH: &str = "/data/openconfig-qos:qos/buffer";

/// YANG module owning the buffer container.
pub const QOS_BUFFER_MODULE: &str = "openconfig-qos-buffer";

/// Module-qualified buffer container name used as the PATCH body root.
pub const BUFFER_CONTAINER: &str = "openconfig-qos-buffer:buffer";

// Container and list segments
pub const BUFFER_POOLS: &str = "buffer-pools";
pub const BUFFER_POOL: &str = "buffer-pool";
pub const BUFFER_PROFILES: &str = "buffer-profiles";
pub const BUFFER_PROFILE: &str = "buffer-profile";

/// Leaf container holding the configurable fields of an entry.
pub const CONFIG: &str = "config";

/// List key leaf.
pub const NAME: &str = "name";

/// The two keyed collections under the buffer container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Pool,
    Profile,
}

impl ResourceKind {
    /// Collection container segment (e.g., `buffer-pools`).
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Pool => BUFFER_POOLS,
            ResourceKind::Profile => BUFFER_PROFILES,
        }
    }

    /// List segment (e.g., `buffer-pool`).
    pub fn list(&self) -> &'static str {
        match self {
            ResourceKind::Pool => BUFFER_POOL,
            ResourceKind::Profile => BUFFER_PROFILE,
        }
    }

    /// Module-qualified list name used as the body root of an entry PATCH.
    pub fn qualified_list(&self) -> String {
        format!("{}:{}", QOS_BUFFER_MODULE, self.list())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Pool => f.write_str("buffer pool"),
            ResourceKind::Profile => f.write_str("buffer profile"),
        }
    }
}

/// Every configurable leaf of a pool or profile.
///
/// The discriminant indexes [`FIELD_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Xoff = 0,
    Pool = 1,
    Size = 2,
    StaticThreshold = 3,
    DynamicThreshold = 4,
    PauseThreshold = 5,
}

/// Value domain of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Unsigned,
    Signed,
    Text,
}

/// How a value is represented in a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireEncoding {
    /// JSON string (`"40"` for numbers, the name itself for references).
    String,
    /// Bare JSON integer.
    Integer,
}

/// Static description of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub kind: ResourceKind,
    /// Caller-facing name (`static_threshold`).
    pub config_name: &'static str,
    /// YANG leaf name (`static-threshold`).
    pub wire_name: &'static str,
    pub value_type: ValueType,
    pub encoding: WireEncoding,
}

/// The device schema's buffer leaves.
///
/// `dynamic-threshold` is a signed integer leaf; every other numeric leaf
/// is declared as a string-encoded 64-bit value and must be sent quoted.
pub const FIELD_TABLE: [FieldSpec; 6] = [
    FieldSpec {
        field: Field::Xoff,
        kind: ResourceKind::Pool,
        config_name: "xoff",
        wire_name: "xoff",
        value_type: ValueType::Unsigned,
        encoding: WireEncoding::String,
    },
    FieldSpec {
        field: Field::Pool,
        kind: ResourceKind::Profile,
        config_name: "pool",
        wire_name: "pool",
        value_type: ValueType::Text,
        encoding: WireEncoding::String,
    },
    FieldSpec {
        field: Field::Size,
        kind: ResourceKind::Profile,
        config_name: "size",
        wire_name: "size",
        value_type: ValueType::Unsigned,
        encoding: WireEncoding::String,
    },
    FieldSpec {
        field: Field::StaticThreshold,
        kind: ResourceKind::Profile,
        config_name: "static_threshold",
        wire_name: "static-threshold",
        value_type: ValueType::Unsigned,
        encoding: WireEncoding::String,
    },
    FieldSpec {
        field: Field::DynamicThreshold,
        kind: ResourceKind::Profile,
        config_name: "dynamic_threshold",
        wire_name: "dynamic-threshold",
        value_type: ValueType::Signed,
        encoding: WireEncoding::Integer,
    },
    FieldSpec {
        field: Field::PauseThreshold,
        kind: ResourceKind::Profile,
        config_name: "pause_threshold",
        wire_name: "pause-threshold",
        value_type: ValueType::Unsigned,
        encoding: WireEncoding::String,
    },
];

impl Field {
    /// Table entry for this field.
    pub fn spec(self) -> &'static FieldSpec {
        &FIELD_TABLE[self as usize]
    }

    pub fn kind(self) -> ResourceKind {
        self.spec().kind
    }

    pub fn config_name(self) -> &'static str {
        self.spec().config_name
    }

    pub fn wire_name(self) -> &'static str {
        self.spec().wire_name
    }

    /// Looks up a field by its caller-facing name.
    pub fn from_config_name(name: &str) -> Option<Field> {
        FIELD_TABLE
            .iter()
            .find(|spec| spec.config_name == name)
            .map(|spec| spec.field)
    }

    /// Looks up a field of `kind` by its wire name.
    pub fn from_wire_name(kind: ResourceKind, name: &str) -> Option<Field> {
        FIELD_TABLE
            .iter()
            .find(|spec| spec.kind == kind && spec.wire_name == name)
            .map(|spec| spec.field)
    }

    /// The field that may not be set at the same time as this one.
    pub fn exclusive_with(self) -> Option<Field> {
        match self {
            Field::StaticThreshold => Some(Field::DynamicThreshold),
            Field::DynamicThreshold => Some(Field::StaticThreshold),
            _ => None,
        }
    }

    /// Encodes `value` the way the device schema declares this leaf.
    pub fn encode(self, value: &FieldValue) -> Value {
        match (self.spec().encoding, value) {
            (WireEncoding::String, FieldValue::Text(text)) => Value::String(text.clone()),
            (WireEncoding::String, FieldValue::Unsigned(n)) => Value::String(n.to_string()),
            (WireEncoding::String, FieldValue::Signed(n)) => Value::String(n.to_string()),
            (WireEncoding::Integer, FieldValue::Unsigned(n)) => Value::from(*n),
            (WireEncoding::Integer, FieldValue::Signed(n)) => Value::from(*n),
            (WireEncoding::Integer, FieldValue::Text(text)) => Value::String(text.clone()),
        }
    }

    /// Decodes a wire value for this leaf.
    ///
    /// Devices are not consistent about quoting, so numeric leaves accept
    /// both JSON numbers and decimal strings.
    pub fn decode(self, value: &Value) -> Result<FieldValue, String> {
        let spec = self.spec();
        match spec.value_type {
            ValueType::Text => match value {
                Value::String(text) => Ok(FieldValue::Text(text.clone())),
                other => Err(format!("{}: expected a string, got {}", spec.wire_name, other)),
            },
            ValueType::Unsigned => {
                let parsed = match value {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse::<u64>().ok(),
                    _ => None,
                };
                parsed.map(FieldValue::Unsigned).ok_or_else(|| {
                    format!(
                        "{}: expected a non-negative integer, got {}",
                        spec.wire_name, value
                    )
                })
            }
            ValueType::Signed => {
                let parsed = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                parsed
                    .map(FieldValue::Signed)
                    .ok_or_else(|| format!("{}: expected an integer, got {}", spec.wire_name, value))
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}
