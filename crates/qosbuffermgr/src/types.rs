//! Buffer configuration model.
//!
//! [`BufferConfig`] is what the device holds. [`DesiredConfig`] is what the
//! caller asks for; its profiles stay unvalidated ([`BufferProfileSpec`])
//! until [`DesiredConfig::validate`] turns them into [`BufferProfile`]s.

use std::collections::HashSet;
use std::fmt;

use clap::ValueEnum;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{QosBufferError, QosBufferResult};
use crate::tables::{Field, ResourceKind, NAME};

/// Reconciliation mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Add or update the supplied fields, leave everything else alone.
    #[default]
    Merged,
    /// Make each supplied entry exactly match the desired entry.
    Replaced,
    /// Replaced, and remove device entries absent from desired.
    Overridden,
    /// Remove the supplied entries or fields.
    Deleted,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Merged => "merged",
            Mode::Replaced => "replaced",
            Mode::Overridden => "overridden",
            Mode::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(n) => write!(f, "{}", n),
            FieldValue::Signed(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Named allocation of shared switch buffer memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferPool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xoff: Option<u64>,
}

impl BufferPool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            xoff: None,
        }
    }

    pub fn with_xoff(mut self, xoff: u64) -> Self {
        self.xoff = Some(xoff);
        self
    }

    pub fn get(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Xoff => self.xoff.map(FieldValue::Unsigned),
            _ => None,
        }
    }

    /// Set fields, in schema order.
    pub fn fields(&self) -> Vec<(Field, FieldValue)> {
        collect_fields(&[Field::Xoff], |field| self.get(field))
    }

    /// True when only the key is given.
    pub fn is_bare(&self) -> bool {
        self.xoff.is_none()
    }
}

/// Buffer admission threshold of a profile.
///
/// A profile uses at most one threshold mode at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Threshold {
    #[default]
    Unset,
    /// Fixed threshold in bytes.
    Static(u64),
    /// Scaling factor (alpha) relative to the free buffer.
    Dynamic(i64),
}

impl Threshold {
    /// The field currently carrying the threshold.
    pub fn field(&self) -> Option<Field> {
        match self {
            Threshold::Unset => None,
            Threshold::Static(_) => Some(Field::StaticThreshold),
            Threshold::Dynamic(_) => Some(Field::DynamicThreshold),
        }
    }
}

const PROFILE_FIELDS: [Field; 5] = [
    Field::Pool,
    Field::Size,
    Field::StaticThreshold,
    Field::DynamicThreshold,
    Field::PauseThreshold,
];

const PROFILE_KEYS: &[&str] = &[
    "name",
    "pool",
    "size",
    "static_threshold",
    "dynamic_threshold",
    "pause_threshold",
];

/// Named buffer admission policy referencing a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferProfile {
    pub name: String,
    pub pool: Option<String>,
    pub size: Option<u64>,
    pub threshold: Threshold,
    pub pause_threshold: Option<u64>,
}

impl BufferProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_pause_threshold(mut self, pause_threshold: u64) -> Self {
        self.pause_threshold = Some(pause_threshold);
        self
    }

    pub fn get(&self, field: Field) -> Option<FieldValue> {
        match (field, self.threshold) {
            (Field::Pool, _) => self.pool.clone().map(FieldValue::Text),
            (Field::Size, _) => self.size.map(FieldValue::Unsigned),
            (Field::StaticThreshold, Threshold::Static(n)) => Some(FieldValue::Unsigned(n)),
            (Field::DynamicThreshold, Threshold::Dynamic(n)) => Some(FieldValue::Signed(n)),
            (Field::PauseThreshold, _) => self.pause_threshold.map(FieldValue::Unsigned),
            _ => None,
        }
    }

    /// Set fields, in schema order.
    pub fn fields(&self) -> Vec<(Field, FieldValue)> {
        collect_fields(&PROFILE_FIELDS, |field| self.get(field))
    }
}

impl Serialize for BufferProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.fields();
        let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
        map.serialize_entry(NAME, &self.name)?;
        for (field, value) in &fields {
            map.serialize_entry(field.config_name(), value)?;
        }
        map.end()
    }
}

/// A buffer profile as supplied by the caller.
///
/// Unlike [`BufferProfile`] it can name both thresholds, which is how
/// malformed input arrives. It also remembers the order in which fields
/// were declared: `deleted` removes fields in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferProfileSpec {
    pub name: String,
    pub pool: Option<String>,
    pub size: Option<u64>,
    pub static_threshold: Option<u64>,
    pub dynamic_threshold: Option<i64>,
    pub pause_threshold: Option<u64>,
    declared: Vec<Field>,
}

impl BufferProfileSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self.declare(Field::Pool)
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self.declare(Field::Size)
    }

    pub fn with_static_threshold(mut self, threshold: u64) -> Self {
        self.static_threshold = Some(threshold);
        self.declare(Field::StaticThreshold)
    }

    pub fn with_dynamic_threshold(mut self, threshold: i64) -> Self {
        self.dynamic_threshold = Some(threshold);
        self.declare(Field::DynamicThreshold)
    }

    pub fn with_pause_threshold(mut self, pause_threshold: u64) -> Self {
        self.pause_threshold = Some(pause_threshold);
        self.declare(Field::PauseThreshold)
    }

    fn declare(mut self, field: Field) -> Self {
        if !self.declared.contains(&field) {
            self.declared.push(field);
        }
        self
    }

    pub fn get(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Pool => self.pool.clone().map(FieldValue::Text),
            Field::Size => self.size.map(FieldValue::Unsigned),
            Field::StaticThreshold => self.static_threshold.map(FieldValue::Unsigned),
            Field::DynamicThreshold => self.dynamic_threshold.map(FieldValue::Signed),
            Field::PauseThreshold => self.pause_threshold.map(FieldValue::Unsigned),
            Field::Xoff => None,
        }
    }

    /// Set fields in declaration order.
    ///
    /// Fields assigned directly rather than through a builder or the
    /// deserializer follow in schema order.
    pub fn declared_fields(&self) -> Vec<(Field, FieldValue)> {
        let mut order: Vec<Field> = self.declared.clone();
        order.extend(
            PROFILE_FIELDS
                .iter()
                .copied()
                .filter(|f| !self.declared.contains(f)),
        );
        collect_fields(&order, |field| self.get(field))
    }

    /// True when only the key is given.
    pub fn is_bare(&self) -> bool {
        PROFILE_FIELDS.iter().all(|field| self.get(*field).is_none())
    }

    /// Converts into a [`BufferProfile`], rejecting both thresholds at once.
    pub fn validate(&self) -> QosBufferResult<BufferProfile> {
        let threshold = match (self.static_threshold, self.dynamic_threshold) {
            (Some(_), Some(_)) => {
                return Err(QosBufferError::validation(
                    ResourceKind::Profile,
                    &self.name,
                    "static_threshold and dynamic_threshold are mutually exclusive",
                ))
            }
            (Some(n), None) => Threshold::Static(n),
            (None, Some(n)) => Threshold::Dynamic(n),
            (None, None) => Threshold::Unset,
        };

        Ok(BufferProfile {
            name: self.name.clone(),
            pool: self.pool.clone(),
            size: self.size,
            threshold,
            pause_threshold: self.pause_threshold,
        })
    }
}

impl From<&BufferProfile> for BufferProfileSpec {
    fn from(profile: &BufferProfile) -> Self {
        let mut spec = BufferProfileSpec::new(profile.name.clone());
        for (field, value) in profile.fields() {
            spec = match (field, value) {
                (Field::Pool, FieldValue::Text(pool)) => spec.with_pool(pool),
                (Field::Size, FieldValue::Unsigned(n)) => spec.with_size(n),
                (Field::StaticThreshold, FieldValue::Unsigned(n)) => spec.with_static_threshold(n),
                (Field::DynamicThreshold, FieldValue::Signed(n)) => spec.with_dynamic_threshold(n),
                (Field::PauseThreshold, FieldValue::Unsigned(n)) => spec.with_pause_threshold(n),
                _ => spec,
            };
        }
        spec
    }
}

impl<'de> Deserialize<'de> for BufferProfileSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ProfileSpecVisitor)
    }
}

struct ProfileSpecVisitor;

impl<'de> Visitor<'de> for ProfileSpecVisitor {
    type Value = BufferProfileSpec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a buffer profile mapping")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut name: Option<String> = None;
        let mut spec = BufferProfileSpec::default();

        while let Some(key) = map.next_key::<String>()? {
            if key == NAME {
                if name.is_some() {
                    return Err(de::Error::duplicate_field(NAME));
                }
                name = Some(map.next_value()?);
                continue;
            }

            let field = match Field::from_config_name(&key) {
                Some(field) if field.kind() == ResourceKind::Profile => field,
                _ => return Err(de::Error::unknown_field(&key, PROFILE_KEYS)),
            };
            if spec.declared.contains(&field) {
                return Err(de::Error::duplicate_field(field.config_name()));
            }

            match field {
                Field::Pool => spec.pool = map.next_value()?,
                Field::Size => spec.size = map.next_value()?,
                Field::StaticThreshold => spec.static_threshold = map.next_value()?,
                Field::DynamicThreshold => spec.dynamic_threshold = map.next_value()?,
                Field::PauseThreshold => spec.pause_threshold = map.next_value()?,
                Field::Xoff => return Err(de::Error::unknown_field(&key, PROFILE_KEYS)),
            }

            // An explicit null counts as not supplied
            if spec.get(field).is_some() {
                spec.declared.push(field);
            }
        }

        spec.name = name.ok_or_else(|| de::Error::missing_field(NAME))?;
        Ok(spec)
    }
}

/// Buffer configuration as held by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BufferConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffer_pools: Vec<BufferPool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffer_profiles: Vec<BufferProfile>,
}

impl BufferConfig {
    pub fn pool(&self, name: &str) -> Option<&BufferPool> {
        self.buffer_pools.iter().find(|p| p.name == name)
    }

    pub fn profile(&self, name: &str) -> Option<&BufferProfile> {
        self.buffer_profiles.iter().find(|p| p.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer_pools.is_empty() && self.buffer_profiles.is_empty()
    }
}

/// Buffer configuration supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredConfig {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub buffer_pools: Vec<BufferPool>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub buffer_profiles: Vec<BufferProfileSpec>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl DesiredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.buffer_pools.push(pool);
        self
    }

    pub fn with_profile(mut self, profile: BufferProfileSpec) -> Self {
        self.buffer_profiles.push(profile);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buffer_pools.is_empty() && self.buffer_profiles.is_empty()
    }

    /// Rejects inconsistent input before anything is diffed.
    ///
    /// Fails on an empty key, a key given twice in one collection, or a
    /// profile naming both threshold kinds.
    pub fn validate(&self) -> QosBufferResult<ValidatedConfig> {
        check_keys(ResourceKind::Pool, self.buffer_pools.iter().map(|p| p.name.as_str()))?;
        check_keys(
            ResourceKind::Profile,
            self.buffer_profiles.iter().map(|p| p.name.as_str()),
        )?;

        let profiles = self
            .buffer_profiles
            .iter()
            .map(|spec| {
                Ok(DesiredProfile {
                    profile: spec.validate()?,
                    declared: spec.declared_fields(),
                })
            })
            .collect::<QosBufferResult<Vec<_>>>()?;

        Ok(ValidatedConfig {
            pools: self.buffer_pools.clone(),
            profiles,
        })
    }
}

impl From<&BufferConfig> for DesiredConfig {
    fn from(config: &BufferConfig) -> Self {
        Self {
            buffer_pools: config.buffer_pools.clone(),
            buffer_profiles: config.buffer_profiles.iter().map(Into::into).collect(),
        }
    }
}

fn check_keys<'a>(kind: ResourceKind, names: impl Iterator<Item = &'a str>) -> QosBufferResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(QosBufferError::validation(kind, name, "name must not be empty"));
        }
        if !seen.insert(name) {
            return Err(QosBufferError::validation(kind, name, "declared more than once"));
        }
    }
    Ok(())
}

/// A validated desired profile with its declared field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredProfile {
    pub profile: BufferProfile,
    /// Supplied fields in declaration order.
    pub declared: Vec<(Field, FieldValue)>,
}

/// Desired configuration that passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub pools: Vec<BufferPool>,
    pub profiles: Vec<DesiredProfile>,
}

impl ValidatedConfig {
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty() && self.profiles.is_empty()
    }
}

fn collect_fields<F>(order: &[Field], get: F) -> Vec<(Field, FieldValue)>
where
    F: Fn(Field) -> Option<FieldValue>,
{
    order
        .iter()
        .filter_map(|field| get(*field).map(|value| (*field, value)))
        .collect()
}
