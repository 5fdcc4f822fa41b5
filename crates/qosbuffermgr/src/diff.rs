//! Diff engine: desired vs. device buffer configuration.
//!
//! Produces typed [`ChangeRecord`]s, never requests. Output order:
//!
//! 1. pool field and pool removals
//! 2. pool upserts
//! 3. profile field and profile removals
//! 4. profile upserts
//!
//! Pool changes precede profile changes, so a profile is only pointed at
//! a pool once that pool exists. Within a kind removals come first, which
//! clears one threshold kind before the other is set. Entries keep the
//! caller's order and fields keep their declaration order.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::tables::{Field, ResourceKind};
use crate::types::{BufferConfig, FieldValue, Mode, ValidatedConfig};

/// One change to apply to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeRecord {
    /// Create a pool that does not exist yet.
    CreatePool {
        key: String,
        #[serde(serialize_with = "serialize_fields")]
        fields: Vec<(Field, FieldValue)>,
    },
    /// Create a profile that does not exist yet.
    CreateProfile {
        key: String,
        #[serde(serialize_with = "serialize_fields")]
        fields: Vec<(Field, FieldValue)>,
    },
    /// Create or update one field of an existing entry.
    SetField {
        kind: ResourceKind,
        key: String,
        field: Field,
        value: FieldValue,
    },
    /// Delete one field, leaving its siblings intact.
    RemoveField {
        kind: ResourceKind,
        key: String,
        field: Field,
    },
    /// Delete a whole pool or profile.
    RemoveEntry { kind: ResourceKind, key: String },
}

impl ChangeRecord {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ChangeRecord::CreatePool { .. } => ResourceKind::Pool,
            ChangeRecord::CreateProfile { .. } => ResourceKind::Profile,
            ChangeRecord::SetField { kind, .. }
            | ChangeRecord::RemoveField { kind, .. }
            | ChangeRecord::RemoveEntry { kind, .. } => *kind,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ChangeRecord::CreatePool { key, .. }
            | ChangeRecord::CreateProfile { key, .. }
            | ChangeRecord::SetField { key, .. }
            | ChangeRecord::RemoveField { key, .. }
            | ChangeRecord::RemoveEntry { key, .. } => key,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            ChangeRecord::RemoveField { .. } | ChangeRecord::RemoveEntry { .. }
        )
    }

    fn create(kind: ResourceKind, key: &str, fields: Vec<(Field, FieldValue)>) -> Self {
        let key = key.to_string();
        match kind {
            ResourceKind::Pool => ChangeRecord::CreatePool { key, fields },
            ResourceKind::Profile => ChangeRecord::CreateProfile { key, fields },
        }
    }
}

fn serialize_fields<S: Serializer>(
    fields: &[(Field, FieldValue)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (field, value) in fields {
        map.serialize_entry(field.config_name(), value)?;
    }
    map.end()
}

/// An entry reduced to its key and ordered, set fields.
struct FlatEntry<'a> {
    key: &'a str,
    fields: Vec<(Field, FieldValue)>,
}

impl FlatEntry<'_> {
    fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    fn is_bare(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Per-kind output buckets.
#[derive(Default)]
struct KindChanges {
    removals: Vec<ChangeRecord>,
    upserts: Vec<ChangeRecord>,
}

/// Computes the changes that move `existing` to `desired` under `mode`.
///
/// Pure: the same inputs always give the same records.
pub fn diff(desired: &ValidatedConfig, existing: &BufferConfig, mode: Mode) -> Vec<ChangeRecord> {
    let desired_pools: Vec<FlatEntry> = desired
        .pools
        .iter()
        .map(|p| FlatEntry {
            key: &p.name,
            fields: p.fields(),
        })
        .collect();
    let desired_profiles: Vec<FlatEntry> = desired
        .profiles
        .iter()
        .map(|p| FlatEntry {
            key: &p.profile.name,
            fields: p.declared.clone(),
        })
        .collect();
    let existing_pools: Vec<FlatEntry> = existing
        .buffer_pools
        .iter()
        .map(|p| FlatEntry {
            key: &p.name,
            fields: p.fields(),
        })
        .collect();
    let existing_profiles: Vec<FlatEntry> = existing
        .buffer_profiles
        .iter()
        .map(|p| FlatEntry {
            key: &p.name,
            fields: p.fields(),
        })
        .collect();

    // deleted with nothing named clears the whole container
    let mode = if mode == Mode::Deleted && desired.is_empty() {
        debug!("No entries named for deletion, removing all buffer configuration");
        Mode::Overridden
    } else {
        mode
    };

    let pools = diff_kind(ResourceKind::Pool, &desired_pools, &existing_pools, mode);
    let profiles = diff_kind(
        ResourceKind::Profile,
        &desired_profiles,
        &existing_profiles,
        mode,
    );

    let records: Vec<ChangeRecord> = pools
        .removals
        .into_iter()
        .chain(pools.upserts)
        .chain(profiles.removals)
        .chain(profiles.upserts)
        .collect();

    for record in &records {
        debug!("{} change: {:?}", mode, record);
    }
    records
}

fn diff_kind(
    kind: ResourceKind,
    desired: &[FlatEntry],
    existing: &[FlatEntry],
    mode: Mode,
) -> KindChanges {
    let mut changes = KindChanges::default();

    for want in desired {
        let have = existing.iter().find(|e| e.key == want.key);
        match mode {
            Mode::Merged => merge_entry(kind, want, have, &mut changes),
            Mode::Replaced | Mode::Overridden => replace_entry(kind, want, have, &mut changes),
            Mode::Deleted => delete_entry(kind, want, have, &mut changes),
        }
    }

    if mode == Mode::Overridden {
        for have in existing {
            if !desired.iter().any(|want| want.key == have.key) {
                changes.removals.push(ChangeRecord::RemoveEntry {
                    kind,
                    key: have.key.to_string(),
                });
            }
        }
    }

    changes
}

fn merge_entry(
    kind: ResourceKind,
    want: &FlatEntry,
    have: Option<&FlatEntry>,
    changes: &mut KindChanges,
) {
    let Some(have) = have else {
        changes
            .upserts
            .push(ChangeRecord::create(kind, want.key, want.fields.clone()));
        return;
    };

    for (field, value) in &want.fields {
        if have.get(*field) == Some(value) {
            continue;
        }
        // the device must never hold both threshold kinds
        if let Some(other) = field.exclusive_with() {
            if have.get(other).is_some() {
                changes.removals.push(ChangeRecord::RemoveField {
                    kind,
                    key: want.key.to_string(),
                    field: other,
                });
            }
        }
        changes.upserts.push(ChangeRecord::SetField {
            kind,
            key: want.key.to_string(),
            field: *field,
            value: value.clone(),
        });
    }
}

fn replace_entry(
    kind: ResourceKind,
    want: &FlatEntry,
    have: Option<&FlatEntry>,
    changes: &mut KindChanges,
) {
    let Some(have) = have else {
        changes
            .upserts
            .push(ChangeRecord::create(kind, want.key, want.fields.clone()));
        return;
    };

    // fields the desired entry no longer carries, including the other threshold
    for (field, _) in &have.fields {
        if want.get(*field).is_none() {
            changes.removals.push(ChangeRecord::RemoveField {
                kind,
                key: want.key.to_string(),
                field: *field,
            });
        }
    }

    for (field, value) in &want.fields {
        if have.get(*field) != Some(value) {
            changes.upserts.push(ChangeRecord::SetField {
                kind,
                key: want.key.to_string(),
                field: *field,
                value: value.clone(),
            });
        }
    }
}

fn delete_entry(
    kind: ResourceKind,
    want: &FlatEntry,
    have: Option<&FlatEntry>,
    changes: &mut KindChanges,
) {
    let Some(have) = have else {
        return;
    };

    if want.is_bare() {
        changes.removals.push(ChangeRecord::RemoveEntry {
            kind,
            key: want.key.to_string(),
        });
        return;
    }

    for (field, _) in &want.fields {
        if have.get(*field).is_some() {
            changes.removals.push(ChangeRecord::RemoveField {
                kind,
                key: want.key.to_string(),
                field: *field,
            });
        }
    }
}
