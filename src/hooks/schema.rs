//! Stored shapes of the hook service entities.

use crate::core::{FieldSet, FieldType, Record, Result, field_set};
use crate::schema::{SchemaVersion, SchemaVersionChain};
use crate::storage::{EntityKind, KeySpec};
use serde_json::json;

pub const HOOKS_TABLE: &str = "hooks";
pub const LAST_FIRES_TABLE: &str = "last_fires";
pub const QUEUES_TABLE: &str = "queues";

/// Fields shared by every hook version.
fn hook_base_fields() -> Vec<(&'static str, FieldType)> {
    vec![
        ("hookGroupId", FieldType::String),
        ("hookId", FieldType::String),
        ("metadata", FieldType::Json),
        ("task", FieldType::Json),
        ("bindings", FieldType::Json),
        ("schedule", FieldType::Json),
        ("triggerToken", FieldType::EncryptedText),
        ("nextTaskId", FieldType::EncryptedText),
        ("nextScheduledDate", FieldType::Date),
    ]
}

fn hook_fields(extra: &[(&'static str, FieldType)]) -> FieldSet {
    field_set(hook_base_fields().into_iter().chain(extra.iter().copied()))
}

const TIMINGS: [(&str, FieldType); 2] = [
    ("deadline", FieldType::String),
    ("expires", FieldType::String),
];

/// Removes keys from the embedded task template. A template that is not an
/// object is left alone.
fn strip_task_keys(record: &mut Record, keys: &[&str]) {
    if let Some(task) = record.object_field_mut("task") {
        for key in keys {
            task.remove(*key);
        }
    }
}

/// The five released shapes of a hook.
///
/// Versions 1 and 2 carry top-level `deadline`/`expires` timings; version 3
/// adds `lastFire`, version 4 adds `triggerSchema`, and version 5 drops the
/// timings again.
pub fn hook_chain() -> Result<SchemaVersionChain> {
    let v1_v2 = hook_fields(&TIMINGS);
    let v3 = hook_fields(&[TIMINGS[0], TIMINGS[1], ("lastFire", FieldType::Json)]);
    let v4 = hook_fields(&[
        TIMINGS[0],
        TIMINGS[1],
        ("lastFire", FieldType::Json),
        ("triggerSchema", FieldType::Json),
    ]);
    let v5 = hook_fields(&[
        ("lastFire", FieldType::Json),
        ("triggerSchema", FieldType::Json),
    ]);

    SchemaVersionChain::from_versions(
        HOOKS_TABLE,
        [
            SchemaVersion::new(1, v1_v2.clone()),
            // task timestamps are rewritten every time the hook fires
            SchemaVersion::new(2, v1_v2).with_migrate(|mut record| {
                strip_task_keys(&mut record, &["created", "expires", "deadline"]);
                Ok(record)
            }),
            SchemaVersion::new(3, v3).with_migrate(|mut record| {
                record.set_field("lastFire", json!({"result": "no-fire"}));
                Ok(record)
            }),
            SchemaVersion::new(4, v4).with_migrate(|mut record| {
                record.set_field(
                    "triggerSchema",
                    json!({"type": "object", "properties": {}, "additionalProperties": false}),
                );
                Ok(record)
            }),
            SchemaVersion::new(5, v5).with_migrate(|mut record| {
                strip_task_keys(&mut record, &["expires", "deadline"]);
                Ok(record)
            }),
        ],
    )
}

pub fn last_fire_chain() -> Result<SchemaVersionChain> {
    SchemaVersionChain::from_versions(
        LAST_FIRES_TABLE,
        [SchemaVersion::new(
            1,
            field_set([
                ("hookGroupId", FieldType::String),
                ("hookId", FieldType::String),
                ("firedBy", FieldType::String),
                ("taskId", FieldType::String),
                ("taskCreateTime", FieldType::Date),
                ("result", FieldType::String),
                ("error", FieldType::String),
            ]),
        )],
    )
}

pub fn queue_chain() -> Result<SchemaVersionChain> {
    SchemaVersionChain::from_versions(
        QUEUES_TABLE,
        [SchemaVersion::new(
            1,
            field_set([
                ("hookGroupId", FieldType::String),
                ("hookId", FieldType::String),
                ("queueName", FieldType::String),
                ("bindings", FieldType::Json),
            ]),
        )],
    )
}

/// Hooks, keyed by group then id.
pub fn hook_kind() -> Result<EntityKind> {
    EntityKind::new(
        HOOKS_TABLE,
        KeySpec::single("hookGroupId"),
        KeySpec::single("hookId"),
        hook_chain()?,
    )
}

/// Fire history, partitioned per hook and keyed by the task it created.
pub fn last_fire_kind() -> Result<EntityKind> {
    EntityKind::new(
        LAST_FIRES_TABLE,
        KeySpec::composite(["hookGroupId", "hookId"]),
        KeySpec::single("taskId"),
        last_fire_chain()?,
    )
}

pub fn queue_kind() -> Result<EntityKind> {
    EntityKind::new(
        QUEUES_TABLE,
        KeySpec::single("hookGroupId"),
        KeySpec::single("hookId"),
        queue_chain()?,
    )
}
