use hookstore::{
    FieldSet, FieldType, Record, SchemaVersion, SchemaVersionChain, StoreError, field_set,
};
use proptest::prelude::*;
use serde_json::{Value, json};

fn counter_chain() -> SchemaVersionChain {
    SchemaVersionChain::from_versions(
        "counters",
        [
            SchemaVersion::new(1, field_set([("count", FieldType::Integer)])),
            SchemaVersion::new(
                2,
                field_set([("count", FieldType::Integer), ("label", FieldType::String)]),
            )
            .with_migrate(|mut record| {
                record.set_field("label", json!("unnamed"));
                Ok(record)
            }),
            SchemaVersion::new(3, field_set([("total", FieldType::Integer), ("label", FieldType::String)]))
                .with_migrate(|mut record| {
                    let count = record.remove_field("count").unwrap_or(json!(0));
                    let total = count.as_i64().unwrap_or(0) * 10;
                    record.set_field("total", json!(total));
                    Ok(record)
                }),
        ],
    )
    .unwrap()
}

fn counter(version: u32, fields: Value) -> Record {
    Record::from_json_fields("p", "r", fields)
        .unwrap()
        .at_version(version)
}

#[test]
fn test_define_version_rejects_gap() {
    let mut chain = SchemaVersionChain::new("gappy");
    chain.define_version(1, FieldSet::new(), None).unwrap();
    chain.define_version(2, FieldSet::new(), None).unwrap();

    let err = chain.define_version(4, FieldSet::new(), None).unwrap_err();
    match err {
        StoreError::ChainGap {
            expected, found, ..
        } => {
            assert_eq!(expected, 3);
            assert_eq!(found, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_first_version_must_be_one() {
    let err = SchemaVersionChain::new("late")
        .with_version(SchemaVersion::new(2, FieldSet::new()))
        .unwrap_err();
    assert!(matches!(err, StoreError::ChainGap { expected: 1, found: 2, .. }));
}

#[test]
fn test_first_version_cannot_migrate() {
    let err = SchemaVersionChain::new("eager")
        .with_version(SchemaVersion::new(1, FieldSet::new()).with_migrate(Ok))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidVersion(_)));
}

#[test]
fn test_empty_chain_cannot_upgrade() {
    let chain = SchemaVersionChain::new("nothing");
    let err = chain.upgrade(counter(1, json!({}))).unwrap_err();
    assert!(matches!(err, StoreError::NoVersionsDefined(_)));
    assert!(matches!(chain.validate(), Err(StoreError::NoVersionsDefined(_))));
}

#[test]
fn test_upgrade_walks_every_step() {
    let chain = counter_chain();
    let upgraded = chain.upgrade(counter(1, json!({"count": 4}))).unwrap();

    assert_eq!(upgraded.version, 3);
    assert_eq!(
        Value::Object(upgraded.fields.clone()),
        json!({"total": 40, "label": "unnamed"})
    );
    chain.validate_fields(&upgraded).unwrap();
}

#[test]
fn test_upgrade_from_middle_skips_applied_steps() {
    let chain = counter_chain();
    let upgraded = chain
        .upgrade(counter(2, json!({"count": 1, "label": "kept"})))
        .unwrap();
    assert_eq!(upgraded.field("label"), Some(&json!("kept")));
    assert_eq!(upgraded.field("total"), Some(&json!(10)));
}

#[test]
fn test_upgrade_rejects_future_and_untagged_records() {
    let chain = counter_chain();

    let err = chain.upgrade(counter(7, json!({}))).unwrap_err();
    assert!(matches!(err, StoreError::FutureVersion { found: 7, latest: 3, .. }));

    let err = chain.upgrade(counter(0, json!({}))).unwrap_err();
    assert!(matches!(err, StoreError::InvalidVersion(_)));
}

#[test]
fn test_failing_migrate_reports_version() {
    let chain = SchemaVersionChain::from_versions(
        "broken",
        [
            SchemaVersion::new(1, FieldSet::new()),
            SchemaVersion::new(2, FieldSet::new()).with_migrate(|_| {
                Err(StoreError::FieldValidation("boom".to_string()))
            }),
        ],
    )
    .unwrap();

    let err = chain.upgrade(counter(1, json!({}))).unwrap_err();
    match err {
        StoreError::MigrationFailed { version, reason, .. } => {
            assert_eq!(version, 2);
            assert!(reason.contains("boom"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_version_without_migrate_only_narrows_fields() {
    let chain = SchemaVersionChain::from_versions(
        "narrowing",
        [
            SchemaVersion::new(1, field_set([("a", FieldType::Json), ("b", FieldType::Json)])),
            SchemaVersion::new(2, field_set([("a", FieldType::Json)])),
        ],
    )
    .unwrap();

    let upgraded = chain.upgrade(counter(1, json!({"a": 1, "b": 2}))).unwrap();
    assert_eq!(Value::Object(upgraded.fields), json!({"a": 1}));
}

#[test]
fn test_validate_fields_reports_problems() {
    let chain = counter_chain();

    let missing = counter(3, json!({"total": 1}));
    assert!(matches!(chain.validate_fields(&missing), Err(StoreError::FieldValidation(_))));

    let unknown = counter(3, json!({"total": 1, "label": "x", "extra": true}));
    assert!(matches!(chain.validate_fields(&unknown), Err(StoreError::FieldValidation(_))));

    let mistyped = counter(3, json!({"total": "1", "label": "x"}));
    assert!(matches!(chain.validate_fields(&mistyped), Err(StoreError::FieldValidation(_))));
}

proptest! {
    #[test]
    fn prop_upgrade_is_deterministic_and_idempotent(count in -1000i64..1000, start in 1u32..=3) {
        let chain = counter_chain();
        let fields = match start {
            1 => json!({"count": count}),
            2 => json!({"count": count, "label": "x"}),
            _ => json!({"total": count, "label": "x"}),
        };
        let record = counter(start, fields);

        let first = chain.upgrade(record.clone()).unwrap();
        let second = chain.upgrade(record).unwrap();
        prop_assert_eq!(&first, &second);

        let again = chain.upgrade(first.clone()).unwrap();
        prop_assert_eq!(again, first);
    }
}
