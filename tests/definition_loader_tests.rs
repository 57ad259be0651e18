use hookstore::{Definition, DefinitionError, DefinitionLoader, StoreError};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

fn method() -> Value {
    json!({
        "args": "hook_group_id text",
        "body": "begin return query select 1; end",
        "description": "Get a hook",
        "mode": "read",
        "returns": "table (hook_id text)",
        "serviceName": "hooks"
    })
}

fn document(version: u64) -> Value {
    json!({
        "version": version,
        "migrationScript": "begin create table hooks(); end",
        "methods": {"get_hook": method()}
    })
}

const YAML_V1: &str = r#"
version: 1
migrationScript: |-
  begin
    create table hooks_entities(partition_key text, row_key text);
  end
methods:
  get_hooks:
    description: List hooks
    mode: read
    serviceName: hooks
    args: hook_group_id text
    returns: table (value jsonb)
    body: |-
      begin
        return query select value from hooks_entities;
      end
"#;

const YAML_V2: &str = r#"
version: 2
migrationScript: "begin alter table hooks_entities add column etag uuid; end"
methods: {}
"#;

#[test]
fn test_valid_document_round_trips() {
    let definition = DefinitionLoader::load(&document(4), "versions/0004.yml").unwrap();
    assert_eq!(definition.version, 4);
    assert_eq!(definition.method("get_hook").unwrap().service_name, "hooks");

    let serialized = definition.to_serializable();
    assert_eq!(serialized, document(4));
    assert_eq!(Definition::from_serializable(&serialized).unwrap(), definition);
}

#[test]
fn test_from_serializable_rejects_unknown_key() {
    let mut value = document(1);
    value["foo"] = json!("bar");
    let err = Definition::from_serializable(&value).unwrap_err();
    assert!(matches!(err, DefinitionError::UnexpectedTopLevelKey { ref field, .. } if field == "foo"));
}

#[test]
fn test_version_must_match_file_name() {
    let err = DefinitionLoader::load(&document(3), "0004.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::VersionMismatch { version: 3, ref token, .. } if token == "0004"));

    let err = DefinitionLoader::load(&document(3), "three.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::VersionMismatch { .. }));
}

#[test]
fn test_top_level_keys_are_exact() {
    let mut missing = document(1);
    missing.as_object_mut().unwrap().remove("methods");
    let err = DefinitionLoader::load(&missing, "1.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::MissingTopLevelKey { ref field, .. } if field == "methods"));

    let mut extra = document(1);
    extra["foo"] = json!(1);
    let err = DefinitionLoader::load(&extra, "1.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::UnexpectedTopLevelKey { ref field, .. } if field == "foo"));
}

#[test]
fn test_empty_migration_script_rejected() {
    let mut value = document(1);
    value["migrationScript"] = json!("");
    let err = DefinitionLoader::load(&value, "1.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::EmptyField { ref field, .. } if field == "migrationScript"));

    let mut value = document(1);
    value["version"] = json!(0);
    let err = DefinitionLoader::load(&value, "0.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::EmptyField { ref field, .. } if field == "version"));
}

#[test]
fn test_method_names_must_be_lower_case() {
    let mut value = document(1);
    value["methods"]["MyMethod"] = method();
    let err = DefinitionLoader::load(&value, "1.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::UppercaseMethodName { ref method, .. } if method == "MyMethod"));
}

#[test]
fn test_non_ascii_uppercase_method_name_rejected() {
    let mut value = document(1);
    value["methods"]["get_hookÉ"] = method();
    let err = DefinitionLoader::load(&value, "1.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::UppercaseMethodName { ref method, .. } if method == "get_hookÉ"));

    let mut value = document(1);
    value["methods"]["get_hooké"] = method();
    assert!(DefinitionLoader::load(&value, "1.yml").is_ok());
}

#[test]
fn test_method_key_set_is_exact() {
    let mut value = document(1);
    value["methods"]["get_hook"]
        .as_object_mut()
        .unwrap()
        .remove("returns");
    let err = DefinitionLoader::load(&value, "1.yml").unwrap_err();
    match err {
        DefinitionError::MethodKeyMismatch {
            method,
            missing,
            unexpected,
            ..
        } => {
            assert_eq!(method, "get_hook");
            assert_eq!(missing, vec!["returns".to_string()]);
            assert!(unexpected.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut value = document(1);
    value["methods"]["get_hook"]["foo"] = json!("bar");
    let err = DefinitionLoader::load(&value, "1.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::MethodKeyMismatch { ref unexpected, .. } if unexpected == &vec!["foo".to_string()]));
}

#[test]
fn test_load_yaml_str() {
    let definition = DefinitionLoader::load_yaml_str(YAML_V1, "0001.yml").unwrap();
    assert_eq!(definition.version, 1);
    assert!(definition.migration_script.contains("create table"));
    assert_eq!(definition.method("get_hooks").unwrap().mode, "read");

    let err = DefinitionLoader::load_yaml_str("version: [", "0001.yml").unwrap_err();
    assert!(matches!(err, DefinitionError::Parse { .. }));
}

#[test]
fn test_load_dir_sorts_and_checks_contiguity() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("0002.yml"), YAML_V2).unwrap();
    fs::write(dir.path().join("0001.yml"), YAML_V1).unwrap();
    fs::write(dir.path().join("README.md"), "not a definition").unwrap();

    let definitions = DefinitionLoader::load_dir(dir.path()).unwrap();
    let versions: Vec<u32> = definitions.iter().map(|d| d.version).collect();
    assert_eq!(versions, vec![1, 2]);

    fs::write(
        dir.path().join("0004.yml"),
        YAML_V2.replace("version: 2", "version: 4"),
    )
    .unwrap();
    let err = DefinitionLoader::load_dir(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Definition(DefinitionError::VersionGap { expected: 3, found: 4, .. })
    ));
}

#[test]
fn test_load_file_reports_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("0002.yml");
    fs::write(&path, YAML_V1).unwrap();

    let err = DefinitionLoader::load_file(&path).unwrap_err();
    assert!(matches!(err, StoreError::Definition(DefinitionError::VersionMismatch { .. })));

    let err = DefinitionLoader::load_file(dir.path().join("missing.yml")).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}
