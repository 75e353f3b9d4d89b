//! Registries built from extension config files.

use crate::common::{BADGE_SCHEMA, USER_SCHEMA, badge_config, fixture_path, init_logging};
use scim_core::config::ScimCoreConfig;
use scim_core::schema::{Mutability, Returned, SchemaRegistry, SharedSchemaRegistry};
use scim_core::validation::{validate_created_object, validate_returned_attributes};
use scim_core::{BuildError, ExpressionTreeBuilder, ScimError, ValidationError};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Write `content` to a fresh file in the system temp directory.
fn temp_config(content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("scim-extension-{}.json", uuid::Uuid::new_v4()));
    fs::write(&path, content).expect("Failed to write temp config");
    path
}

#[test]
fn test_badge_extension_is_merged_into_users() {
    init_logging();
    let registry = SchemaRegistry::from_config(&badge_config()).unwrap();
    let users = registry.resource_schema("User", &[]).unwrap();

    assert_eq!(users.schemas.len(), 3);
    assert_eq!(users.extension_schemas().last().unwrap(), BADGE_SCHEMA);

    let badge_number = users.find_attribute("badgeNumber").unwrap();
    assert_eq!(badge_number.uri, format!("{}:badgeNumber", BADGE_SCHEMA));
    assert!(badge_number.required);
    assert!(badge_number.case_exact);

    let issued_at = users.find_attribute("issuedAt").unwrap();
    assert_eq!(issued_at.mutability, Mutability::ReadOnly);
    let clearance = users.find_attribute("clearance").unwrap();
    assert_eq!(clearance.returned, Returned::Request);
    assert_eq!(clearance.canonical_values, vec!["public", "internal", "secret"]);

    // Other resource types are untouched
    let groups = registry.resource_schema("Group", &[]).unwrap();
    assert!(!groups.has_schema(BADGE_SCHEMA));
}

#[test]
fn test_extension_rules_on_create() {
    let users = SchemaRegistry::from_config(&badge_config())
        .unwrap()
        .resource_schema("User", &[])
        .unwrap();

    // Absent and undeclared: required extension attributes are not enforced
    let plain = json!({"schemas": [USER_SCHEMA], "userName": "bjensen"});
    assert!(validate_created_object(&plain, &users).is_ok());

    let declared = json!({"schemas": [USER_SCHEMA, BADGE_SCHEMA], "userName": "bjensen"});
    match validate_created_object(&declared, &users) {
        Err(ScimError::Validation(ValidationError::MissingRequiredAttribute { attribute })) => {
            assert_eq!(attribute, format!("{}:badgeNumber", BADGE_SCHEMA));
        }
        other => panic!("Expected MissingRequiredAttribute, got {:?}", other),
    }

    let badged = json!({
        "schemas": [USER_SCHEMA, BADGE_SCHEMA],
        "userName": "bjensen",
        BADGE_SCHEMA: {"badgeNumber": "B-1", "clearance": "Secret"}
    });
    assert!(validate_created_object(&badged, &users).is_ok());

    let forged = json!({
        "schemas": [USER_SCHEMA, BADGE_SCHEMA],
        "userName": "bjensen",
        BADGE_SCHEMA: {"badgeNumber": "B-1", "issuedAt": "2024-01-01T00:00:00Z"}
    });
    assert!(matches!(
        validate_created_object(&forged, &users),
        Err(ScimError::Validation(ValidationError::ReadOnlyMutabilityViolation { .. }))
    ));
}

#[test]
fn test_extension_attributes_in_filters_and_responses() {
    let users = SchemaRegistry::from_config(&badge_config())
        .unwrap()
        .resource_schema("User", &[])
        .unwrap();

    let node = ExpressionTreeBuilder::new(&users)
        .build_tree(r#"badgeNumber eq "B-1" and clearance pr"#)
        .unwrap();
    assert_eq!(node.leaf_count(), 2);

    let mut object = json!({
        "schemas": [USER_SCHEMA, BADGE_SCHEMA],
        "userName": "bjensen",
        BADGE_SCHEMA: {"badgeNumber": "B-1", "clearance": "secret"}
    });
    validate_returned_attributes(&mut object, "", "", &users).unwrap();
    assert_eq!(object[BADGE_SCHEMA], json!({"badgeNumber": "B-1"}));
}

#[test]
fn test_missing_config_file() {
    let config = ScimCoreConfig::default().with_extension_config(fixture_path("missing.json"));
    assert!(matches!(
        SchemaRegistry::from_config(&config),
        Err(BuildError::ConfigIo { .. })
    ));
}

#[test]
fn test_malformed_config_files() {
    let cases = [
        ("[{\"attributeURI\": ", "malformed JSON"),
        (
            r#"[{"attributeURI": "urn:x:badge", "attributeName": "badge", "dataType": "string"}]"#,
            "no root",
        ),
        (
            r#"[{"attributeURI": "urn:x", "attributeName": "urn:x", "dataType": "complex", "subAttributes": "badge"}]"#,
            "missing child",
        ),
        (
            r#"[{"attributeURI": "urn:x", "attributeName": "urn:x", "dataType": "complex", "subAttributes": "a"},
                {"attributeURI": "urn:x:a", "attributeName": "a", "dataType": "whatever"}]"#,
            "bad data type",
        ),
    ];

    for (content, case) in cases {
        let path = temp_config(content);
        let result = SchemaRegistry::from_config(&ScimCoreConfig::default().with_extension_config(&path));
        let _ = fs::remove_file(&path);
        assert!(result.is_err(), "{} should fail", case);
    }
}

#[test]
fn test_extension_for_unknown_resource_type() {
    let config = ScimCoreConfig {
        extension_resource_type: "Device".to_string(),
        ..badge_config()
    };
    assert!(matches!(
        SchemaRegistry::from_config(&config),
        Err(BuildError::UnknownResourceType(_))
    ));
}

#[test]
fn test_shared_registry_does_not_cache_failures() {
    let path = temp_config("not json");
    let shared = SharedSchemaRegistry::new(ScimCoreConfig::default().with_extension_config(&path));

    assert!(shared.get().is_err());
    assert!(!shared.is_initialized());

    fs::copy(fixture_path("badge-extension.json"), &path).unwrap();
    let registry = shared.get().unwrap();
    let _ = fs::remove_file(&path);

    assert!(shared.is_initialized());
    assert!(registry.schema(BADGE_SCHEMA).is_some());
}
