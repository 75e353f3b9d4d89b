//! Full request flows through the resource manager and in-memory storage.

use crate::common::{
    BADGE_SCHEMA, ENTERPRISE_SCHEMA, GROUP_SCHEMA, USER_SCHEMA, badge_config, fixtures,
    init_logging,
};
use scim_core::config::ScimCoreConfig;
use scim_core::schema::{AttributeSchema, AttributeType, Schema, SharedSchemaRegistry};
use scim_core::storage::InMemoryStorage;
use scim_core::{ResourceManager, ResourceStorage, ScimQuery};
use serde_json::{Value, json};

fn manager_with(config: ScimCoreConfig, storage: InMemoryStorage) -> ResourceManager<InMemoryStorage> {
    init_logging();
    ResourceManager::new(SharedSchemaRegistry::new(config), storage)
}

fn manager() -> ResourceManager<InMemoryStorage> {
    manager_with(ScimCoreConfig::default(), InMemoryStorage::new())
}

async fn create(manager: &ResourceManager<InMemoryStorage>, resource_type: &str, body: Value) -> Value {
    let response = manager
        .create(resource_type, &body.to_string(), &ScimQuery::default())
        .await;
    assert_eq!(response.status, 201, "{}", response.body);
    response.body
}

#[tokio::test]
async fn test_user_lifecycle() {
    let manager = manager();

    let created = create(&manager, "User", fixtures::enterprise_user()).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created[ENTERPRISE_SCHEMA]["employeeNumber"], "701984");
    assert!(created.get("password").is_none());
    assert_eq!(created["meta"]["location"], format!("/Users/{}", id));

    // Replace: meta/id from the client are ignored, absent attributes survive
    let replacement = json!({
        "schemas": [USER_SCHEMA, ENTERPRISE_SCHEMA],
        "id": "forged",
        "userName": "bjensen@example.com",
        "title": "Head Tour Guide",
        "nickName": null
    });
    let replaced = manager
        .replace("User", &id, &replacement.to_string(), &ScimQuery::default())
        .await;
    assert_eq!(replaced.status, 200, "{}", replaced.body);
    assert_eq!(replaced.body["id"], id.as_str());
    assert_eq!(replaced.body["title"], "Head Tour Guide");
    assert!(replaced.body.get("nickName").is_none());
    assert_eq!(replaced.body["displayName"], "Babs Jensen");
    assert_eq!(replaced.body["meta"]["created"], created["meta"]["created"]);

    let fetched = manager
        .get("User", &id, &ScimQuery::default().with_attributes("title"))
        .await;
    assert_eq!(fetched.status, 200);
    let mut keys: Vec<&String> = fetched.body.as_object().unwrap().keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["id", "schemas", "title"]);

    assert_eq!(manager.delete("User", &id).await.status, 204);
    assert_eq!(manager.get("User", &id, &ScimQuery::default()).await.status, 404);
}

#[tokio::test]
async fn test_filtered_listing_scenario() {
    let manager = manager();
    // Records stored with string-valued booleans, as some backends hold them
    for (user_name, active) in [("bjensen", "true"), ("jsmith", "false")] {
        let storage_record = json!({"userName": user_name, "active": active});
        let schema = manager
            .registry()
            .get()
            .unwrap()
            .resource_schema("User", &[])
            .unwrap();
        manager
            .storage()
            .create(&schema, storage_record)
            .await
            .unwrap();
    }

    let query = ScimQuery::default()
        .with_filter(r#"(userName eq "bjensen" or userName eq "jsmith") and active eq "true""#);
    let response = manager.list("User", &query).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["totalResults"], 1);
    assert_eq!(response.body["Resources"][0]["userName"], "bjensen");
}

#[tokio::test]
async fn test_groups_and_roles() {
    let manager = manager();
    let user = create(&manager, "User", fixtures::user_minimal()).await;
    let user_id = user["id"].as_str().unwrap();

    let group = json!({
        "schemas": [GROUP_SCHEMA],
        "displayName": "Tour Guides",
        "members": [{"value": user_id, "type": "User"}]
    });
    create(&manager, "Group", group).await;

    let query = ScimQuery::default().with_filter(format!("members.value eq \"{}\"", user_id));
    let response = manager.list("Group", &query).await;
    assert_eq!(response.body["totalResults"], 1);

    // A user payload posted to the Group endpoint is a different resource type
    let response = manager
        .create("Group", &fixtures::user_minimal().to_string(), &ScimQuery::default())
        .await;
    assert_eq!(response.status, 500);
    assert!(response.body.get("scimType").is_none());

    let role = json!({
        "schemas": ["urn:ietf:params:scim:schemas:extension:2.0:Role"],
        "displayName": "auditor",
        "permissions": ["read"]
    });
    let created = create(&manager, "Role", role).await;
    assert!(created.get("permissions").is_none());

    let response = manager
        .list("Role", &ScimQuery::default().with_attributes("permissions"))
        .await;
    assert_eq!(response.body["Resources"][0]["permissions"], json!(["read"]));
}

#[tokio::test]
async fn test_config_and_backend_extensions() {
    let cost = Schema {
        id: "urn:example:scim:schemas:extension:cost:2.0:User".to_string(),
        name: "Cost".to_string(),
        description: "Billing data kept by the backend".to_string(),
        attributes: vec![AttributeSchema::new("ledger", AttributeType::String)],
    };
    let manager = manager_with(
        badge_config(),
        InMemoryStorage::new().with_extension("User", cost),
    );

    let body = json!({
        "schemas": [USER_SCHEMA, BADGE_SCHEMA, "urn:example:scim:schemas:extension:cost:2.0:User"],
        "userName": "bjensen",
        BADGE_SCHEMA: {"badgeNumber": "B-7"},
        "urn:example:scim:schemas:extension:cost:2.0:User": {"ledger": "L-42"}
    });
    let created = create(&manager, "User", body).await;
    assert_eq!(created["urn:example:scim:schemas:extension:cost:2.0:User"]["ledger"], "L-42");

    let query = ScimQuery::default().with_filter(r#"ledger eq "L-42" and badgeNumber eq "B-7""#);
    let response = manager.list("User", &query).await;
    assert_eq!(response.body["totalResults"], 1);
}

#[tokio::test]
async fn test_error_payloads() {
    let manager = manager();

    let response = manager
        .list("User", &ScimQuery::default().with_filter("userName eq"))
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(
        response.body,
        json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:Error"],
            "status": "400",
            "detail": "Invalid filter: Operator 'eq' on 'userName' requires a comparison value",
            "scimType": "invalidFilter"
        })
    );

    let long = format!("userName eq \"{}\"", "x".repeat(5000));
    let response = manager.list("User", &ScimQuery::default().with_filter(long)).await;
    assert_eq!(response.body["scimType"], "tooMany");

    let query = ScimQuery::default()
        .with_attributes("userName")
        .with_excluded_attributes("emails");
    let response = manager.list("User", &query).await;
    assert_eq!(response.status, 400);
}
