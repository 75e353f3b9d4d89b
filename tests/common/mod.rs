//! Common test utilities for the SCIM core integration tests.
//!
//! Schema and registry helpers, logging setup, and RFC 7643 example
//! resources shared by every integration test module.

use scim_core::config::ScimCoreConfig;
use scim_core::filter::Node;
use scim_core::schema::{ResourceTypeSchema, SchemaRegistry};
use scim_core::{ExpressionTreeBuilder, FilterError};
use std::path::PathBuf;

pub mod fixtures;

pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const ENTERPRISE_SCHEMA: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
pub const BADGE_SCHEMA: &str = "urn:example:scim:schemas:extension:badge:2.0:User";

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Config attaching the badge extension fixture to User.
pub fn badge_config() -> ScimCoreConfig {
    ScimCoreConfig::default().with_extension_config(fixture_path("badge-extension.json"))
}

/// Merged schema of a resource type from the default registry.
pub fn resource_schema(resource_type: &str) -> ResourceTypeSchema {
    init_logging();
    SchemaRegistry::new()
        .expect("Failed to create registry")
        .resource_schema(resource_type, &[])
        .expect("Resource type not registered")
}

pub fn users() -> ResourceTypeSchema {
    resource_schema("User")
}

/// Build a filter against the User schema.
pub fn build_user_filter(filter: &str) -> Result<Node, FilterError> {
    ExpressionTreeBuilder::new(&users()).build_tree(filter)
}

/// Canonical URI of a core User attribute path.
pub fn user_uri(path: &str) -> String {
    format!("{}:{}", USER_SCHEMA, path)
}
