//! Embedded core SCIM schemas.
//!
//! The schema documents live under `schemas/` in the crate root and are
//! compiled into the library, so building a registry needs no schema files
//! at runtime.

pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const ROLE_SCHEMA: &str = "urn:ietf:params:scim:schemas:extension:2.0:Role";
pub const ENTERPRISE_USER_SCHEMA: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// The core User schema (RFC 7643 §4.1).
pub fn core_user_schema() -> &'static str {
    include_str!("../../schemas/User.json")
}

/// The core Group schema (RFC 7643 §4.2).
pub fn core_group_schema() -> &'static str {
    include_str!("../../schemas/Group.json")
}

/// The Role schema.
pub fn role_schema() -> &'static str {
    include_str!("../../schemas/Role.json")
}

/// The enterprise User extension (RFC 7643 §4.3).
pub fn enterprise_user_schema() -> &'static str {
    include_str!("../../schemas/EnterpriseUser.json")
}

/// Built-in resource types: name, endpoint, core schema.
pub(crate) const RESOURCE_TYPES: [(&str, &str, &str); 3] = [
    ("User", "/Users", USER_SCHEMA),
    ("Group", "/Groups", GROUP_SCHEMA),
    ("Role", "/Roles", ROLE_SCHEMA),
];
