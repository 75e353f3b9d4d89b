//! Schema definitions and the attribute schema registry.
//!
//! This module provides the schema types from RFC 7643, the embedded core
//! schemas, the extension config loader and the registry that merges them
//! into per-resource-type schemas.
//!
//! # Key Types
//!
//! - [`Schema`] - SCIM schema definition with attributes and metadata
//! - [`SchemaRegistry`] - Registry of schemas and resource types
//! - [`ResourceTypeSchema`] - Merged core + extension schema of one resource type
//! - [`SharedSchemaRegistry`] - Lazily built registry shared across requests
//!
//! # Examples
//!
//! ```rust
//! use scim_core::schema::SchemaRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let users = registry.resource_schema("User", &[])?;
//! assert_eq!(
//!     users.resolve_attribute_uri("name.givenName")?,
//!     "urn:ietf:params:scim:schemas:core:2.0:User:name.givenName"
//! );
//! # Ok(())
//! # }
//! ```

pub mod embedded;
pub mod extension;
pub mod registry;
mod resolve;
pub mod shared;
pub mod types;


pub use extension::{load_extension_schema, parse_extension_schema};
pub use registry::SchemaRegistry;
pub use shared::SharedSchemaRegistry;
pub use types::{
    AttributeSchema, AttributeType, Mutability, ResourceTypeSchema, Returned, Schema, Uniqueness,
};
