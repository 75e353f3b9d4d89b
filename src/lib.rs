//! SCIM 2.0 protocol core for Rust.
//!
//! Schema-driven attribute model, filter parser and evaluator, and resource
//! validation that let a host identity system expose standards-compliant
//! SCIM User, Group and Role endpoints while delegating storage to a
//! pluggable backend.
//!
//! # Core Components
//!
//! - [`SchemaRegistry`] - Core and extension schemas merged per resource type
//! - [`ExpressionTreeBuilder`] - Filter strings parsed into [`Node`] trees
//! - [`validation`] - Create, replace and returned-attribute checks
//! - [`ResourceStorage`] - Trait for implementing storage backends
//! - [`ResourceManager`] - Operations end to end, errors as SCIM payloads
//!
//! # Quick Start
//!
//! ```rust
//! use scim_core::{ResourceManager, ScimCoreConfig, ScimQuery, SharedSchemaRegistry};
//! use scim_core::storage::InMemoryStorage;
//!
//! # async fn example() {
//! let registry = SharedSchemaRegistry::new(ScimCoreConfig::default());
//! let manager = ResourceManager::new(registry, InMemoryStorage::new());
//!
//! let body = r#"{"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "userName": "bjensen"}"#;
//! let created = manager.create("User", body, &ScimQuery::default()).await;
//! assert_eq!(created.status, 201);
//!
//! let query = ScimQuery::default().with_filter(r#"userName eq "bjensen""#);
//! let listed = manager.list("User", &query).await;
//! assert_eq!(listed.body["totalResults"], 1);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod manager;
pub mod schema;
pub mod storage;
pub mod validation;

// Re-export commonly used types for convenience
pub use config::{FilterLimits, ScimCoreConfig};
pub use error::{
    BuildError, BuildResult, ErrorResponse, FilterError, ScimError, ScimResult, ScimType,
    ValidationError, ValidationResult,
};
pub use filter::{ExpressionTreeBuilder, Node, NodeVisitor, parse_filter};
pub use manager::{ResourceManager, ScimQuery, ScimResponse};
pub use schema::{
    AttributeSchema, AttributeType, ResourceTypeSchema, Schema, SchemaRegistry,
    SharedSchemaRegistry,
};
pub use storage::{InMemoryStorage, ResourceStorage, StorageError};
