//! Storage abstraction for SCIM resources.
//!
//! The [`ResourceStorage`] trait is the backend contract: persistence of
//! validated resources plus filtered listing. Backends receive filters as
//! parsed [`Node`] trees and either translate them into a native query by
//! implementing [`NodeVisitor`](crate::filter::NodeVisitor), or evaluate them
//! against stored records with [`FilterEvaluator`](crate::filter::FilterEvaluator)
//! as [`InMemoryStorage`] does.
//!
//! The storage layer is responsible for:
//! - Assigning resource ids and stamping server-managed `meta` attributes
//! - Persisting and retrieving JSON resources per resource type
//! - Evaluating filters
//!
//! It is NOT responsible for schema validation or response shaping; the
//! [`ResourceManager`](crate::manager::ResourceManager) does both before and
//! after calling into storage.
//!
//! # Example Usage
//!
//! ```rust
//! use scim_core::schema::SchemaRegistry;
//! use scim_core::storage::{InMemoryStorage, ResourceStorage};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let users = SchemaRegistry::new()?.resource_schema("User", &[])?;
//! let storage = InMemoryStorage::new();
//!
//! let created = storage
//!     .create(&users, json!({"userName": "bjensen"}))
//!     .await?;
//! let id = created["id"].as_str().unwrap();
//!
//! assert!(storage.get("User", id).await?.is_some());
//! assert!(storage.delete("User", id).await?);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;

pub use errors::StorageError;
pub use in_memory::InMemoryStorage;

use crate::filter::Node;
use crate::schema::{ResourceTypeSchema, Schema};
use serde_json::Value;
use std::future::Future;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Core trait for storage backends.
///
/// Resources arrive already validated and merged; the backend owns `id` and
/// the server-managed parts of `meta`. Operations are scoped by resource type
/// name, matched case-insensitively against the schema's `name`.
///
/// # Key Design Decisions
///
/// - **Create assigns the id**: the returned value is the stored resource,
///   including its `id` and `meta`.
/// - **Replace is not upsert**: replacing a missing resource fails with
///   [`StorageError::ResourceNotFound`].
/// - **DELETE returns boolean**: allows 204 vs 404 selection.
pub trait ResourceStorage: Send + Sync {
    /// Store a new resource and return it as stored.
    fn create(
        &self,
        schema: &ResourceTypeSchema,
        resource: Value,
    ) -> impl Future<Output = StorageResult<Value>> + Send;

    /// Retrieve a resource by id.
    ///
    /// `Some(resource)` if it exists, `None` otherwise.
    fn get(
        &self,
        resource_type: &str,
        id: &str,
    ) -> impl Future<Output = StorageResult<Option<Value>>> + Send;

    /// Replace an existing resource and return it as stored.
    fn replace(
        &self,
        schema: &ResourceTypeSchema,
        id: &str,
        resource: Value,
    ) -> impl Future<Output = StorageResult<Value>> + Send;

    /// Delete a resource by id.
    ///
    /// `true` if the resource was deleted, `false` if it didn't exist.
    fn delete(&self, resource_type: &str, id: &str)
    -> impl Future<Output = StorageResult<bool>> + Send;

    /// List every resource of the type matching `filter`, in a stable order.
    ///
    /// `None` lists all resources. Pagination is applied by the caller.
    fn list(
        &self,
        schema: &ResourceTypeSchema,
        filter: Option<&Node>,
    ) -> impl Future<Output = StorageResult<Vec<Value>>> + Send;

    /// Extension schemas this backend contributes to a resource type.
    ///
    /// Merged after the registry's own extensions when the resource type
    /// schema is built for a request.
    fn schema_extensions(&self, _resource_type: &str) -> Vec<Schema> {
        Vec::new()
    }
}
