//! In-memory storage implementation for SCIM resources.
//!
//! A thread-safe [`ResourceStorage`] backed by nested `HashMap`s under a tokio
//! `RwLock`. It is the reference backend: filters are evaluated directly
//! against the stored JSON with [`FilterEvaluator`]. Suitable for testing,
//! development, and hosts that don't need persistence.
//!
//! # Performance Characteristics
//!
//! * CREATE/GET/REPLACE/DELETE: O(1) average case
//! * LIST: O(n log n) in the number of resources of the type, plus filter
//!   evaluation per resource

use crate::filter::{FilterEvaluator, Node};
use crate::schema::{ResourceTypeSchema, Schema};
use crate::storage::{ResourceStorage, StorageError, StorageResult};
use chrono::{SecondsFormat, Utc};
use log::trace;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory storage.
///
/// Structure: `resource_type` (lowercase) → `id` → resource. Clones share
/// the same underlying data.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<HashMap<String, HashMap<String, Value>>>>,
    extensions: HashMap<String, Vec<Schema>>,
}

impl InMemoryStorage {
    /// Create a new empty in-memory storage instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contribute an extension schema to `resource_type`.
    pub fn with_extension(mut self, resource_type: &str, schema: Schema) -> Self {
        self.extensions
            .entry(type_key(resource_type))
            .or_default()
            .push(schema);
        self
    }

    /// Number of stored resources of a type.
    pub async fn count(&self, resource_type: &str) -> usize {
        let data_guard = self.data.read().await;
        data_guard
            .get(&type_key(resource_type))
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

fn type_key(resource_type: &str) -> String {
    resource_type.to_ascii_lowercase()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn version_tag(version: u64) -> String {
    format!("W/\"{}\"", version)
}

/// Version number of a stored resource's weak ETag, 0 when absent.
fn stored_version(resource: &Value) -> u64 {
    resource
        .pointer("/meta/version")
        .and_then(Value::as_str)
        .and_then(|tag| tag.trim_start_matches("W/").trim_matches('"').parse().ok())
        .unwrap_or(0)
}

fn into_fields(resource: Value) -> StorageResult<Map<String, Value>> {
    match resource {
        Value::Object(fields) => Ok(fields),
        _ => Err(StorageError::invalid_data("Resource must be a JSON object")),
    }
}

/// Set `id` and `meta`, replacing any differently-cased keys.
fn stamp(
    fields: &mut Map<String, Value>,
    schema: &ResourceTypeSchema,
    id: &str,
    created: &str,
    version: u64,
) {
    fields.retain(|key, _| {
        !key.eq_ignore_ascii_case("id") && !key.eq_ignore_ascii_case("meta")
    });
    fields.insert("id".to_string(), Value::String(id.to_string()));
    fields.insert(
        "meta".to_string(),
        json!({
            "resourceType": schema.name,
            "created": created,
            "lastModified": timestamp(),
            "location": format!("{}/{}", schema.endpoint, id),
            "version": version_tag(version),
        }),
    );
}

impl ResourceStorage for InMemoryStorage {
    async fn create(&self, schema: &ResourceTypeSchema, resource: Value) -> StorageResult<Value> {
        let mut fields = into_fields(resource)?;
        let id = Uuid::new_v4().to_string();
        stamp(&mut fields, schema, &id, &timestamp(), 1);
        let resource = Value::Object(fields);

        let mut data_guard = self.data.write().await;
        let type_data = data_guard.entry(type_key(&schema.name)).or_default();
        if type_data.contains_key(&id) {
            return Err(StorageError::ResourceAlreadyExists {
                resource_type: schema.name.clone(),
                id,
            });
        }
        type_data.insert(id.clone(), resource.clone());
        trace!("Stored {} {}", schema.name, id);
        Ok(resource)
    }

    async fn get(&self, resource_type: &str, id: &str) -> StorageResult<Option<Value>> {
        let data_guard = self.data.read().await;
        Ok(data_guard
            .get(&type_key(resource_type))
            .and_then(|type_data| type_data.get(id))
            .cloned())
    }

    async fn replace(
        &self,
        schema: &ResourceTypeSchema,
        id: &str,
        resource: Value,
    ) -> StorageResult<Value> {
        let mut fields = into_fields(resource)?;

        let mut data_guard = self.data.write().await;
        let existing = data_guard
            .get_mut(&type_key(&schema.name))
            .and_then(|type_data| type_data.get_mut(id))
            .ok_or_else(|| StorageError::resource_not_found(&schema.name, id))?;

        let created = existing
            .pointer("/meta/created")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(timestamp);
        stamp(&mut fields, schema, id, &created, stored_version(existing) + 1);
        *existing = Value::Object(fields);
        Ok(existing.clone())
    }

    async fn delete(&self, resource_type: &str, id: &str) -> StorageResult<bool> {
        let mut data_guard = self.data.write().await;
        Ok(data_guard
            .get_mut(&type_key(resource_type))
            .is_some_and(|type_data| type_data.remove(id).is_some()))
    }

    async fn list(
        &self,
        schema: &ResourceTypeSchema,
        filter: Option<&Node>,
    ) -> StorageResult<Vec<Value>> {
        let data_guard = self.data.read().await;
        let Some(type_data) = data_guard.get(&type_key(&schema.name)) else {
            return Ok(Vec::new());
        };

        // Sort by id for consistent ordering
        let mut ids: Vec<&String> = type_data.keys().collect();
        ids.sort();

        Ok(ids
            .into_iter()
            .filter_map(|id| type_data.get(id))
            .filter(|record| {
                filter.is_none_or(|node| FilterEvaluator::new(schema, record).matches(node))
            })
            .cloned()
            .collect())
    }

    fn schema_extensions(&self, resource_type: &str) -> Vec<Schema> {
        self.extensions
            .get(&type_key(resource_type))
            .cloned()
            .unwrap_or_default()
    }
}
