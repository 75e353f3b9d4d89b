//! Request-manager boundary.
//!
//! [`ResourceManager`] orchestrates one SCIM operation end to end: it builds
//! the resource type schema (including extensions the storage backend
//! contributes), decodes and validates the payload, parses the filter, calls
//! into storage and shapes the response. Every failure is caught here and
//! rendered as a SCIM error payload, so callers always receive a
//! [`ScimResponse`] and never a Rust error.

use crate::error::{ScimError, ScimResult, ScimType};
use crate::filter::parse_filter;
use crate::schema::{ResourceTypeSchema, SharedSchemaRegistry};
use crate::storage::{ResourceStorage, StorageError};
use crate::validation::{AttributeSelection, validate_created_object, validate_updated_object};
use log::{debug, info, warn};
use serde_json::{Value, json};

/// Schema URI of the SCIM list response message.
pub const LIST_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// Transport-agnostic response: an HTTP-equivalent status and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimResponse {
    pub status: u16,
    /// `Value::Null` for responses without content
    pub body: Value,
}

impl ScimResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Render an error as its SCIM error payload.
    pub fn from_error(error: &ScimError) -> Self {
        Self {
            status: error.status(),
            body: serde_json::to_value(error.to_response()).unwrap_or_default(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Query parameters of a SCIM request.
///
/// `attributes` and `excluded_attributes` apply to every operation returning
/// resources; `filter`, `start_index` and `count` only to list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScimQuery {
    /// Filter expression
    pub filter: Option<String>,
    /// Comma-separated attributes to return
    pub attributes: Option<String>,
    /// Comma-separated attributes to leave out
    pub excluded_attributes: Option<String>,
    /// 1-based index of the first result
    pub start_index: Option<usize>,
    /// Maximum number of results per page
    pub count: Option<usize>,
}

impl ScimQuery {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_attributes(mut self, attributes: impl Into<String>) -> Self {
        self.attributes = Some(attributes.into());
        self
    }

    pub fn with_excluded_attributes(mut self, excluded: impl Into<String>) -> Self {
        self.excluded_attributes = Some(excluded.into());
        self
    }

    pub fn with_page(mut self, start_index: usize, count: usize) -> Self {
        self.start_index = Some(start_index);
        self.count = Some(count);
        self
    }

    fn selection<'s>(&self, schema: &'s ResourceTypeSchema) -> ScimResult<AttributeSelection<'s>> {
        AttributeSelection::new(
            self.attributes.as_deref().unwrap_or_default(),
            self.excluded_attributes.as_deref().unwrap_or_default(),
            schema,
        )
    }
}

/// Orchestrates SCIM operations over a storage backend.
pub struct ResourceManager<S: ResourceStorage> {
    registry: SharedSchemaRegistry,
    storage: S,
}

impl<S: ResourceStorage> ResourceManager<S> {
    pub fn new(registry: SharedSchemaRegistry, storage: S) -> Self {
        Self { registry, storage }
    }

    pub fn registry(&self) -> &SharedSchemaRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Create a resource from a JSON payload. 201 on success.
    pub async fn create(&self, resource_type: &str, body: &str, query: &ScimQuery) -> ScimResponse {
        match self.try_create(resource_type, body, query).await {
            Ok(resource) => ScimResponse::new(201, resource),
            Err(e) => Self::error_response("create", resource_type, e),
        }
    }

    /// Fetch a resource by id. 200 on success.
    pub async fn get(&self, resource_type: &str, id: &str, query: &ScimQuery) -> ScimResponse {
        match self.try_get(resource_type, id, query).await {
            Ok(resource) => ScimResponse::new(200, resource),
            Err(e) => Self::error_response("get", resource_type, e),
        }
    }

    /// Replace a resource with a JSON payload (PUT). 200 on success.
    pub async fn replace(
        &self,
        resource_type: &str,
        id: &str,
        body: &str,
        query: &ScimQuery,
    ) -> ScimResponse {
        match self.try_replace(resource_type, id, body, query).await {
            Ok(resource) => ScimResponse::new(200, resource),
            Err(e) => Self::error_response("replace", resource_type, e),
        }
    }

    /// Delete a resource by id. 204 on success.
    pub async fn delete(&self, resource_type: &str, id: &str) -> ScimResponse {
        match self.try_delete(resource_type, id).await {
            Ok(()) => ScimResponse::new(204, Value::Null),
            Err(e) => Self::error_response("delete", resource_type, e),
        }
    }

    /// List resources matching the query's filter as a ListResponse.
    pub async fn list(&self, resource_type: &str, query: &ScimQuery) -> ScimResponse {
        match self.try_list(resource_type, query).await {
            Ok(envelope) => ScimResponse::new(200, envelope),
            Err(e) => Self::error_response("list", resource_type, e),
        }
    }

    fn resource_schema(&self, resource_type: &str) -> ScimResult<ResourceTypeSchema> {
        let registry = self.registry.get()?;
        registry.resource_schema(resource_type, &self.storage.schema_extensions(resource_type))
    }

    async fn try_create(
        &self,
        resource_type: &str,
        body: &str,
        query: &ScimQuery,
    ) -> ScimResult<Value> {
        let schema = self.resource_schema(resource_type)?;
        let selection = query.selection(&schema)?;
        let object = decode(body)?;
        validate_created_object(&object, &schema)?;

        let mut stored = self
            .storage
            .create(&schema, object)
            .await
            .map_err(storage_error)?;
        info!(
            "Created {} {}",
            schema.name,
            stored["id"].as_str().unwrap_or_default()
        );
        selection.apply(&mut stored)?;
        Ok(stored)
    }

    async fn try_get(&self, resource_type: &str, id: &str, query: &ScimQuery) -> ScimResult<Value> {
        let schema = self.resource_schema(resource_type)?;
        let selection = query.selection(&schema)?;
        let mut resource = self.fetch(&schema, id).await?;
        selection.apply(&mut resource)?;
        Ok(resource)
    }

    async fn try_replace(
        &self,
        resource_type: &str,
        id: &str,
        body: &str,
        query: &ScimQuery,
    ) -> ScimResult<Value> {
        let schema = self.resource_schema(resource_type)?;
        let selection = query.selection(&schema)?;
        let object = decode(body)?;
        let old = self.fetch(&schema, id).await?;
        let merged = validate_updated_object(&old, &object, &schema)?;

        let mut stored = self
            .storage
            .replace(&schema, id, merged)
            .await
            .map_err(storage_error)?;
        info!("Replaced {} {}", schema.name, id);
        selection.apply(&mut stored)?;
        Ok(stored)
    }

    async fn try_delete(&self, resource_type: &str, id: &str) -> ScimResult<()> {
        let schema = self.resource_schema(resource_type)?;
        if !self
            .storage
            .delete(&schema.name, id)
            .await
            .map_err(storage_error)?
        {
            return Err(not_found(&schema, id));
        }
        info!("Deleted {} {}", schema.name, id);
        Ok(())
    }

    async fn try_list(&self, resource_type: &str, query: &ScimQuery) -> ScimResult<Value> {
        let schema = self.resource_schema(resource_type)?;
        let selection = query.selection(&schema)?;
        let limits = self.registry.config().filter;
        let filter = parse_filter(query.filter.as_deref().unwrap_or_default(), &schema, limits)?;
        if let Some(filter) = &filter {
            debug!("Listing {} with filter {}", schema.name, filter);
        }

        let matched = self
            .storage
            .list(&schema, filter.as_ref())
            .await
            .map_err(storage_error)?;
        let total = matched.len();
        let start_index = query.start_index.unwrap_or(1).max(1);
        let count = query.count.unwrap_or(usize::MAX);

        let resources = matched
            .into_iter()
            .skip(start_index - 1)
            .take(count)
            .map(|mut resource| {
                selection.apply(&mut resource)?;
                Ok(resource)
            })
            .collect::<ScimResult<Vec<_>>>()?;

        Ok(json!({
            "schemas": [LIST_RESPONSE_SCHEMA],
            "totalResults": total,
            "startIndex": start_index,
            "itemsPerPage": resources.len(),
            "Resources": resources,
        }))
    }

    async fn fetch(&self, schema: &ResourceTypeSchema, id: &str) -> ScimResult<Value> {
        self.storage
            .get(&schema.name, id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| not_found(schema, id))
    }

    fn error_response(operation: &str, resource_type: &str, error: ScimError) -> ScimResponse {
        if error.is_client_error() {
            debug!("Rejected {} on {}: {}", operation, resource_type, error);
        } else {
            warn!("Failed {} on {}: {}", operation, resource_type, error);
        }
        ScimResponse::from_error(&error)
    }
}

/// Decode a request payload.
fn decode(body: &str) -> ScimResult<Value> {
    serde_json::from_str(body).map_err(|e| {
        ScimError::bad_request(
            format!("Malformed JSON payload: {}", e),
            Some(ScimType::InvalidSyntax),
        )
    })
}

fn not_found(schema: &ResourceTypeSchema, id: &str) -> ScimError {
    ScimError::not_found(format!("{} '{}' not found", schema.name, id))
}

/// A missing resource surfaces as 404; any other storage failure as 500.
fn storage_error(error: StorageError) -> ScimError {
    match error {
        StorageError::ResourceNotFound { resource_type, id } => {
            ScimError::not_found(format!("{} '{}' not found", resource_type, id))
        }
        other => other.into(),
    }
}
