//! Schema registry for loading, managing, and accessing SCIM schemas.
//!
//! The registry is built once from the embedded core schemas plus the
//! configured extensions and is read-only afterwards. Per-request work goes
//! through [`SchemaRegistry::resource_schema`], which hands out a fresh merged
//! [`ResourceTypeSchema`] for a resource type.

use super::embedded::{self, ENTERPRISE_USER_SCHEMA, RESOURCE_TYPES};
use super::extension::load_extension_schema;
use super::types::{AttributeSchema, AttributeType, Mutability, ResourceTypeSchema, Schema};
use crate::config::ScimCoreConfig;
use crate::error::{BuildError, BuildResult, ScimError, ScimResult};
use log::{debug, info};
use std::collections::HashMap;

/// A resource type known to the registry.
#[derive(Debug, Clone, PartialEq)]
struct ResourceTypeDefinition {
    name: String,
    endpoint: String,
    core_schema: String,
    extensions: Vec<String>,
}

/// Registry of SCIM schemas and the resource types composed from them.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
    resource_types: Vec<ResourceTypeDefinition>,
}

impl SchemaRegistry {
    /// Create a registry with the embedded schemas and the default config.
    pub fn new() -> BuildResult<Self> {
        Self::from_config(&ScimCoreConfig::default())
    }

    /// Create a registry with only the embedded core schemas, no extensions.
    pub fn with_embedded_schemas() -> BuildResult<Self> {
        let mut schemas = HashMap::new();
        let mut resource_types = Vec::new();

        for (name, endpoint, schema_id) in RESOURCE_TYPES {
            let schema = Self::load_embedded(schema_id, Self::embedded_source(schema_id))?;
            schemas.insert(schema.id.clone(), schema);
            resource_types.push(ResourceTypeDefinition {
                name: name.to_string(),
                endpoint: endpoint.to_string(),
                core_schema: schema_id.to_string(),
                extensions: Vec::new(),
            });
        }

        Ok(Self {
            schemas,
            resource_types,
        })
    }

    /// Create a registry from configuration.
    ///
    /// A missing or malformed extension config fails the whole build.
    pub fn from_config(config: &ScimCoreConfig) -> BuildResult<Self> {
        let mut registry = Self::with_embedded_schemas()?;

        if config.enterprise_extension {
            let enterprise =
                Self::load_embedded(ENTERPRISE_USER_SCHEMA, embedded::enterprise_user_schema())?;
            registry.register_extension("User", enterprise)?;
        }

        if let Some(path) = &config.extension_config {
            let extension = load_extension_schema(path)?;
            registry.register_extension(&config.extension_resource_type, extension)?;
        }

        info!(
            "Schema registry built with {} schemas across {} resource types",
            registry.schemas.len(),
            registry.resource_types.len()
        );
        Ok(registry)
    }

    fn embedded_source(schema_id: &str) -> &'static str {
        match schema_id {
            embedded::GROUP_SCHEMA => embedded::core_group_schema(),
            embedded::ROLE_SCHEMA => embedded::role_schema(),
            _ => embedded::core_user_schema(),
        }
    }

    fn load_embedded(schema_id: &'static str, content: &str) -> BuildResult<Schema> {
        let mut schema: Schema = serde_json::from_str(content)
            .map_err(|source| BuildError::EmbeddedSchema { schema_id, source })?;
        schema.assign_uris();
        Ok(schema)
    }

    /// Attach an extension schema to a resource type.
    pub fn register_extension(&mut self, resource_type: &str, mut schema: Schema) -> BuildResult<()> {
        let definition = self
            .resource_types
            .iter_mut()
            .find(|rt| rt.name.eq_ignore_ascii_case(resource_type))
            .ok_or_else(|| BuildError::UnknownResourceType(resource_type.to_string()))?;

        schema.assign_uris();
        if !definition
            .extensions
            .iter()
            .any(|id| id.eq_ignore_ascii_case(&schema.id))
        {
            definition.extensions.push(schema.id.clone());
        }
        debug!("Registered extension {} on {}", schema.id, definition.name);
        self.schemas.insert(schema.id.clone(), schema);
        Ok(())
    }

    /// All registered schemas.
    pub fn schemas(&self) -> Vec<&Schema> {
        let mut schemas: Vec<&Schema> = self.schemas.values().collect();
        schemas.sort_by(|a, b| a.id.cmp(&b.id));
        schemas
    }

    /// Get a schema by URI, ignoring case.
    pub fn schema(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id).or_else(|| {
            self.schemas
                .values()
                .find(|schema| schema.id.eq_ignore_ascii_case(id))
        })
    }

    /// Names of the registered resource types.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resource_types.iter().map(|rt| rt.name.as_str())
    }

    /// Build the merged schema of a resource type.
    ///
    /// The core schema is combined with the registered extensions followed by
    /// `backend_extensions`. Every call returns a fresh deep copy, so callers
    /// may modify the result freely; repeated calls with the same inputs yield
    /// equal schemas.
    pub fn resource_schema(
        &self,
        resource_type: &str,
        backend_extensions: &[Schema],
    ) -> ScimResult<ResourceTypeSchema> {
        let definition = self
            .resource_types
            .iter()
            .find(|rt| rt.name.eq_ignore_ascii_case(resource_type))
            .ok_or_else(|| {
                ScimError::not_found(format!("Resource type '{}' is not registered", resource_type))
            })?;
        let core = self.schemas.get(&definition.core_schema).ok_or_else(|| {
            ScimError::internal(format!(
                "Core schema '{}' missing from registry",
                definition.core_schema
            ))
        })?;

        let mut merged = ResourceTypeSchema {
            name: definition.name.clone(),
            endpoint: definition.endpoint.clone(),
            schemas: vec![core.id.clone()],
            attributes: core.attributes.clone(),
        };

        let registered = definition
            .extensions
            .iter()
            .filter_map(|id| self.schemas.get(id))
            .cloned();
        for mut extension in registered.chain(backend_extensions.iter().cloned()) {
            if merged.has_schema(&extension.id) {
                continue;
            }
            extension.assign_uris();
            merged.schemas.push(extension.id.clone());
            merged.attributes.push(Self::extension_attribute(extension));
        }

        Ok(merged)
    }

    /// Wrap an extension schema as the complex attribute carrying its data.
    fn extension_attribute(extension: Schema) -> AttributeSchema {
        AttributeSchema {
            name: extension.id.clone(),
            uri: extension.id,
            description: extension.description,
            mutability: Mutability::ReadWrite,
            sub_attributes: extension.attributes,
            ..AttributeSchema::new("", AttributeType::Complex)
        }
    }

    /// Look up an attribute definition by its canonical URI, ignoring case.
    pub fn attribute_by_uri(&self, uri: &str) -> ScimResult<&AttributeSchema> {
        fn search<'a>(attributes: &'a [AttributeSchema], uri: &str) -> Option<&'a AttributeSchema> {
            attributes.iter().find_map(|attr| {
                if attr.uri.eq_ignore_ascii_case(uri) {
                    Some(attr)
                } else {
                    search(&attr.sub_attributes, uri)
                }
            })
        }

        self.schemas
            .values()
            .find_map(|schema| search(&schema.attributes, uri))
            .ok_or_else(|| ScimError::not_found(format!("No attribute with URI '{}'", uri)))
    }
}
