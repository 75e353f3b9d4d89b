//! Resource validation against a merged resource type schema.
//!
//! Three entry points, all pure functions of their inputs:
//!
//! - [`validate_created_object`] checks a client payload for a create
//! - [`validate_updated_object`] checks a replacement and returns the merged
//!   resource, leaving the old one untouched
//! - [`validate_returned_attributes`] trims a resource for a response
//!   according to `attributes` / `excludedAttributes`
//!
//! [`AttributeSelection`] parses those two parameters once so the same
//! trimming can be applied to every resource in a list response.

pub mod create;
pub mod returned;
pub mod update;
pub mod values;

pub use create::validate_created_object;
pub use returned::{AttributeSelection, validate_returned_attributes};
pub use update::validate_updated_object;

use crate::error::{ScimError, ScimResult, ValidationError};
use crate::schema::{Mutability, ResourceTypeSchema};
use serde_json::{Map, Value};
use values::{is_empty_value, lookup_key};

/// Name of the attribute listing a resource's schema URIs.
pub const SCHEMAS: &str = "schemas";

/// Read the `schemas` URIs a resource declares and check them against the
/// resource type.
///
/// No overlap at all means the object belongs to a different resource type
/// and fails with [`ScimError::SchemaMismatch`]; an overlapping list with a
/// URI the resource type does not know is a client error.
fn declared_schemas(
    object: &Map<String, Value>,
    schema: &ResourceTypeSchema,
) -> ScimResult<Option<Vec<String>>> {
    let Some((_, declared)) = lookup_key(object, SCHEMAS) else {
        return Ok(None);
    };

    let declared: Vec<String> = match declared {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ValidationError::invalid_type(SCHEMAS, "string", values::value_type(item))
                })
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(
                ValidationError::invalid_type(SCHEMAS, "array", values::value_type(other)).into(),
            );
        }
    };

    if !declared.iter().any(|uri| schema.has_schema(uri)) {
        return Err(ScimError::SchemaMismatch {
            declared,
            expected: schema.schemas.clone(),
        });
    }
    if let Some(unknown) = declared.iter().find(|uri| !schema.has_schema(uri)) {
        return Err(ValidationError::UnknownSchemaUri {
            uri: unknown.clone(),
        }
        .into());
    }

    Ok(Some(declared))
}

/// Every writable required attribute must be present and non-empty.
///
/// Extension attributes are checked only when the extension block is
/// present or declared.
fn check_required(
    object: &Map<String, Value>,
    schema: &ResourceTypeSchema,
    declared: &[String],
) -> Result<(), ValidationError> {
    for attribute in schema.core_attributes() {
        if !attribute.required || attribute.mutability == Mutability::ReadOnly {
            continue;
        }
        if lookup_key(object, &attribute.name).is_none_or(|(_, v)| is_empty_value(v)) {
            return Err(ValidationError::missing_required(&attribute.name));
        }
    }

    for extension in schema.extension_attributes() {
        let block = lookup_key(object, &extension.name).map(|(_, v)| v);
        let declared = declared.iter().any(|uri| uri.eq_ignore_ascii_case(&extension.name));
        if block.is_none() && !declared {
            continue;
        }
        for attribute in &extension.sub_attributes {
            if !attribute.required || attribute.mutability == Mutability::ReadOnly {
                continue;
            }
            let value = block.and_then(|b| values::lookup(b, &attribute.name));
            if value.is_none_or(is_empty_value) {
                return Err(ValidationError::missing_required(format!(
                    "{}:{}",
                    extension.name, attribute.name
                )));
            }
        }
    }

    Ok(())
}
