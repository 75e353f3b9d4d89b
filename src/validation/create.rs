//! Validation of client payloads for resource creation.

use super::values::{lookup_key, validate_attribute};
use super::{SCHEMAS, check_required, declared_schemas};
use crate::error::{ScimResult, ValidationError};
use crate::schema::{AttributeSchema, ResourceTypeSchema};
use log::debug;
use serde_json::Value;

/// Validate an object a client submitted for creation.
///
/// Fails with `SchemaMismatch` when the declared `schemas` do not overlap the
/// resource type's schemas at all, and with a validation error for unknown
/// attributes, read-only attributes supplied by the client, type or
/// multiplicity violations, and missing required attributes.
pub fn validate_created_object(object: &Value, schema: &ResourceTypeSchema) -> ScimResult<()> {
    let object = object.as_object().ok_or(ValidationError::NotAnObject)?;
    let declared = declared_schemas(object, schema)?.ok_or_else(|| {
        ValidationError::missing_required(SCHEMAS)
    })?;

    for (key, value) in object {
        if key.eq_ignore_ascii_case(SCHEMAS) {
            continue;
        }
        let attribute = schema
            .attribute(key)
            .ok_or_else(|| ValidationError::UnknownAttribute {
                attribute: key.clone(),
                resource_type: schema.name.clone(),
            })?;

        if schema.is_extension(&attribute.name)
            && !declared.iter().any(|uri| uri.eq_ignore_ascii_case(&attribute.name))
        {
            return Err(ValidationError::UndeclaredExtension {
                uri: attribute.name.clone(),
            }
            .into());
        }
        if value.is_null() {
            continue;
        }

        reject_read_only(attribute, value, &attribute.name)?;
        validate_attribute(attribute, value)?;
    }

    check_required(object, schema, &declared)?;
    debug!("Validated new {} resource", schema.name);
    Ok(())
}

/// Fail if the client supplied a value for a read-only attribute, at any
/// depth. Violations below the top level are reported by attribute URI.
fn reject_read_only(
    attribute: &AttributeSchema,
    value: &Value,
    label: &str,
) -> Result<(), ValidationError> {
    if value.is_null() {
        return Ok(());
    }
    if !attribute.is_client_writable() {
        return Err(ValidationError::ReadOnlyMutabilityViolation {
            attribute: label.to_string(),
        });
    }
    if !attribute.is_complex() {
        return Ok(());
    }

    let elements = match value {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    for fields in elements.iter().filter_map(Value::as_object) {
        for sub in &attribute.sub_attributes {
            if let Some((_, sub_value)) = lookup_key(fields, &sub.name) {
                reject_read_only(sub, sub_value, &sub.uri)?;
            }
        }
    }
    Ok(())
}
