//! Validation of replacement payloads.

use super::values::{is_empty_value, lookup_key, validate_attribute, values_equivalent};
use super::{SCHEMAS, check_required, declared_schemas};
use crate::error::{ScimResult, ValidationError};
use crate::schema::{AttributeSchema, Mutability, ResourceTypeSchema};
use log::debug;
use serde_json::{Map, Value};

/// Validate a replacement of `old` by `new` and return the merged resource.
///
/// Merge rules per attribute supplied in `new`:
///
/// - `readOnly`: the client value is ignored and the old value kept
/// - `immutable`: may be set when it had no value, otherwise must be
///   unchanged (compared per `caseExact`)
/// - `null`: removes the attribute; rejected for required attributes and
///   for immutable attributes that hold a value
/// - single-valued complex attributes merge sub-attribute by sub-attribute
///   under the same rules
///
/// Attributes absent from `new` keep their old values. `old` is never
/// modified.
pub fn validate_updated_object(
    old: &Value,
    new: &Value,
    schema: &ResourceTypeSchema,
) -> ScimResult<Value> {
    let old = old.as_object().ok_or(ValidationError::NotAnObject)?;
    let new = new.as_object().ok_or(ValidationError::NotAnObject)?;

    let declared = match declared_schemas(new, schema)? {
        Some(declared) => declared,
        None => declared_schemas(old, schema)?.unwrap_or_default(),
    };

    let mut merged = old.clone();
    for (key, value) in new {
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

        merge_attribute(&mut merged, attribute, value, &attribute.name)?;
    }

    if !declared.is_empty() {
        merged.retain(|key, _| !key.eq_ignore_ascii_case(SCHEMAS));
        merged.insert(
            SCHEMAS.to_string(),
            Value::Array(declared.iter().cloned().map(Value::String).collect()),
        );
    }

    check_required(&merged, schema, &declared)?;
    debug!("Validated replacement of {} resource", schema.name);
    Ok(Value::Object(merged))
}

/// Apply one client-supplied attribute to `target`.
fn merge_attribute(
    target: &mut Map<String, Value>,
    attribute: &AttributeSchema,
    value: &Value,
    label: &str,
) -> Result<(), ValidationError> {
    let old_key = lookup_key(target, &attribute.name).map(|(key, _)| key.clone());
    let old_value = old_key
        .as_ref()
        .and_then(|key| target.get(key))
        .filter(|v| !is_empty_value(v))
        .cloned();

    match attribute.mutability {
        Mutability::ReadOnly => {
            debug!("Ignoring client value for read-only attribute {}", label);
            return Ok(());
        }
        Mutability::Immutable if old_value.is_some() && value.is_null() => {
            return Err(ValidationError::ImmutableMutabilityViolation {
                attribute: label.to_string(),
            });
        }
        _ => {}
    }

    if value.is_null() {
        if attribute.required {
            return Err(ValidationError::RequiredAttributeRemoved {
                attribute: label.to_string(),
            });
        }
        if let Some(key) = old_key {
            target.remove(&key);
        }
        return Ok(());
    }

    validate_attribute(attribute, value)?;

    if attribute.mutability == Mutability::Immutable {
        if let Some(old_value) = &old_value {
            if !values_equivalent(attribute, old_value, value) {
                return Err(ValidationError::ImmutableMutabilityViolation {
                    attribute: label.to_string(),
                });
            }
        }
    }

    let merged_value = match value {
        Value::Object(new_fields) if attribute.is_complex() && !attribute.multi_valued => {
            let mut fields = old_value
                .as_ref()
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            for (sub_key, sub_value) in new_fields {
                // validate_attribute already rejected unknown sub-attributes
                if let Some(sub) = attribute.sub_attribute(sub_key) {
                    merge_attribute(&mut fields, sub, sub_value, &sub.uri)?;
                }
            }
            Value::Object(fields)
        }
        _ => value.clone(),
    };

    if let Some(key) = old_key {
        target.remove(&key);
    }
    target.insert(attribute.name.clone(), merged_value);
    Ok(())
}
