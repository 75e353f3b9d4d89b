//! Per-attribute value checks and JSON helpers shared by the validators.

use crate::error::{ValidationError, ValidationResult};
use crate::schema::{AttributeSchema, AttributeType};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

/// Field of a JSON object by attribute name, ignoring case.
pub(crate) fn lookup<'v>(value: &'v Value, name: &str) -> Option<&'v Value> {
    value
        .as_object()
        .and_then(|object| lookup_key(object, name))
        .map(|(_, value)| value)
}

/// Entry of a JSON object by attribute name, ignoring case.
pub(crate) fn lookup_key<'v>(
    object: &'v Map<String, Value>,
    name: &str,
) -> Option<(&'v String, &'v Value)> {
    object
        .get_key_value(name)
        .or_else(|| object.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)))
}

/// Type name of a JSON value for error messages.
pub fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a value counts as absent for required-attribute checks.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty_value),
        Value::Object(fields) => fields.values().all(is_empty_value),
        _ => false,
    }
}

/// Check multiplicity, then every value against the attribute's type.
///
/// `null` values are accepted here; callers decide what `null` means.
pub fn validate_attribute(attribute: &AttributeSchema, value: &Value) -> ValidationResult<()> {
    if value.is_null() {
        return Ok(());
    }

    if attribute.multi_valued {
        let Some(items) = value.as_array() else {
            return Err(ValidationError::ExpectedMultiValue {
                attribute: attribute.name.clone(),
            });
        };
        for item in items {
            if item.is_array() {
                return Err(ValidationError::ExpectedSingleValue {
                    attribute: attribute.name.clone(),
                });
            }
            validate_attribute_value(attribute, item)?;
        }
        Ok(())
    } else {
        if value.is_array() {
            return Err(ValidationError::ExpectedSingleValue {
                attribute: attribute.name.clone(),
            });
        }
        validate_attribute_value(attribute, value)
    }
}

/// Check one (non-array) value against the attribute's data type.
pub fn validate_attribute_value(attribute: &AttributeSchema, value: &Value) -> ValidationResult<()> {
    if value.is_null() {
        return Ok(());
    }

    let expect_string = || {
        value.as_str().ok_or_else(|| {
            ValidationError::invalid_type(&attribute.name, attribute.data_type.as_str(), value_type(value))
        })
    };

    match attribute.data_type {
        AttributeType::String => {
            let s = expect_string()?;
            validate_canonical_value(attribute, s)?;
        }
        AttributeType::Boolean => {
            if !value.is_boolean() {
                return Err(ValidationError::invalid_type(
                    &attribute.name,
                    "boolean",
                    value_type(value),
                ));
            }
        }
        AttributeType::Integer => {
            if !(value.is_i64() || value.is_u64()) {
                return Err(ValidationError::invalid_type(
                    &attribute.name,
                    "integer",
                    value_type(value),
                ));
            }
        }
        AttributeType::Decimal => {
            if !value.is_number() {
                return Err(ValidationError::invalid_type(
                    &attribute.name,
                    "decimal",
                    value_type(value),
                ));
            }
        }
        AttributeType::DateTime => {
            let s = expect_string()?;
            if DateTime::<FixedOffset>::parse_from_rfc3339(s).is_err() {
                return Err(ValidationError::invalid_value(&attribute.name, "dateTime", s));
            }
        }
        AttributeType::Binary => {
            let s = expect_string()?;
            if BASE64.decode(s).is_err() {
                return Err(ValidationError::invalid_value(&attribute.name, "binary", s));
            }
        }
        AttributeType::Reference => {
            let s = expect_string()?;
            if s.trim().is_empty() || s.chars().any(char::is_whitespace) {
                return Err(ValidationError::invalid_value(&attribute.name, "reference", s));
            }
        }
        AttributeType::Complex => {
            let Some(object) = value.as_object() else {
                return Err(ValidationError::invalid_type(
                    &attribute.name,
                    "complex",
                    value_type(value),
                ));
            };
            validate_sub_attributes(attribute, object)?;
        }
    }

    Ok(())
}

fn validate_sub_attributes(
    attribute: &AttributeSchema,
    object: &Map<String, Value>,
) -> ValidationResult<()> {
    for (key, sub_value) in object {
        let sub = attribute
            .sub_attribute(key)
            .ok_or_else(|| ValidationError::UnknownSubAttribute {
                attribute: attribute.name.clone(),
                sub_attribute: key.clone(),
            })?;
        validate_attribute(sub, sub_value)?;
    }

    for sub in &attribute.sub_attributes {
        if !sub.required || !sub.is_client_writable() {
            continue;
        }
        let missing = lookup_key(object, &sub.name).is_none_or(|(_, v)| is_empty_value(v));
        if missing {
            return Err(ValidationError::MissingSubAttribute {
                attribute: attribute.name.clone(),
                sub_attribute: sub.name.clone(),
            });
        }
    }

    Ok(())
}

fn validate_canonical_value(attribute: &AttributeSchema, value: &str) -> ValidationResult<()> {
    if attribute.canonical_values.is_empty() {
        return Ok(());
    }
    let allowed = attribute.canonical_values.iter().any(|canonical| {
        if attribute.case_exact {
            canonical == value
        } else {
            canonical.eq_ignore_ascii_case(value)
        }
    });
    if allowed {
        Ok(())
    } else {
        Err(ValidationError::InvalidCanonicalValue {
            attribute: attribute.name.clone(),
            value: value.to_string(),
            allowed: attribute.canonical_values.clone(),
        })
    }
}

/// Compare two values the way the attribute's characteristics define
/// equality: strings honour `caseExact`, `dateTime` compares instants and
/// complex values compare sub-attribute by sub-attribute.
pub fn values_equivalent(attribute: &AttributeSchema, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(l, r)| single_equivalent(attribute, l, r))
        }
        _ => single_equivalent(attribute, a, b),
    }
}

fn single_equivalent(attribute: &AttributeSchema, a: &Value, b: &Value) -> bool {
    match (attribute.data_type, a, b) {
        (AttributeType::Complex, Value::Object(left), Value::Object(right)) => {
            attribute.sub_attributes.iter().all(|sub| {
                match (lookup_key(left, &sub.name), lookup_key(right, &sub.name)) {
                    (None, None) => true,
                    (Some((_, l)), Some((_, r))) => values_equivalent(sub, l, r),
                    (Some((_, v)), None) | (None, Some((_, v))) => v.is_null(),
                }
            })
        }
        (AttributeType::String | AttributeType::Reference, Value::String(l), Value::String(r))
            if !attribute.case_exact =>
        {
            l.to_lowercase() == r.to_lowercase()
        }
        (AttributeType::DateTime, Value::String(l), Value::String(r)) => {
            match (
                DateTime::parse_from_rfc3339(l),
                DateTime::parse_from_rfc3339(r),
            ) {
                (Ok(l), Ok(r)) => l == r,
                _ => l == r,
            }
        }
        _ => a == b,
    }
}
