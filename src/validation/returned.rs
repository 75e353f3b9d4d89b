//! Response trimming per the `attributes` and `excludedAttributes` query
//! parameters (RFC 7644 §3.9).

use super::SCHEMAS;
use crate::error::{ScimResult, ValidationError};
use crate::schema::{AttributeSchema, ResourceTypeSchema, Returned};
use log::trace;
use serde_json::{Map, Value};

/// Trim `object` in place for a response.
///
/// Both parameters are comma-separated attribute paths (short names, dotted
/// sub-attribute paths or fully-qualified URIs) and may not both be
/// non-empty. Per attribute, by its `returned` characteristic:
///
/// - `never`: always removed
/// - `always`: always kept, cannot be excluded
/// - `request`: kept only when requested through `attributes`
/// - `default`: kept unless `attributes` is given and does not cover it, or
///   it is excluded
///
/// Selection works at sub-attribute granularity, per element of multi-valued
/// complex attributes. Complex attributes left empty are removed.
pub fn validate_returned_attributes(
    object: &mut Value,
    attributes: &str,
    exclude_attributes: &str,
    schema: &ResourceTypeSchema,
) -> ScimResult<()> {
    AttributeSelection::new(attributes, exclude_attributes, schema)?.apply(object)
}

/// Parsed `attributes` / `excludedAttributes` parameters, ready to trim any
/// number of resources of one resource type.
#[derive(Debug, Clone)]
pub struct AttributeSelection<'s> {
    schema: &'s ResourceTypeSchema,
    requested: Vec<String>,
    excluded: Vec<String>,
}

impl<'s> AttributeSelection<'s> {
    /// Resolve both parameters against `schema`.
    pub fn new(
        attributes: &str,
        exclude_attributes: &str,
        schema: &'s ResourceTypeSchema,
    ) -> ScimResult<Self> {
        let requested = resolve_paths(attributes, schema)?;
        let excluded = resolve_paths(exclude_attributes, schema)?;
        if !requested.is_empty() && !excluded.is_empty() {
            return Err(ValidationError::MutuallyExclusiveParameters.into());
        }
        Ok(Self {
            schema,
            requested,
            excluded,
        })
    }

    /// Trim `object` in place. Top-level keys the schema does not define are
    /// dropped; `schemas` is always kept.
    pub fn apply(&self, object: &mut Value) -> ScimResult<()> {
        let Some(fields) = object.as_object_mut() else {
            return Err(ValidationError::NotAnObject.into());
        };

        let keys: Vec<String> = fields.keys().cloned().collect();
        for key in keys {
            if key.eq_ignore_ascii_case(SCHEMAS) {
                continue;
            }
            match self.schema.attribute(&key) {
                Some(attribute) => self.apply_attribute(fields, &key, attribute, false),
                None => {
                    trace!("Dropping unknown attribute {} from response", key);
                    fields.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Parse a comma-separated parameter into lowercase canonical URIs.
fn resolve_paths(parameter: &str, schema: &ResourceTypeSchema) -> ScimResult<Vec<String>> {
    parameter
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(|path| {
            schema
                .find_attribute(path)
                .map(|attr| attr.uri.to_lowercase())
                .ok_or_else(|| {
                    ValidationError::InvalidAttributePath {
                        path: path.to_string(),
                    }
                    .into()
                })
        })
        .collect()
}

/// Whether `descendant` names an attribute below `ancestor`.
fn is_below(descendant: &str, ancestor: &str) -> bool {
    descendant.len() > ancestor.len()
        && descendant.starts_with(ancestor)
        && matches!(descendant.as_bytes()[ancestor.len()], b'.' | b':')
}

fn covers(paths: &[String], uri: &str) -> bool {
    paths.iter().any(|p| p == uri || is_below(uri, p))
}

fn has_below(paths: &[String], uri: &str) -> bool {
    paths.iter().any(|p| is_below(p, uri))
}

enum Decision {
    Remove,
    /// Keep; `whole` means every non-`never` sub-attribute is kept too
    Keep { whole: bool },
}

impl AttributeSelection<'_> {
    fn decide(&self, attribute: &AttributeSchema, whole: bool) -> Decision {
        let uri = attribute.uri.to_lowercase();
        match attribute.returned {
            Returned::Never => return Decision::Remove,
            Returned::Always => return Decision::Keep { whole: true },
            _ => {}
        }
        if covers(&self.excluded, &uri) {
            return Decision::Remove;
        }
        if whole {
            return Decision::Keep { whole: true };
        }

        if !self.requested.is_empty() {
            if covers(&self.requested, &uri) {
                Decision::Keep { whole: true }
            } else if has_below(&self.requested, &uri) {
                Decision::Keep { whole: false }
            } else {
                Decision::Remove
            }
        } else if attribute.returned == Returned::Request {
            Decision::Remove
        } else {
            Decision::Keep { whole: true }
        }
    }

    /// Apply the decision for `attribute` to `fields[key]`.
    fn apply_attribute(
        &self,
        fields: &mut Map<String, Value>,
        key: &str,
        attribute: &AttributeSchema,
        whole: bool,
    ) {
        let whole = match self.decide(attribute, whole) {
            Decision::Remove => {
                fields.remove(key);
                return;
            }
            Decision::Keep { whole } => whole,
        };
        if !attribute.is_complex() {
            return;
        }

        let Some(value) = fields.get_mut(key) else {
            return;
        };
        let empty = match value {
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.trim_complex(item, attribute, whole);
                }
                items.retain(|item| !matches!(item, Value::Object(f) if f.is_empty()));
                items.is_empty()
            }
            other => {
                self.trim_complex(other, attribute, whole);
                matches!(other, Value::Object(f) if f.is_empty())
            }
        };
        if empty {
            fields.remove(key);
        }
    }

    fn trim_complex(&self, value: &mut Value, attribute: &AttributeSchema, whole: bool) {
        let Some(fields) = value.as_object_mut() else {
            return;
        };
        let keys: Vec<String> = fields.keys().cloned().collect();
        for key in keys {
            match attribute.sub_attribute(&key) {
                Some(sub) => self.apply_attribute(fields, &key, sub, whole),
                None => {
                    fields.remove(&key);
                }
            }
        }
    }
}
