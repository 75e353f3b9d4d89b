//! Loader for custom extension schema config files.
//!
//! The config is a flat JSON array describing every attribute of one
//! extension schema. The root entry is the one whose `attributeURI` equals
//! its `attributeName` (the extension schema URI itself); complex entries list
//! their children by name in a space-separated `subAttributes` string:
//!
//! ```json
//! [
//!   {"attributeURI": "urn:example:ext:2.0:User:badge", "attributeName": "badge",
//!    "dataType": "string", "multiValued": "false", "subAttributes": "null"},
//!   {"attributeURI": "urn:example:ext:2.0:User", "attributeName": "urn:example:ext:2.0:User",
//!    "dataType": "complex", "multiValued": "false", "subAttributes": "badge"}
//! ]
//! ```
//!
//! Children of the root are expected at `<root>:<name>`, deeper children at
//! `<parent>.<name>`.

use super::types::{AttributeSchema, AttributeType, Mutability, Returned, Schema, Uniqueness};
use crate::error::{BuildError, BuildResult};
use log::{debug, info};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One entry of the extension config array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeConfig {
    #[serde(rename = "attributeURI")]
    attribute_uri: String,
    attribute_name: String,
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    multi_valued: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    required: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    case_exact: bool,
    /// Legacy flag, superseded by `mutability` when both are present
    #[serde(default, deserialize_with = "flexible_bool")]
    read_only: bool,
    #[serde(default)]
    mutability: Option<String>,
    #[serde(default)]
    returned: Option<String>,
    #[serde(default)]
    uniqueness: Option<String>,
    #[serde(default)]
    sub_attributes: Option<SubAttributeNames>,
    #[serde(default)]
    canonical_values: Option<Vec<String>>,
    #[serde(default)]
    reference_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SubAttributeNames {
    Spaced(String),
    List(Vec<String>),
}

impl SubAttributeNames {
    fn names(&self) -> Vec<String> {
        match self {
            SubAttributeNames::Spaced(names) => names
                .split_whitespace()
                .filter(|name| !name.eq_ignore_ascii_case("null"))
                .map(str::to_string)
                .collect(),
            SubAttributeNames::List(names) => names.clone(),
        }
    }
}

/// Accepts `true`/`false` as JSON booleans or strings.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flexible {
        Bool(bool),
        Text(String),
        Null(()),
    }

    match Flexible::deserialize(deserializer)? {
        Flexible::Bool(value) => Ok(value),
        Flexible::Null(()) => Ok(false),
        Flexible::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" | "null" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected boolean, got '{}'",
                other
            ))),
        },
    }
}

/// Load an extension schema from a config file.
pub fn load_extension_schema<P: AsRef<Path>>(path: P) -> BuildResult<Schema> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| BuildError::ConfigIo {
        path: path.display().to_string(),
        source,
    })?;
    let schema = parse_extension_schema(&content)?;
    info!(
        "Loaded extension schema {} with {} attributes from {}",
        schema.id,
        schema.attributes.len(),
        path.display()
    );
    Ok(schema)
}

/// Build an extension schema from config file contents.
pub fn parse_extension_schema(content: &str) -> BuildResult<Schema> {
    let entries: Vec<AttributeConfig> = serde_json::from_str(content)?;

    let mut by_uri: HashMap<String, &AttributeConfig> = HashMap::new();
    for entry in &entries {
        if by_uri.insert(entry.attribute_uri.clone(), entry).is_some() {
            return Err(BuildError::DuplicateAttributeUri {
                uri: entry.attribute_uri.clone(),
            });
        }
    }

    let mut roots = entries
        .iter()
        .filter(|entry| entry.attribute_uri == entry.attribute_name);
    let root = roots.next().ok_or(BuildError::MissingRoot)?;
    if let Some(second) = roots.next() {
        return Err(BuildError::DuplicateRoot {
            first: root.attribute_uri.clone(),
            second: second.attribute_uri.clone(),
        });
    }

    let builder = ExtensionBuilder {
        root_uri: &root.attribute_uri,
        by_uri,
    };
    let root_attribute = builder.build(root, &mut Vec::new())?;
    if !root_attribute.is_complex() {
        return Err(BuildError::InvalidCharacteristic {
            attribute: root.attribute_uri.clone(),
            field: "dataType",
            value: root_attribute.data_type.to_string(),
        });
    }

    let name = root
        .attribute_uri
        .rsplit(':')
        .next()
        .unwrap_or(&root.attribute_uri)
        .to_string();
    let mut schema = Schema {
        id: root.attribute_uri.clone(),
        name,
        description: root.description.clone().unwrap_or_default(),
        attributes: root_attribute.sub_attributes,
    };
    schema.assign_uris();
    Ok(schema)
}

struct ExtensionBuilder<'a> {
    root_uri: &'a str,
    by_uri: HashMap<String, &'a AttributeConfig>,
}

impl<'a> ExtensionBuilder<'a> {
    fn build(
        &self,
        entry: &'a AttributeConfig,
        ancestors: &mut Vec<String>,
    ) -> BuildResult<AttributeSchema> {
        if ancestors.contains(&entry.attribute_uri) {
            return Err(BuildError::CyclicSubAttribute {
                uri: entry.attribute_uri.clone(),
            });
        }

        let mut attribute = Self::convert(entry)?;
        let children = entry
            .sub_attributes
            .as_ref()
            .map(SubAttributeNames::names)
            .unwrap_or_default();

        match (attribute.is_complex(), children.is_empty()) {
            (true, true) | (false, false) => {
                return Err(BuildError::InvalidCharacteristic {
                    attribute: entry.attribute_uri.clone(),
                    field: "subAttributes",
                    value: children.join(" "),
                });
            }
            _ => {}
        }

        ancestors.push(entry.attribute_uri.clone());
        for child in children {
            let expected_uri = if entry.attribute_uri == self.root_uri {
                format!("{}:{}", entry.attribute_uri, child)
            } else {
                format!("{}.{}", entry.attribute_uri, child)
            };
            let child_entry = self.by_uri.get(&expected_uri).copied().ok_or_else(|| {
                BuildError::MissingSubAttribute {
                    attribute: entry.attribute_uri.clone(),
                    sub_attribute: child.clone(),
                    expected_uri: expected_uri.clone(),
                }
            })?;
            debug!("Extension attribute {} -> {}", entry.attribute_uri, expected_uri);
            attribute.sub_attributes.push(self.build(child_entry, ancestors)?);
        }
        ancestors.pop();

        Ok(attribute)
    }

    fn convert(entry: &AttributeConfig) -> BuildResult<AttributeSchema> {
        let invalid = |field: &'static str, value: &str| BuildError::InvalidCharacteristic {
            attribute: entry.attribute_uri.clone(),
            field,
            value: value.to_string(),
        };

        let data_type = match entry.data_type.as_deref() {
            Some(value) => value
                .parse::<AttributeType>()
                .map_err(|_| invalid("dataType", value))?,
            None => AttributeType::String,
        };
        let mutability = match entry.mutability.as_deref() {
            Some(value) => value
                .parse::<Mutability>()
                .map_err(|_| invalid("mutability", value))?,
            None if entry.read_only => Mutability::ReadOnly,
            None => Mutability::ReadWrite,
        };
        let returned = match entry.returned.as_deref() {
            Some(value) => value
                .parse::<Returned>()
                .map_err(|_| invalid("returned", value))?,
            None => Returned::Default,
        };
        let uniqueness = match entry.uniqueness.as_deref() {
            Some(value) => value
                .parse::<Uniqueness>()
                .map_err(|_| invalid("uniqueness", value))?,
            None => Uniqueness::None,
        };

        Ok(AttributeSchema {
            name: entry.attribute_name.clone(),
            uri: entry.attribute_uri.clone(),
            data_type,
            multi_valued: entry.multi_valued,
            description: entry.description.clone().unwrap_or_default(),
            required: entry.required,
            case_exact: entry.case_exact,
            mutability,
            returned,
            uniqueness,
            canonical_values: entry.canonical_values.clone().unwrap_or_default(),
            reference_types: entry.reference_types.clone().unwrap_or_default(),
            sub_attributes: Vec::new(),
        })
    }
}
