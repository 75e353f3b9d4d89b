//! Core schema type definitions for SCIM resources.
//!
//! This module contains the data structures that describe SCIM schemas,
//! attribute definitions, and their characteristics as specified in RFC 7643.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A SCIM schema document.
///
/// Core schemas and extensions share this shape. Attribute URIs are not part
/// of the JSON document; they are assigned by [`Schema::assign_uris`] once the
/// schema is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier (URI)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    /// Schema description
    #[serde(default)]
    pub description: String,
    /// List of attribute definitions
    pub attributes: Vec<AttributeSchema>,
}

impl Schema {
    /// Assign fully-qualified URIs to every attribute of this schema.
    ///
    /// Top-level attributes become `<schema id>:<name>` and sub-attributes
    /// `<parent uri>.<name>`.
    pub fn assign_uris(&mut self) {
        for attribute in &mut self.attributes {
            let uri = format!("{}:{}", self.id, attribute.name);
            attribute.assign_uri(uri);
        }
    }
}

/// Definition of one SCIM attribute or sub-attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    /// Attribute name
    pub name: String,
    /// Fully-qualified, schema-prefixed identifier
    #[serde(skip)]
    pub uri: String,
    /// Data type of the attribute
    #[serde(rename = "type")]
    pub data_type: AttributeType,
    #[serde(default)]
    pub multi_valued: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Whether string comparison is case-sensitive
    #[serde(default)]
    pub case_exact: bool,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub returned: Returned,
    #[serde(default)]
    pub uniqueness: Uniqueness,
    /// Suggested values for string attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub canonical_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_types: Vec<String>,
    /// Sub-attributes, only populated for complex attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<AttributeSchema>,
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self {
            name: String::new(),
            uri: String::new(),
            data_type: AttributeType::String,
            multi_valued: false,
            description: String::new(),
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            returned: Returned::Default,
            uniqueness: Uniqueness::None,
            canonical_values: Vec::new(),
            reference_types: Vec::new(),
            sub_attributes: Vec::new(),
        }
    }
}

impl AttributeSchema {
    /// Create a single-valued, read-write attribute of the given type.
    pub fn new(name: impl Into<String>, data_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ..Self::default()
        }
    }

    pub fn is_complex(&self) -> bool {
        self.data_type == AttributeType::Complex
    }

    /// Find a direct sub-attribute by name, ignoring case.
    pub fn sub_attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.sub_attributes
            .iter()
            .find(|sub| sub.name.eq_ignore_ascii_case(name))
    }

    /// Set this attribute's URI and derive the URIs of its sub-attributes.
    pub fn assign_uri(&mut self, uri: String) {
        for sub in &mut self.sub_attributes {
            sub.assign_uri(format!("{}.{}", uri, sub.name));
        }
        self.uri = uri;
    }

    /// Whether a client may supply a value for this attribute.
    pub fn is_client_writable(&self) -> bool {
        self.mutability != Mutability::ReadOnly
    }
}

/// Implements `Display` and case-insensitive `FromStr` over the RFC 7643
/// keyword spelling of a characteristic enum.
macro_rules! keyword_enum {
    ($ty:ident { $($variant:ident => $keyword:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $keyword,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.trim().eq_ignore_ascii_case($keyword) {
                        return Ok($ty::$variant);
                    }
                )+
                Err(s.to_string())
            }
        }
    };
}

/// SCIM attribute data types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    String,
    Boolean,
    Decimal,
    Integer,
    /// RFC 3339 timestamp
    DateTime,
    /// Base64 encoded bytes
    Binary,
    /// URI reference
    Reference,
    /// Attribute with sub-attributes
    Complex,
}

keyword_enum!(AttributeType {
    String => "string",
    Boolean => "boolean",
    Decimal => "decimal",
    Integer => "integer",
    DateTime => "dateTime",
    Binary => "binary",
    Reference => "reference",
    Complex => "complex",
});

impl Default for AttributeType {
    fn default() -> Self {
        Self::String
    }
}

/// Attribute mutability characteristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Managed by the service provider
    ReadOnly,
    ReadWrite,
    /// May be set once, never changed afterwards
    Immutable,
    /// Never returned, e.g. passwords
    WriteOnly,
}

keyword_enum!(Mutability {
    ReadOnly => "readOnly",
    ReadWrite => "readWrite",
    Immutable => "immutable",
    WriteOnly => "writeOnly",
});

impl Default for Mutability {
    fn default() -> Self {
        Self::ReadWrite
    }
}

/// When an attribute is included in responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    /// Always returned, cannot be excluded
    Always,
    /// Never returned
    Never,
    /// Returned unless the request narrows or excludes it
    Default,
    /// Returned only when requested by name
    Request,
}

keyword_enum!(Returned {
    Always => "always",
    Never => "never",
    Default => "default",
    Request => "request",
});

impl Default for Returned {
    fn default() -> Self {
        Self::Default
    }
}

/// Attribute uniqueness constraints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    None,
    Server,
    Global,
}

keyword_enum!(Uniqueness {
    None => "none",
    Server => "server",
    Global => "global",
});

impl Default for Uniqueness {
    fn default() -> Self {
        Self::None
    }
}

/// Merged schema of one resource type: its core schema plus extensions.
///
/// Each extension contributes a single complex attribute named by the
/// extension's schema URI, mirroring how extension data appears in SCIM
/// resource JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTypeSchema {
    /// Resource type name, e.g. `User`
    pub name: String,
    /// Endpoint path, e.g. `/Users`
    pub endpoint: String,
    /// Every contributing schema URI, core schema first
    pub schemas: Vec<String>,
    /// Top-level attributes, extension attributes last
    pub attributes: Vec<AttributeSchema>,
}

impl ResourceTypeSchema {
    /// URI of the core schema.
    pub fn core_schema(&self) -> &str {
        self.schemas.first().map(String::as_str).unwrap_or_default()
    }

    /// URIs of the extension schemas.
    pub fn extension_schemas(&self) -> &[String] {
        self.schemas.get(1..).unwrap_or_default()
    }

    /// Whether `uri` names one of this resource type's schemas, ignoring case.
    pub fn has_schema(&self, uri: &str) -> bool {
        self.schemas.iter().any(|s| s.eq_ignore_ascii_case(uri))
    }

    /// Whether `uri` names one of this resource type's extension schemas.
    pub fn is_extension(&self, uri: &str) -> bool {
        self.extension_schemas()
            .iter()
            .any(|s| s.eq_ignore_ascii_case(uri))
    }

    /// Top-level attribute by name, ignoring case.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Attributes defined by the core schema.
    pub fn core_attributes(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes
            .iter()
            .filter(|attr| !self.is_extension(&attr.name))
    }

    /// The complex attributes standing for extension schemas.
    pub fn extension_attributes(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes
            .iter()
            .filter(|attr| self.is_extension(&attr.name))
    }
}
