//! Error types for the SCIM core.
//!
//! Errors are grouped by the layer that raises them: [`FilterError`] for filter
//! tokenizing and tree building, [`ValidationError`] for resource payload checks,
//! and [`BuildError`] for schema registry construction. All of them fold into
//! [`ScimError`], which knows its HTTP-equivalent status and `scimType` keyword
//! and renders the SCIM error payload through [`ErrorResponse`].

use serde::Serialize;
use std::fmt;

/// Schema URI of the SCIM error message.
pub const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Main error type for SCIM core operations.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Malformed input from the client.
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        scim_type: Option<ScimType>,
    },

    /// Filter expression could not be parsed or resolved
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// Resource payload does not conform to its schema
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Submitted object belongs to a different resource type entirely
    #[error("Schema mismatch: object declares {declared:?}, expected one of {expected:?}")]
    SchemaMismatch {
        declared: Vec<String>,
        expected: Vec<String>,
    },

    /// Well-formed request referencing something that does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Schema registry could not be built
    #[error("Schema registry error: {0}")]
    Build(#[from] BuildError),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal invariant violation
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Filter expression errors.
///
/// Every variant maps to a 400 response with `scimType` `invalidFilter`, except
/// [`FilterError::TooLong`] which reports `tooMany`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Filter expression is empty")]
    Empty,

    #[error("Filter exceeds the maximum length of {max} characters")]
    TooLong { max: usize },

    #[error("Filter nesting exceeds the maximum depth of {max}")]
    NestingTooDeep { max: usize },

    #[error("Unsupported filter operator in '{clause}'")]
    UnsupportedOperator { clause: String },

    #[error("Unbalanced parentheses in filter")]
    UnbalancedParentheses,

    #[error("Unexpected token '{token}' in filter")]
    UnexpectedToken { token: String },

    #[error("Unexpected end of filter, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("Unterminated string literal in filter")]
    UnterminatedString,

    #[error("Invalid value path: {details}")]
    InvalidValuePath { details: String },

    #[error("Invalid attribute path '{path}' in filter clause '{clause}'")]
    InvalidAttributePath { path: String, clause: String },

    #[error("Presence operator on '{attribute}' does not take a value")]
    PresenceWithValue { attribute: String },

    #[error("Operator '{operator}' on '{attribute}' requires a comparison value")]
    MissingValue { attribute: String, operator: String },

    #[error("Operator '{operator}' is not applicable to {data_type} attribute '{attribute}'")]
    OperatorNotApplicable {
        attribute: String,
        operator: String,
        data_type: String,
    },

    #[error("Unknown attribute '{attribute}'")]
    UnknownAttribute { attribute: String },

    #[error("Filter contains invalid percent-encoding")]
    InvalidEncoding,
}

/// Validation errors for schema compliance checking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Resource must be a JSON object")]
    NotAnObject,

    #[error("Required attribute '{attribute}' is missing")]
    MissingRequiredAttribute { attribute: String },

    #[error("Complex attribute '{attribute}' missing required sub-attribute '{sub_attribute}'")]
    MissingSubAttribute {
        attribute: String,
        sub_attribute: String,
    },

    #[error("Unknown attribute '{attribute}' for resource type '{resource_type}'")]
    UnknownAttribute {
        attribute: String,
        resource_type: String,
    },

    #[error("Complex attribute '{attribute}' contains unknown sub-attribute '{sub_attribute}'")]
    UnknownSubAttribute {
        attribute: String,
        sub_attribute: String,
    },

    #[error("Attribute '{attribute}' is read-only and cannot be supplied by the client")]
    ReadOnlyMutabilityViolation { attribute: String },

    #[error("Attribute '{attribute}' is immutable and cannot be modified after creation")]
    ImmutableMutabilityViolation { attribute: String },

    #[error("Required attribute '{attribute}' cannot be removed")]
    RequiredAttributeRemoved { attribute: String },

    #[error("Attribute '{attribute}' must be multi-valued (array)")]
    ExpectedMultiValue { attribute: String },

    #[error("Attribute '{attribute}' must be single-valued (not array)")]
    ExpectedSingleValue { attribute: String },

    #[error("Attribute '{attribute}' has invalid type, expected {expected}, got {actual}")]
    InvalidDataType {
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("Attribute '{attribute}' has invalid {data_type} value: {value}")]
    InvalidValue {
        attribute: String,
        data_type: String,
        value: String,
    },

    #[error("Attribute '{attribute}' has invalid value '{value}', allowed values: {allowed:?}")]
    InvalidCanonicalValue {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Unknown schema URI: {uri}")]
    UnknownSchemaUri { uri: String },

    #[error("Extension '{uri}' is present but not declared in 'schemas'")]
    UndeclaredExtension { uri: String },

    #[error("'attributes' and 'excludedAttributes' cannot be used together")]
    MutuallyExclusiveParameters,

    #[error("Invalid attribute path '{path}'")]
    InvalidAttributePath { path: String },
}

/// Errors that can occur while building the schema registry.
///
/// These are startup failures: a registry that fails to build cannot serve
/// any request.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read extension config '{path}': {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed extension config: {0}")]
    MalformedConfig(#[from] serde_json::Error),

    #[error("Extension config has no root attribute (attributeURI equal to attributeName)")]
    MissingRoot,

    #[error("Extension config defines more than one root attribute: {first}, {second}")]
    DuplicateRoot { first: String, second: String },

    #[error("Sub-attribute '{sub_attribute}' of '{attribute}' has no definition (expected URI {expected_uri})")]
    MissingSubAttribute {
        attribute: String,
        sub_attribute: String,
        expected_uri: String,
    },

    #[error("Cyclic sub-attribute reference at '{uri}'")]
    CyclicSubAttribute { uri: String },

    #[error("Attribute URI '{uri}' is defined more than once")]
    DuplicateAttributeUri { uri: String },

    #[error("Invalid {field} value '{value}' for attribute '{attribute}'")]
    InvalidCharacteristic {
        attribute: String,
        field: &'static str,
        value: String,
    },

    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error("Failed to load embedded schema {schema_id}: {source}")]
    EmbeddedSchema {
        schema_id: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// SCIM `scimType` detail error keywords (RFC 7644 §3.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimType {
    InvalidFilter,
    TooMany,
    Uniqueness,
    Mutability,
    InvalidSyntax,
    InvalidPath,
    NoTarget,
    InvalidValue,
    InvalidVers,
    Sensitive,
}

impl ScimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScimType::InvalidFilter => "invalidFilter",
            ScimType::TooMany => "tooMany",
            ScimType::Uniqueness => "uniqueness",
            ScimType::Mutability => "mutability",
            ScimType::InvalidSyntax => "invalidSyntax",
            ScimType::InvalidPath => "invalidPath",
            ScimType::NoTarget => "noTarget",
            ScimType::InvalidValue => "invalidValue",
            ScimType::InvalidVers => "invalidVers",
            ScimType::Sensitive => "sensitive",
        }
    }
}

impl fmt::Display for ScimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SCIM error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub schemas: Vec<String>,
    pub status: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimType>,
}

impl ScimError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>, scim_type: Option<ScimType>) -> Self {
        Self::BadRequest {
            message: message.into(),
            scim_type,
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP-equivalent status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ScimError::BadRequest { .. } | ScimError::Filter(_) | ScimError::Validation(_) => 400,
            ScimError::NotFound { .. } => 404,
            ScimError::SchemaMismatch { .. }
            | ScimError::Build(_)
            | ScimError::Storage(_)
            | ScimError::Json(_)
            | ScimError::Internal { .. } => 500,
        }
    }

    /// Whether the error was caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// The `scimType` keyword reported alongside a 400 response.
    pub fn scim_type(&self) -> Option<ScimType> {
        match self {
            ScimError::BadRequest { scim_type, .. } => *scim_type,
            ScimError::Filter(FilterError::TooLong { .. }) => Some(ScimType::TooMany),
            ScimError::Filter(_) => Some(ScimType::InvalidFilter),
            ScimError::Validation(error) => Some(error.scim_type()),
            _ => None,
        }
    }

    /// Render the SCIM error payload for this error.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            schemas: vec![ERROR_SCHEMA.to_string()],
            status: self.status().to_string(),
            detail: self.to_string(),
            scim_type: self.scim_type(),
        }
    }
}

impl ValidationError {
    /// Create a missing required attribute error
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create an invalid type error
    pub fn invalid_type(
        attribute: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidDataType {
            attribute: attribute.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        attribute: impl Into<String>,
        data_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            attribute: attribute.into(),
            data_type: data_type.into(),
            value: value.into(),
        }
    }

    pub fn scim_type(&self) -> ScimType {
        match self {
            ValidationError::ReadOnlyMutabilityViolation { .. }
            | ValidationError::ImmutableMutabilityViolation { .. } => ScimType::Mutability,
            ValidationError::InvalidAttributePath { .. } => ScimType::InvalidPath,
            ValidationError::NotAnObject
            | ValidationError::MutuallyExclusiveParameters
            | ValidationError::UnknownAttribute { .. }
            | ValidationError::UnknownSubAttribute { .. } => ScimType::InvalidSyntax,
            _ => ScimType::InvalidValue,
        }
    }
}

// Result type aliases for convenience
pub type ScimResult<T> = Result<T, ScimError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type BuildResult<T> = Result<T, BuildError>;
