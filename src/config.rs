//! Configuration for the schema registry and filter parser.

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration used to build a [`SchemaRegistry`](crate::schema::SchemaRegistry).
///
/// Loading this structure from a file is the host's concern; it derives
/// `Deserialize` so it can sit inside a larger configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScimCoreConfig {
    /// Attach the enterprise User extension to the User resource type.
    pub enterprise_extension: bool,

    /// Path to a JSON extension schema config file.
    pub extension_config: Option<PathBuf>,

    /// Resource type the custom extension from `extension_config` extends.
    pub extension_resource_type: String,

    /// Limits applied to filter expressions.
    pub filter: FilterLimits,
}

impl Default for ScimCoreConfig {
    fn default() -> Self {
        Self {
            enterprise_extension: true,
            extension_config: None,
            extension_resource_type: "User".to_string(),
            filter: FilterLimits::default(),
        }
    }
}

impl ScimCoreConfig {
    /// Use the given extension config file for the custom extension.
    pub fn with_extension_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.extension_config = Some(path.into());
        self
    }

    pub fn without_enterprise_extension(mut self) -> Self {
        self.enterprise_extension = false;
        self
    }
}

/// Bounds on filter expressions accepted by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterLimits {
    /// Maximum filter length in characters, before percent-encoding.
    pub max_length: usize,

    /// Maximum nesting depth of `not` and parenthesised groups.
    pub max_depth: usize,
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self {
            max_length: 4096,
            max_depth: 32,
        }
    }
}
