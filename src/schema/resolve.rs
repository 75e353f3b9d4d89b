//! Attribute path resolution against a merged resource type schema.
//!
//! Accepted path forms:
//!
//! - short names and dotted sub-attribute paths: `userName`, `name.givenName`
//! - fully-qualified paths: `urn:ietf:params:scim:schemas:core:2.0:User:name.givenName`
//! - extension attributes by short name: `employeeNumber`, when no core
//!   attribute has that name and exactly one extension defines it

use super::types::{AttributeSchema, ResourceTypeSchema};
use crate::error::{ScimError, ScimResult, ScimType};

impl ResourceTypeSchema {
    /// Resolve a path to its attribute definition.
    pub fn find_attribute(&self, path: &str) -> Option<&AttributeSchema> {
        self.attribute_chain(path)?.pop()
    }

    /// Resolve a path to its canonical attribute URI.
    ///
    /// Fails with `BadRequest` (`invalidPath`) when any segment does not
    /// resolve.
    pub fn resolve_attribute_uri(&self, path: &str) -> ScimResult<String> {
        self.find_attribute(path)
            .map(|attr| attr.uri.clone())
            .ok_or_else(|| {
                ScimError::bad_request(
                    format!("Attribute '{}' is not defined for {}", path, self.name),
                    Some(ScimType::InvalidPath),
                )
            })
    }

    /// Resolve a path to the chain of definitions it walks through.
    ///
    /// The first element is a top-level attribute of this schema (the
    /// extension attribute for extension paths) and the last is the
    /// attribute the path names.
    pub fn attribute_chain(&self, path: &str) -> Option<Vec<&AttributeSchema>> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }

        let mut chain = Vec::new();
        let segments = match self.strip_schema_prefix(path) {
            Some((schema_uri, rest)) => {
                let mut segments = rest.split('.');
                if self.is_extension(schema_uri) {
                    let extension = self.attribute(schema_uri)?;
                    chain.push(extension);
                    if rest.is_empty() {
                        return Some(chain);
                    }
                    let head = segments.next()?;
                    chain.push(extension.sub_attribute(head)?);
                } else {
                    let head = segments.next().filter(|head| !head.is_empty())?;
                    chain.push(self.core_attribute(head)?);
                }
                segments
            }
            None => {
                let mut segments = path.split('.');
                let head = segments.next()?;
                match self.core_attribute(head) {
                    Some(attr) => chain.push(attr),
                    None => {
                        let (extension, attr) = self.unique_extension_attribute(head)?;
                        chain.push(extension);
                        chain.push(attr);
                    }
                }
                segments
            }
        };

        for segment in segments {
            let parent = *chain.last()?;
            chain.push(parent.sub_attribute(segment)?);
        }
        Some(chain)
    }

    /// Split a schema URI prefix off `path`.
    ///
    /// The longest matching schema URI wins and it must be followed by `:` or
    /// end the path. Returns the matched URI and the remainder after the colon.
    fn strip_schema_prefix<'p>(&self, path: &'p str) -> Option<(&str, &'p str)> {
        self.schemas
            .iter()
            .filter(|uri| {
                path.len() >= uri.len()
                    && path.is_char_boundary(uri.len())
                    && path[..uri.len()].eq_ignore_ascii_case(uri)
                    && matches!(path.as_bytes().get(uri.len()), None | Some(b':'))
            })
            .max_by_key(|uri| uri.len())
            .map(|uri| {
                let rest = path.get(uri.len() + 1..).unwrap_or("");
                (uri.as_str(), rest)
            })
    }

    fn core_attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.core_attributes()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Find a top-level extension attribute by short name across all
    /// extensions; `None` when absent or defined by more than one.
    fn unique_extension_attribute(
        &self,
        name: &str,
    ) -> Option<(&AttributeSchema, &AttributeSchema)> {
        let mut matches = self
            .extension_attributes()
            .filter_map(|extension| extension.sub_attribute(name).map(|attr| (extension, attr)));
        let first = matches.next()?;
        match matches.next() {
            Some(_) => None,
            None => Some(first),
        }
    }
}
