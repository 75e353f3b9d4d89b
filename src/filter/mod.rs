//! SCIM filter expressions (RFC 7644 §3.4.2.2).
//!
//! A filter string goes through the [`tokenizer`], then the
//! [`ExpressionTreeBuilder`] parses the tokens into a [`Node`] tree, resolving
//! every attribute against a [`ResourceTypeSchema`]. Backends consume the tree
//! through [`NodeVisitor`]; [`FilterEvaluator`] is the in-memory one.
//!
//! # Examples
//!
//! ```rust
//! use scim_core::config::FilterLimits;
//! use scim_core::filter::{self, LogicalOperator};
//! use scim_core::schema::SchemaRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let users = SchemaRegistry::new()?.resource_schema("User", &[])?;
//! let tree = filter::parse_filter(
//!     r#"userName eq "bjensen" and not (title pr)"#,
//!     &users,
//!     FilterLimits::default(),
//! )?
//! .expect("non-empty filter");
//!
//! assert_eq!(tree.as_operation().unwrap().operator(), LogicalOperator::And);
//! assert!(filter::matches(&tree, &serde_json::json!({"userName": "BJensen"}), &users));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod eval;
pub mod node;
pub mod tokenizer;

pub use builder::ExpressionTreeBuilder;
pub use eval::{FilterEvaluator, matches};
pub use node::{
    ComparisonOperator, ExpressionNode, LogicalOperator, Node, NodeVisitor, OperationNode,
    ValuePathNode,
};
pub use tokenizer::{Token, Word, tokenize};

use crate::config::FilterLimits;
use crate::error::FilterError;
use crate::schema::ResourceTypeSchema;

/// Parse an optional filter.
///
/// A blank filter means "no filter" and yields `Ok(None)`.
pub fn parse_filter(
    filter: &str,
    schema: &ResourceTypeSchema,
    limits: FilterLimits,
) -> Result<Option<Node>, FilterError> {
    if filter.trim().is_empty() {
        return Ok(None);
    }
    ExpressionTreeBuilder::new(schema)
        .with_limits(limits)
        .build_tree(filter)
        .map(Some)
}
