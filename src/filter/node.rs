//! Filter expression tree.
//!
//! A parsed filter is a binary tree of [`OperationNode`]s (`and`, `or`,
//! `not`) over [`ExpressionNode`] leaves. A value path such as
//! `emails[type eq "work"]` stays in the tree as a [`ValuePathNode`] whose
//! inner filter applies to one element of the attribute at a time. Backends
//! consume the tree through
//! [`NodeVisitor`], either translating it into a native query or evaluating
//! it directly.

use super::tokenizer::write_quoted;
use crate::error::FilterError;
use std::fmt;
use std::str::FromStr;

/// Attribute comparison operators (RFC 7644 §3.4.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Pr,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 10] = [
        Self::Eq,
        Self::Ne,
        Self::Co,
        Self::Sw,
        Self::Ew,
        Self::Pr,
        Self::Gt,
        Self::Ge,
        Self::Lt,
        Self::Le,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Co => "co",
            Self::Sw => "sw",
            Self::Ew => "ew",
            Self::Pr => "pr",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }

    /// `gt`, `ge`, `lt` and `le`.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }
}

impl FromStr for ComparisonOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf comparing one attribute against a comparand.
///
/// `value` is `None` exactly when the operator is `pr`; the constructors keep
/// that invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionNode {
    attribute_uri: String,
    operator: ComparisonOperator,
    value: Option<String>,
}

impl ExpressionNode {
    /// `<attribute> pr`
    pub fn present(attribute_uri: impl Into<String>) -> Self {
        Self {
            attribute_uri: attribute_uri.into(),
            operator: ComparisonOperator::Pr,
            value: None,
        }
    }

    /// `<attribute> <operator> <value>`, for every operator except `pr`.
    pub fn compare(
        attribute_uri: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<String>,
    ) -> Result<Self, FilterError> {
        let attribute_uri = attribute_uri.into();
        if operator == ComparisonOperator::Pr {
            return Err(FilterError::PresenceWithValue {
                attribute: attribute_uri,
            });
        }
        Ok(Self {
            attribute_uri,
            operator,
            value: Some(value.into()),
        })
    }

    /// Canonical URI of the compared attribute.
    pub fn attribute_uri(&self) -> &str {
        &self.attribute_uri
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    /// Comparand as written in the filter, untyped.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Logical combination of subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationNode {
    operator: LogicalOperator,
    left: Option<Box<Node>>,
    right: Box<Node>,
}

impl OperationNode {
    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    /// Left operand; `None` only for `not`.
    pub fn left(&self) -> Option<&Node> {
        self.left.as_deref()
    }

    /// Right operand, the negated subtree for `not`.
    pub fn right(&self) -> &Node {
        &self.right
    }
}

/// `attr[filter]`: matches when a single value of `attr` satisfies the
/// whole inner filter.
///
/// Leaves of the inner filter carry the canonical URIs of sub-attributes of
/// `attr`, e.g. `urn:ietf:params:scim:schemas:core:2.0:User:emails.type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePathNode {
    attribute_uri: String,
    filter: Box<Node>,
}

impl ValuePathNode {
    /// Canonical URI of the complex attribute the filter is scoped to.
    pub fn attribute_uri(&self) -> &str {
        &self.attribute_uri
    }

    pub fn filter(&self) -> &Node {
        &self.filter
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Expression(ExpressionNode),
    Operation(OperationNode),
    ValuePath(ValuePathNode),
}

impl Node {
    pub fn and(left: Node, right: Node) -> Self {
        Node::Operation(OperationNode {
            operator: LogicalOperator::And,
            left: Some(Box::new(left)),
            right: Box::new(right),
        })
    }

    pub fn or(left: Node, right: Node) -> Self {
        Node::Operation(OperationNode {
            operator: LogicalOperator::Or,
            left: Some(Box::new(left)),
            right: Box::new(right),
        })
    }

    pub fn not(operand: Node) -> Self {
        Node::Operation(OperationNode {
            operator: LogicalOperator::Not,
            left: None,
            right: Box::new(operand),
        })
    }

    pub fn value_path(attribute_uri: impl Into<String>, filter: Node) -> Self {
        Node::ValuePath(ValuePathNode {
            attribute_uri: attribute_uri.into(),
            filter: Box::new(filter),
        })
    }

    pub fn as_expression(&self) -> Option<&ExpressionNode> {
        match self {
            Node::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&OperationNode> {
        match self {
            Node::Operation(operation) => Some(operation),
            _ => None,
        }
    }

    pub fn as_value_path(&self) -> Option<&ValuePathNode> {
        match self {
            Node::ValuePath(value_path) => Some(value_path),
            _ => None,
        }
    }

    /// Dispatch to the visitor method matching this node.
    pub fn accept<V: NodeVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Node::Expression(expression) => visitor.visit_expression(expression),
            Node::Operation(operation) => match (operation.operator, operation.left()) {
                (LogicalOperator::And, Some(left)) => visitor.visit_and(left, operation.right()),
                (LogicalOperator::Or, Some(left)) => visitor.visit_or(left, operation.right()),
                (_, _) => visitor.visit_not(operation.right()),
            },
            Node::ValuePath(value_path) => visitor.visit_value_path(value_path),
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Expression(_) => 1,
            Node::Operation(operation) => {
                operation.left().map_or(0, Node::leaf_count) + operation.right().leaf_count()
            }
            Node::ValuePath(value_path) => value_path.filter.leaf_count(),
        }
    }

    /// Binary operators associate to the left, so a right operand using the
    /// parent's operator keeps its parentheses.
    fn write_operand(
        &self,
        f: &mut fmt::Formatter<'_>,
        parent: LogicalOperator,
        right: bool,
        scope: Option<&str>,
    ) -> fmt::Result {
        let needs_parens = match self {
            Node::Operation(op) if op.operator == LogicalOperator::Not => false,
            Node::Operation(op) => {
                (parent == LogicalOperator::And && op.operator == LogicalOperator::Or)
                    || (right && op.operator == parent)
            }
            Node::Expression(_) | Node::ValuePath(_) => false,
        };
        if needs_parens {
            f.write_str("(")?;
            self.write_scoped(f, scope)?;
            f.write_str(")")
        } else {
            self.write_scoped(f, scope)
        }
    }

    /// Render as filter syntax; inside a value path `scope` is the path's
    /// attribute URI and leaves are written relative to it.
    fn write_scoped(&self, f: &mut fmt::Formatter<'_>, scope: Option<&str>) -> fmt::Result {
        match self {
            Node::Expression(expression) => expression.write_scoped(f, scope),
            Node::Operation(operation) => match operation.left() {
                Some(left) => {
                    left.write_operand(f, operation.operator, false, scope)?;
                    write!(f, " {} ", operation.operator)?;
                    operation
                        .right()
                        .write_operand(f, operation.operator, true, scope)
                }
                None => {
                    f.write_str("not (")?;
                    operation.right().write_scoped(f, scope)?;
                    f.write_str(")")
                }
            },
            Node::ValuePath(value_path) => {
                write!(f, "{}[", value_path.attribute_uri)?;
                value_path
                    .filter
                    .write_scoped(f, Some(value_path.attribute_uri.as_str()))?;
                f.write_str("]")
            }
        }
    }
}

impl From<ExpressionNode> for Node {
    fn from(expression: ExpressionNode) -> Self {
        Node::Expression(expression)
    }
}

impl ExpressionNode {
    fn write_scoped(&self, f: &mut fmt::Formatter<'_>, scope: Option<&str>) -> fmt::Result {
        let attribute = scope
            .and_then(|scope| self.attribute_uri.strip_prefix(scope))
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.attribute_uri);
        write!(f, "{} {}", attribute, self.operator)?;
        if let Some(value) = &self.value {
            f.write_str(" ")?;
            write_quoted(f, value)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_scoped(f, None)
    }
}

/// Renders the tree back to filter syntax, with parentheses only where
/// precedence requires them.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_scoped(f, None)
    }
}

/// Consumer contract for filter trees.
///
/// Storage backends implement this to turn a tree into a native predicate
/// or to evaluate it; [`Node::accept`] drives the dispatch. Implementations
/// recurse into operands by calling `accept` on them.
pub trait NodeVisitor {
    type Output;

    fn visit_expression(&mut self, expression: &ExpressionNode) -> Self::Output;

    fn visit_and(&mut self, left: &Node, right: &Node) -> Self::Output;

    fn visit_or(&mut self, left: &Node, right: &Node) -> Self::Output;

    fn visit_not(&mut self, operand: &Node) -> Self::Output;

    /// `attr[filter]`; the inner filter must hold for one value of `attr`.
    fn visit_value_path(&mut self, value_path: &ValuePathNode) -> Self::Output;
}
