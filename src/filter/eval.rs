//! In-memory filter evaluation over JSON resources.

use super::node::{ComparisonOperator, ExpressionNode, Node, NodeVisitor, ValuePathNode};
use crate::schema::{AttributeSchema, AttributeType, ResourceTypeSchema};
use crate::validation::values::lookup;
use chrono::{DateTime, FixedOffset};
use log::trace;
use serde_json::Value;
use std::cmp::Ordering;

/// Evaluates a filter tree against one JSON resource.
///
/// Comparands are coerced to the declared type of the compared attribute:
/// strings honour `caseExact`, integers and decimals compare numerically,
/// `dateTime` values compare as instants. A multi-valued attribute matches
/// when any of its values does, and a complex attribute compares its `value`
/// sub-attribute. A value path `attr[filter]` matches when one value of
/// `attr` satisfies the whole inner filter.
pub struct FilterEvaluator<'a> {
    schema: &'a ResourceTypeSchema,
    record: &'a Value,
    /// Attribute chain links already walked to reach `record`; non-zero
    /// while evaluating the inner filter of a value path on one element
    scope_depth: usize,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(schema: &'a ResourceTypeSchema, record: &'a Value) -> Self {
        Self {
            schema,
            record,
            scope_depth: 0,
        }
    }

    pub fn matches(&mut self, node: &Node) -> bool {
        node.accept(self)
    }

    /// Every value the attribute chain reaches, arrays flattened.
    fn collect(&self, chain: &[&AttributeSchema]) -> Vec<&'a Value> {
        let mut current = vec![self.record];
        for attribute in chain {
            current = current
                .into_iter()
                .filter_map(|value| lookup(value, &attribute.name))
                .flat_map(|value| match value {
                    Value::Array(items) => items.iter().collect::<Vec<_>>(),
                    other => vec![other],
                })
                .filter(|value| !value.is_null())
                .collect();
        }
        current
    }
}

/// Shorthand for a one-off evaluation.
pub fn matches(node: &Node, record: &Value, schema: &ResourceTypeSchema) -> bool {
    FilterEvaluator::new(schema, record).matches(node)
}

impl NodeVisitor for FilterEvaluator<'_> {
    type Output = bool;

    fn visit_expression(&mut self, expression: &ExpressionNode) -> bool {
        let Some(chain) = self.schema.attribute_chain(expression.attribute_uri()) else {
            trace!("Unresolvable attribute {}", expression.attribute_uri());
            return false;
        };
        let Some(mut target) = chain.last().copied() else {
            return false;
        };
        let Some(relative) = chain.get(self.scope_depth..) else {
            return false;
        };
        let mut values = self.collect(relative);

        let operator = expression.operator();
        if operator == ComparisonOperator::Pr {
            return values.iter().any(|value| is_present(value));
        }

        if target.is_complex() {
            let Some(value_attribute) = target.sub_attribute("value") else {
                return false;
            };
            values = values
                .into_iter()
                .filter_map(|value| lookup(value, &value_attribute.name))
                .collect();
            target = value_attribute;
        }

        let comparand = expression.value().unwrap_or_default();
        match operator {
            ComparisonOperator::Ne => !values
                .iter()
                .any(|value| compare(target, ComparisonOperator::Eq, value, comparand)),
            _ => values
                .iter()
                .any(|value| compare(target, operator, value, comparand)),
        }
    }

    fn visit_and(&mut self, left: &Node, right: &Node) -> bool {
        left.accept(self) && right.accept(self)
    }

    fn visit_or(&mut self, left: &Node, right: &Node) -> bool {
        left.accept(self) || right.accept(self)
    }

    fn visit_not(&mut self, operand: &Node) -> bool {
        !operand.accept(self)
    }

    fn visit_value_path(&mut self, value_path: &ValuePathNode) -> bool {
        let Some(chain) = self.schema.attribute_chain(value_path.attribute_uri()) else {
            trace!("Unresolvable attribute {}", value_path.attribute_uri());
            return false;
        };
        let Some(relative) = chain.get(self.scope_depth..) else {
            return false;
        };
        self.collect(relative).into_iter().any(|element| {
            FilterEvaluator {
                schema: self.schema,
                record: element,
                scope_depth: chain.len(),
            }
            .matches(value_path.filter())
        })
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

fn compare(
    attribute: &AttributeSchema,
    operator: ComparisonOperator,
    actual: &Value,
    comparand: &str,
) -> bool {
    match attribute.data_type {
        AttributeType::Boolean => {
            let (Some(actual), Some(expected)) = (as_bool(actual), parse_bool(comparand)) else {
                return false;
            };
            match operator {
                ComparisonOperator::Eq => actual == expected,
                ComparisonOperator::Ne => actual != expected,
                _ => false,
            }
        }
        AttributeType::Integer | AttributeType::Decimal => {
            let (Some(actual), Ok(expected)) = (as_number(actual), comparand.trim().parse::<f64>())
            else {
                return false;
            };
            actual
                .partial_cmp(&expected)
                .is_some_and(|ordering| ordering_matches(operator, ordering))
        }
        AttributeType::DateTime => {
            let Some(actual) = actual.as_str() else {
                return false;
            };
            let substring = matches!(
                operator,
                ComparisonOperator::Co | ComparisonOperator::Sw | ComparisonOperator::Ew
            );
            match (parse_date_time(actual), parse_date_time(comparand)) {
                (Some(a), Some(b)) if !substring => ordering_matches(operator, a.cmp(&b)),
                _ => compare_strings(operator, actual, comparand, true),
            }
        }
        AttributeType::String | AttributeType::Reference | AttributeType::Binary => {
            match actual.as_str() {
                Some(actual) => compare_strings(operator, actual, comparand, attribute.case_exact),
                None => false,
            }
        }
        AttributeType::Complex => false,
    }
}

fn compare_strings(
    operator: ComparisonOperator,
    actual: &str,
    expected: &str,
    case_exact: bool,
) -> bool {
    let (actual, expected) = if case_exact {
        (actual.to_string(), expected.to_string())
    } else {
        (actual.to_lowercase(), expected.to_lowercase())
    };
    match operator {
        ComparisonOperator::Co => actual.contains(&expected),
        ComparisonOperator::Sw => actual.starts_with(&expected),
        ComparisonOperator::Ew => actual.ends_with(&expected),
        _ => ordering_matches(operator, actual.cmp(&expected)),
    }
}

fn ordering_matches(operator: ComparisonOperator, ordering: Ordering) -> bool {
    match operator {
        ComparisonOperator::Eq => ordering == Ordering::Equal,
        ComparisonOperator::Ne => ordering != Ordering::Equal,
        ComparisonOperator::Gt => ordering == Ordering::Greater,
        ComparisonOperator::Ge => ordering != Ordering::Less,
        ComparisonOperator::Lt => ordering == Ordering::Less,
        ComparisonOperator::Le => ordering != Ordering::Greater,
        ComparisonOperator::Co
        | ComparisonOperator::Sw
        | ComparisonOperator::Ew
        | ComparisonOperator::Pr => false,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date_time(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim()).ok()
}
