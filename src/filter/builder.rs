//! Recursive-descent filter parser.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expression := term ( "or" term )*
//! term       := factor ( "and" factor )*
//! factor     := "not" factor
//!             | "(" expression ")"
//!             | attrPath "[" expression "]"
//!             | clause
//! ```
//!
//! Inside `attrPath[...]` clause attributes name sub-attributes of
//! `attrPath`.

use super::node::{ComparisonOperator, ExpressionNode, Node};
use super::tokenizer::{Token, Word, tokenize};
use crate::config::FilterLimits;
use crate::error::FilterError;
use crate::schema::{AttributeSchema, AttributeType, ResourceTypeSchema};
use log::{debug, trace};

/// Builds filter trees against one resource type schema.
///
/// The builder holds no parse state; each call works on its own cursor, so
/// one builder can serve any number of filters.
#[derive(Debug, Clone)]
pub struct ExpressionTreeBuilder<'s> {
    schema: &'s ResourceTypeSchema,
    limits: FilterLimits,
}

impl<'s> ExpressionTreeBuilder<'s> {
    pub fn new(schema: &'s ResourceTypeSchema) -> Self {
        Self {
            schema,
            limits: FilterLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: FilterLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Tokenize and parse a filter string.
    pub fn build_tree(&self, filter: &str) -> Result<Node, FilterError> {
        if filter.chars().count() > self.limits.max_length {
            return Err(FilterError::TooLong {
                max: self.limits.max_length,
            });
        }
        let tokens = tokenize(filter)?;
        let node = self.build_from_tokens(&tokens)?;
        debug!("Parsed filter '{}' on {} into: {}", filter, self.schema.name, node);
        Ok(node)
    }

    /// Parse an already tokenized filter.
    pub fn build_from_tokens(&self, tokens: &[Token]) -> Result<Node, FilterError> {
        if tokens.is_empty() {
            return Err(FilterError::Empty);
        }

        let opened = tokens.iter().filter(|t| **t == Token::OpenParen).count();
        let closed = tokens.iter().filter(|t| **t == Token::CloseParen).count();
        if opened != closed {
            return Err(FilterError::UnbalancedParentheses);
        }

        let mut parser = Parser {
            builder: self,
            tokens,
            position: 0,
            scope: None,
        };
        let node = parser.expression(0)?;
        match parser.peek() {
            None => Ok(node),
            Some(Token::CloseParen) => Err(FilterError::UnbalancedParentheses),
            Some(token) => Err(FilterError::UnexpectedToken {
                token: token.to_string(),
            }),
        }
    }

    /// Split a clause into attribute, operator and comparand and resolve it.
    ///
    /// Within a value path `scope` is the path's attribute as written, and the
    /// clause attribute is resolved as its sub-attribute.
    fn leaf(&self, words: &[Word], scope: Option<&str>) -> Result<Node, FilterError> {
        let clause = Token::Clause(words.to_vec()).to_string();

        let (index, operator) = words
            .iter()
            .enumerate()
            .skip(1)
            .find_map(|(i, word)| match word {
                Word::Bare(w) => w.parse::<ComparisonOperator>().ok().map(|op| (i, op)),
                Word::Quoted(_) => None,
            })
            .ok_or_else(|| FilterError::UnsupportedOperator {
                clause: clause.clone(),
            })?;

        let path = match (&words[..index], scope) {
            ([Word::Bare(attribute)], Some(scope)) => format!("{}.{}", scope, attribute),
            ([Word::Bare(attribute)], None) => attribute.clone(),
            (path, _) => {
                return Err(FilterError::InvalidAttributePath {
                    path: Token::Clause(path.to_vec()).to_string(),
                    clause,
                });
            }
        };

        let attribute = path.as_str();
        let definition = self
            .schema
            .find_attribute(attribute)
            .ok_or_else(|| FilterError::UnknownAttribute {
                attribute: attribute.to_string(),
            })?;

        let expression = match (operator, &words[index + 1..]) {
            (ComparisonOperator::Pr, []) => ExpressionNode::present(&definition.uri),
            (ComparisonOperator::Pr, _) => {
                return Err(FilterError::PresenceWithValue {
                    attribute: attribute.to_string(),
                });
            }
            (_, []) => {
                return Err(FilterError::MissingValue {
                    attribute: attribute.to_string(),
                    operator: operator.to_string(),
                });
            }
            (_, [value]) => {
                Self::check_operator(attribute, definition, operator)?;
                ExpressionNode::compare(&definition.uri, operator, value.as_str())?
            }
            (_, [_, extra, ..]) => {
                return Err(FilterError::UnexpectedToken {
                    token: extra.to_string(),
                });
            }
        };

        trace!("Clause '{}' -> {}", clause, expression);
        Ok(Node::Expression(expression))
    }

    /// Resolve the attribute of `attr[...]`, which must be complex.
    fn value_path_attribute(&self, attribute: &str) -> Result<&'s AttributeSchema, FilterError> {
        let definition =
            self.schema
                .find_attribute(attribute)
                .ok_or_else(|| FilterError::UnknownAttribute {
                    attribute: attribute.to_string(),
                })?;
        if !definition.is_complex() {
            return Err(FilterError::InvalidValuePath {
                details: format!("'{}' has no sub-attributes to filter on", attribute),
            });
        }
        Ok(definition)
    }

    /// Reject operators that make no sense for the attribute's type.
    fn check_operator(
        attribute: &str,
        definition: &AttributeSchema,
        operator: ComparisonOperator,
    ) -> Result<(), FilterError> {
        let not_applicable = |data_type: AttributeType| FilterError::OperatorNotApplicable {
            attribute: attribute.to_string(),
            operator: operator.to_string(),
            data_type: data_type.to_string(),
        };

        let compared = if definition.is_complex() {
            definition
                .sub_attribute("value")
                .ok_or_else(|| not_applicable(AttributeType::Complex))?
        } else {
            definition
        };

        match compared.data_type {
            AttributeType::Boolean | AttributeType::Binary if operator.is_ordering() => {
                Err(not_applicable(compared.data_type))
            }
            AttributeType::Complex => Err(not_applicable(AttributeType::Complex)),
            _ => Ok(()),
        }
    }
}

/// Cursor over one token sequence.
struct Parser<'b, 's, 't> {
    builder: &'b ExpressionTreeBuilder<'s>,
    tokens: &'t [Token],
    position: usize,
    /// Attribute of the value path being parsed
    scope: Option<&'t str>,
}

impl<'t> Parser<'_, '_, 't> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position);
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn descend(&self, depth: usize) -> Result<usize, FilterError> {
        let max = self.builder.limits.max_depth;
        if depth >= max {
            return Err(FilterError::NestingTooDeep { max });
        }
        Ok(depth + 1)
    }

    fn expression(&mut self, depth: usize) -> Result<Node, FilterError> {
        let mut node = self.term(depth)?;
        while self.peek() == Some(&Token::Or) {
            self.position += 1;
            let right = self.term(depth)?;
            node = Node::or(node, right);
        }
        Ok(node)
    }

    fn term(&mut self, depth: usize) -> Result<Node, FilterError> {
        let mut node = self.factor(depth)?;
        while self.peek() == Some(&Token::And) {
            self.position += 1;
            let right = self.factor(depth)?;
            node = Node::and(node, right);
        }
        Ok(node)
    }

    fn factor(&mut self, depth: usize) -> Result<Node, FilterError> {
        match self.next() {
            Some(Token::Not) => {
                let depth = self.descend(depth)?;
                Ok(Node::not(self.factor(depth)?))
            }
            Some(Token::OpenParen) => {
                let depth = self.descend(depth)?;
                let node = self.expression(depth)?;
                match self.next() {
                    Some(Token::CloseParen) => Ok(node),
                    Some(other) => Err(FilterError::UnexpectedToken {
                        token: other.to_string(),
                    }),
                    None => Err(FilterError::UnexpectedEnd { expected: ")" }),
                }
            }
            Some(Token::ValuePathOpen(attribute)) if self.scope.is_none() => {
                let depth = self.descend(depth)?;
                let definition = self.builder.value_path_attribute(attribute)?;
                self.scope = Some(attribute.as_str());
                let filter = self.expression(depth)?;
                self.scope = None;
                match self.next() {
                    Some(Token::ValuePathClose) => Ok(Node::value_path(&definition.uri, filter)),
                    Some(other) => Err(FilterError::UnexpectedToken {
                        token: other.to_string(),
                    }),
                    None => Err(FilterError::UnexpectedEnd { expected: "]" }),
                }
            }
            Some(Token::Clause(words)) => self.builder.leaf(words, self.scope),
            Some(other) => Err(FilterError::UnexpectedToken {
                token: other.to_string(),
            }),
            None => Err(FilterError::UnexpectedEnd {
                expected: "filter clause",
            }),
        }
    }
}
