//! Filter parsing and evaluation through the public API.

use crate::common::{build_user_filter, init_logging, resource_schema, user_uri, users};
use scim_core::config::FilterLimits;
use scim_core::filter::{
    ComparisonOperator, ExpressionNode, ExpressionTreeBuilder, FilterEvaluator, LogicalOperator,
    Node, NodeVisitor, OperationNode, ValuePathNode, matches, parse_filter, tokenize,
};
use scim_core::{FilterError, ScimError, ScimType};
use serde_json::json;

fn operation(node: &Node) -> &OperationNode {
    node.as_operation().expect("expected an operation node")
}

fn expression(node: &Node) -> &ExpressionNode {
    node.as_expression().expect("expected an expression node")
}

fn assert_bad_request(result: Result<Node, FilterError>) -> FilterError {
    let error = result.expect_err("filter should be rejected");
    let scim_error = ScimError::from(error.clone());
    assert_eq!(scim_error.status(), 400);
    error
}

#[test]
fn test_and_binds_tighter_than_or() {
    let node = build_user_filter("title pr and nickName pr or emails pr").unwrap();

    let root = operation(&node);
    assert_eq!(root.operator(), LogicalOperator::Or);

    let left = operation(root.left().unwrap());
    assert_eq!(left.operator(), LogicalOperator::And);
    assert_eq!(expression(left.left().unwrap()).attribute_uri(), user_uri("title"));
    assert_eq!(expression(left.right()).attribute_uri(), user_uri("nickName"));

    assert_eq!(expression(root.right()).attribute_uri(), user_uri("emails"));
}

#[test]
fn test_simple_clause_resolves_canonical_uri() {
    let schema = users();
    let canonical = &schema.find_attribute("userName").unwrap().uri;

    let tokens = tokenize(r#"userName eq "bjensen""#).unwrap();
    let node = ExpressionTreeBuilder::new(&schema)
        .build_from_tokens(&tokens)
        .unwrap();

    assert_eq!(node.leaf_count(), 1);
    let leaf = expression(&node);
    assert_eq!(leaf.operator(), ComparisonOperator::Eq);
    assert_eq!(leaf.value(), Some("bjensen"));
    assert_eq!(leaf.attribute_uri(), canonical);
}

#[test]
fn test_presence_takes_no_value() {
    let node = build_user_filter("emails pr").unwrap();
    let leaf = expression(&node);
    assert_eq!(leaf.operator(), ComparisonOperator::Pr);
    assert_eq!(leaf.value(), None);

    let error = assert_bad_request(build_user_filter(r#"emails pr "x""#));
    assert!(matches!(error, FilterError::PresenceWithValue { .. }));
}

#[test]
fn test_unbalanced_parentheses_never_yield_a_tree() {
    for filter in [
        "(userName pr",
        "userName pr)",
        "((userName pr) and (title pr)",
        "(userName pr)) or (title pr",
        "not (userName pr",
    ] {
        let error = assert_bad_request(build_user_filter(filter));
        assert_eq!(error, FilterError::UnbalancedParentheses, "{}", filter);
    }

    // Parentheses inside quoted values don't count
    assert!(build_user_filter(r#"displayName eq "Babs (Jensen""#).is_ok());
}

#[test]
fn test_unknown_attribute() {
    let error = assert_bad_request(build_user_filter(r#"doesNotExist eq "x""#));
    assert_eq!(
        error,
        FilterError::UnknownAttribute {
            attribute: "doesNotExist".to_string()
        }
    );
    assert_eq!(
        ScimError::from(error).to_response().scim_type,
        Some(ScimType::InvalidFilter)
    );
}

#[test]
fn test_scenario_grouped_or_with_and() {
    init_logging();
    let schema = users();
    let node = ExpressionTreeBuilder::new(&schema)
        .build_tree(r#"(userName eq "bjensen" or userName eq "jsmith") and active eq "true""#)
        .unwrap();

    let root = operation(&node);
    assert_eq!(root.operator(), LogicalOperator::And);
    let grouped = operation(root.left().unwrap());
    assert_eq!(grouped.operator(), LogicalOperator::Or);
    assert_eq!(expression(grouped.left().unwrap()).operator(), ComparisonOperator::Eq);
    assert_eq!(expression(grouped.right()).operator(), ComparisonOperator::Eq);
    assert_eq!(expression(root.right()).operator(), ComparisonOperator::Eq);

    let records = [
        json!({"userName": "bjensen", "active": "true"}),
        json!({"userName": "jsmith", "active": "false"}),
    ];
    let matched: Vec<_> = records
        .iter()
        .filter(|record| FilterEvaluator::new(&schema, record).matches(&node))
        .collect();
    assert_eq!(matched, vec![&records[0]]);
}

/// A backend translating trees into its own query language.
struct SqlTranslator;

impl NodeVisitor for SqlTranslator {
    type Output = String;

    fn visit_expression(&mut self, expression: &ExpressionNode) -> String {
        let column = expression
            .attribute_uri()
            .rsplit(':')
            .next()
            .unwrap_or_default()
            .replace('.', "_");
        match (expression.operator(), expression.value()) {
            (ComparisonOperator::Pr, _) => format!("{} IS NOT NULL", column),
            (ComparisonOperator::Eq, Some(value)) => format!("{} = '{}'", column, value),
            (ComparisonOperator::Sw, Some(value)) => format!("{} LIKE '{}%'", column, value),
            (operator, value) => format!("{} {} '{}'", column, operator, value.unwrap_or_default()),
        }
    }

    fn visit_and(&mut self, left: &Node, right: &Node) -> String {
        format!("({} AND {})", left.accept(self), right.accept(self))
    }

    fn visit_or(&mut self, left: &Node, right: &Node) -> String {
        format!("({} OR {})", left.accept(self), right.accept(self))
    }

    fn visit_not(&mut self, operand: &Node) -> String {
        format!("NOT {}", operand.accept(self))
    }

    fn visit_value_path(&mut self, value_path: &ValuePathNode) -> String {
        let table = value_path.attribute_uri().rsplit(':').next().unwrap_or_default();
        format!(
            "EXISTS (SELECT 1 FROM {} WHERE {})",
            table,
            value_path.filter().accept(self)
        )
    }
}

#[test]
fn test_backend_visitor_translates_tree() {
    let node =
        build_user_filter(r#"userName sw "bj" and not (name.familyName eq "Smith" or title pr)"#)
            .unwrap();
    assert_eq!(
        node.accept(&mut SqlTranslator),
        "(userName LIKE 'bj%' AND NOT (name_familyName = 'Smith' OR title IS NOT NULL))"
    );

    let node = build_user_filter(r#"emails[type eq "work" and value sw "bj"]"#).unwrap();
    assert_eq!(
        node.accept(&mut SqlTranslator),
        "EXISTS (SELECT 1 FROM emails WHERE (emails_type = 'work' AND emails_value LIKE 'bj%'))"
    );
}

#[test]
fn test_value_path_filter() {
    let schema = users();
    let node = ExpressionTreeBuilder::new(&schema)
        .build_tree(r#"emails[type eq "work" and value co "@example.com"]"#)
        .unwrap();
    assert_eq!(node.leaf_count(), 2);

    let record = json!({
        "userName": "bjensen",
        "emails": [
            {"value": "bjensen@example.com", "type": "work"},
            {"value": "babs@jensen.org", "type": "home"}
        ]
    });
    assert!(matches(&node, &record, &schema));

    let other = json!({"userName": "jsmith", "emails": [{"value": "js@other.org", "type": "work"}]});
    assert!(!matches(&node, &other, &schema));
}

#[test]
fn test_value_path_matches_within_one_element() {
    let schema = users();
    let record = json!({
        "userName": "bjensen",
        "emails": [
            {"value": "bjensen@example.com", "type": "work"},
            {"value": "babs@jensen.org", "type": "home"}
        ]
    });
    let check = |filter: &str| {
        let node = ExpressionTreeBuilder::new(&schema).build_tree(filter).unwrap();
        matches(&node, &record, &schema)
    };

    // Each condition holds for some email, but never for the same one
    assert!(!check(r#"emails[type eq "work" and value ew "jensen.org"]"#));
    assert!(check(r#"emails.type eq "work" and emails.value ew "jensen.org""#));

    // The home email is not a work email
    assert!(check(r#"emails[not (type eq "work")]"#));
    assert!(!check(r#"not (emails[type eq "work"])"#));
    assert!(!check(r#"emails[not (type eq "work" or type eq "home")]"#));
}

#[test]
fn test_extension_attributes_in_filters() {
    let schema = users();
    let node = ExpressionTreeBuilder::new(&schema)
        .build_tree(
            r#"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber eq "701984""#,
        )
        .unwrap();
    let short = ExpressionTreeBuilder::new(&schema)
        .build_tree(r#"employeeNumber eq "701984""#)
        .unwrap();
    assert_eq!(node, short);

    let record = json!({
        "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User": {"employeeNumber": "701984"}
    });
    assert!(matches(&node, &record, &schema));
}

#[test]
fn test_typed_comparisons() {
    let schema = users();
    let record = json!({
        "userName": "bjensen",
        "active": true,
        "meta": {"lastModified": "2011-05-13T04:42:34Z"}
    });
    let check = |filter: &str| {
        let node = ExpressionTreeBuilder::new(&schema).build_tree(filter).unwrap();
        matches(&node, &record, &schema)
    };

    assert!(check(r#"userName eq "BJENSEN""#));
    assert!(check("active eq true"));
    assert!(!check("active ne true"));
    assert!(check(r#"meta.lastModified gt "2011-05-13T04:42:33Z""#));
    assert!(!check(r#"meta.lastModified lt "2011-05-13T06:42:34+02:00""#));
    assert!(check(r#"meta.lastModified ge "2011-05-13T06:42:34+02:00""#));
}

#[test]
fn test_operator_type_checks() {
    let schema = users();
    let builder = ExpressionTreeBuilder::new(&schema);
    assert!(matches!(
        builder.build_tree("active gt true"),
        Err(FilterError::OperatorNotApplicable { .. })
    ));
    assert!(matches!(
        builder.build_tree(r#"name eq "Barbara""#),
        Err(FilterError::OperatorNotApplicable { .. })
    ));
    // emails has a value sub-attribute to compare against
    assert!(builder.build_tree(r#"emails co "@example.com""#).is_ok());
}

#[test]
fn test_limits() {
    let schema = users();
    let limits = FilterLimits {
        max_length: 40,
        max_depth: 2,
    };

    let long = format!(r#"userName eq "{}""#, "x".repeat(40));
    let error = parse_filter(&long, &schema, limits).unwrap_err();
    assert_eq!(error, FilterError::TooLong { max: 40 });
    assert_eq!(ScimError::from(error).scim_type(), Some(ScimType::TooMany));

    assert!(matches!(
        parse_filter("not (not (title pr))", &schema, limits),
        Err(FilterError::NestingTooDeep { max: 2 })
    ));
    assert!(parse_filter("not (title pr)", &schema, limits).unwrap().is_some());
}

#[test]
fn test_group_filters() {
    let groups = resource_schema("Group");
    let node = ExpressionTreeBuilder::new(&groups)
        .build_tree(r#"displayName eq "Tour Guides" and members.value eq "2819c223""#)
        .unwrap();
    let record = json!({
        "displayName": "tour guides",
        "members": [{"value": "2819c223", "type": "User"}]
    });
    assert!(matches(&node, &record, &groups));

    assert!(matches!(
        ExpressionTreeBuilder::new(&groups).build_tree(r#"userName eq "bjensen""#),
        Err(FilterError::UnknownAttribute { .. })
    ));
}
