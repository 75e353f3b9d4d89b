//! Property-based tests for the filter tokenizer and tree builder.
//!
//! Generated filters check that parsing never panics, that parenthesis
//! imbalance is always rejected, and that rendering a tree back to filter
//! syntax and parsing it again yields the same tree.

use crate::common::{build_user_filter, users};
use proptest::prelude::*;
use scim_core::filter::matches;
use scim_core::{ExpressionTreeBuilder, InMemoryStorage, ResourceStorage};
use serde_json::{Value, json};

/// Single comparisons valid against the User schema.
fn clause_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        r#"userName eq "bjensen""#,
        "title pr",
        r#"emails[type eq "work"]"#,
        r#"meta.created gt "2011-05-13T04:42:34Z""#,
        r#"name.familyName co "J""#,
        "active eq true",
        r#"employeeNumber sw "70""#,
        r#"displayName ew "Jensen""#,
    ])
    .prop_map(str::to_string)
}

prop_compose! {
    /// A well-formed filter and the number of comparisons in it.
    fn filter_strategy()
        (filter in clause_strategy().prop_map(|c| (c, 1usize)).prop_recursive(4, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone())
                    .prop_map(|((a, m), (b, n))| (format!("{} and {}", a, b), m + n)),
                (inner.clone(), inner.clone())
                    .prop_map(|((a, m), (b, n))| (format!("({}) or ({})", a, b), m + n)),
                inner.prop_map(|(a, m)| (format!("not ({})", a), m)),
            ]
        }))
        -> (String, usize) {
        filter
    }
}

prop_compose! {
    /// A stored user record with a few filterable attributes.
    fn user_record()
        (user_name in prop::sample::select(vec!["bjensen", "jsmith", "babs", "jensen"]),
         title in prop::option::of(prop::sample::select(vec!["Tour Guide", "Guide"])),
         active in any::<bool>())
        -> Value {
        let mut record = json!({"userName": user_name, "active": active});
        if let Some(title) = title {
            record["title"] = json!(title);
        }
        record
    }
}

/// Filter fragments that may or may not balance.
fn fragments_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(
        prop::sample::select(vec!["(", ")", "title pr", "and", "or", "not", r#"userName eq "x""#]),
        1..12,
    )
}

proptest! {
    #[test]
    fn property_arbitrary_input_never_panics(input in ".{0,64}") {
        let _ = build_user_filter(&input);
    }

    #[test]
    fn property_well_formed_filters_parse((filter, clauses) in filter_strategy()) {
        let node = build_user_filter(&filter);
        prop_assert!(node.is_ok(), "{} failed: {:?}", filter, node);
        prop_assert_eq!(node.unwrap().leaf_count(), clauses);
    }

    #[test]
    fn property_display_reparses_to_same_tree((filter, _) in filter_strategy()) {
        let schema = users();
        let builder = ExpressionTreeBuilder::new(&schema);
        let node = builder.build_tree(&filter).unwrap();
        let rendered = node.to_string();
        let reparsed = builder.build_tree(&rendered);
        prop_assert_eq!(reparsed, Ok(node), "rendered as {}", rendered);
    }

    #[test]
    fn property_unbalanced_parentheses_rejected(fragments in fragments_strategy()) {
        let opened = fragments.iter().filter(|f| **f == "(").count();
        let closed = fragments.iter().filter(|f| **f == ")").count();
        prop_assume!(opened != closed);

        let filter = fragments.join(" ");
        prop_assert!(build_user_filter(&filter).is_err(), "{} was accepted", filter);
    }

    #[test]
    fn property_storage_listing_agrees_with_evaluator(
        (filter, _) in filter_strategy(),
        records in prop::collection::vec(user_record(), 0..8),
    ) {
        let schema = users();
        let node = ExpressionTreeBuilder::new(&schema).build_tree(&filter).unwrap();

        tokio_test::block_on(async {
            let storage = InMemoryStorage::new();
            for record in &records {
                storage.create(&schema, record.clone()).await.unwrap();
            }
            let stored = storage.list(&schema, None).await.unwrap();
            let listed = storage.list(&schema, Some(&node)).await.unwrap();

            // Stored copies carry meta, so evaluate against them
            let expected: Vec<&Value> = stored
                .iter()
                .filter(|record| matches(&node, record, &schema))
                .collect();
            assert_eq!(listed.iter().collect::<Vec<_>>(), expected, "{}", filter);
        });
    }
}
