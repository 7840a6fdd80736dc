//! Property tests for rule evaluation and query params.

use persist_driver::rules::select;
use persist_driver::{Filter, QueryParams};
use persist_value::{dict, Value};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn rows(ranks: &[i64]) -> BTreeMap<String, Value> {
    ranks
        .iter()
        .enumerate()
        .map(|(i, rank)| (format!("doc{i:03}"), dict! { "rank" => *rank }))
        .collect()
}

fn rule(op: &str, operand: i64) -> Value {
    Value::from(vec![Value::from(vec![
        Value::from("rank"),
        Value::from(op),
        Value::Integer(operand),
    ])])
}

fn rank(value: &Value) -> i64 {
    value.get("rank").and_then(Value::as_integer).unwrap()
}

proptest! {
    #[test]
    fn sorted_output_is_ordered(ranks in prop::collection::vec(-50i64..50, 0..40), descending: bool) {
        let rows = rows(&ranks);
        let params = QueryParams::new().sort("rank").descending(descending);
        let out: Vec<i64> = select(&rows, &Filter::all(), &params)
            .iter()
            .map(|(_, v)| rank(v))
            .collect();

        prop_assert_eq!(out.len(), ranks.len());
        for pair in out.windows(2) {
            if descending {
                prop_assert!(pair[0] >= pair[1]);
            } else {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }

    #[test]
    fn offset_and_limit_bound_the_page(
        ranks in prop::collection::vec(0i64..10, 0..30),
        offset in 0usize..40,
        limit in 0usize..40,
    ) {
        let rows = rows(&ranks);
        let params = QueryParams::new().offset(offset).limit(limit);
        let out = select(&rows, &Filter::all(), &params);
        prop_assert_eq!(out.len(), ranks.len().saturating_sub(offset).min(limit));
    }

    #[test]
    fn complementary_rules_partition_rows(
        ranks in prop::collection::vec(-5i64..5, 0..30),
        pivot in -5i64..5,
    ) {
        let rows = rows(&ranks);
        let all = QueryParams::default();
        let count = |op: &str| {
            let filter = Filter::parse(&rule(op, pivot)).unwrap();
            select(&rows, &filter, &all).len()
        };

        prop_assert_eq!(count("=") + count("!="), ranks.len());
        prop_assert_eq!(count("<") + count(">="), ranks.len());
        prop_assert_eq!(count(">") + count("<="), ranks.len());
    }
}
