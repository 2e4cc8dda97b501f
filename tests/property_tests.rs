//! Property-based tests for SQL compilation
//!
//! These tests verify that:
//! - `{name}` templates bind one parameter per occurrence, in order
//! - compiled condition sets carry exactly as many `?` placeholders as
//!   parameters, in the order the operands were written
//! - referencing an unknown name is always reported

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use std::collections::HashSet;

    use sqlweave::sql::{compile_conditions, compile_template, count_placeholders, Node};
    use sqlweave::{Condition, ConditionSet, NamedParams, Value, WeaveError};

    const NAMES: [&str; 4] = ["id", "owner", "min_balance", "created.at"];

    // Test infrastructure

    fn named_params() -> NamedParams {
        NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), Value::Integer(i as i64)))
            .collect()
    }

    /// SQL text that contains no quotes, braces or `?`.
    fn arb_filler() -> impl Strategy<Value = String> {
        "[a-z =<>,()]{0,12}"
    }

    /// A template made of filler text and placeholders drawn from `NAMES`.
    fn arb_template() -> impl Strategy<Value = (String, Vec<usize>)> {
        prop::collection::vec((arb_filler(), 0..NAMES.len()), 0..12).prop_map(|parts| {
            let mut template = String::from("select * from t where ");
            let mut order = Vec::new();
            for (filler, index) in parts {
                template.push_str(&filler);
                template.push('{');
                template.push_str(NAMES[index]);
                template.push('}');
                order.push(index);
            }
            (template, order)
        })
    }

    fn arb_condition() -> impl Strategy<Value = Condition> {
        let field = "[a-z][a-z_]{0,8}";
        prop_oneof![
            (field, any::<i64>()).prop_map(|(f, v)| Condition::eq(f, v)),
            (field, any::<i64>()).prop_map(|(f, v)| Condition::gt(f, v)),
            (field, "[a-z%]{1,6}").prop_map(|(f, v)| Condition::like(f, v)),
            (field, prop::collection::vec(any::<i64>(), 1..5)).prop_map(|(f, v)| Condition::is_in(f, v)),
            (field, prop::collection::vec(any::<i64>(), 1..5)).prop_map(|(f, v)| Condition::not_in(f, v)),
            (field, any::<i64>(), any::<i64>()).prop_map(|(f, lo, hi)| Condition::between(f, lo, hi)),
            field.prop_map(Condition::is_null),
            (any::<i64>(), any::<i64>())
                .prop_map(|(a, b)| Condition::raw("a = ? or b = ?", vec![Value::Integer(a), Value::Integer(b)])),
        ]
    }

    fn arb_set() -> impl Strategy<Value = ConditionSet> {
        let leaf = (any::<bool>(), prop::collection::vec(arb_condition(), 1..4)).prop_map(|(all, conditions)| {
            let base = if all { ConditionSet::all() } else { ConditionSet::any() };
            conditions.into_iter().fold(base, ConditionSet::with)
        });
        leaf.prop_recursive(3, 24, 4, |inner| {
            (
                any::<bool>(),
                prop::collection::vec(arb_condition(), 0..3),
                prop::collection::vec(inner, 1..3),
            )
                .prop_map(|(all, conditions, groups)| {
                    let base = if all { ConditionSet::all() } else { ConditionSet::any() };
                    let set = conditions.into_iter().fold(base, ConditionSet::with);
                    groups.into_iter().fold(set, ConditionSet::group)
                })
        })
    }

    /// Operand values in the order they were written, depth first.
    fn operand_values(set: &ConditionSet, out: &mut Vec<Value>) {
        for node in set.nodes() {
            match node {
                Node::Condition(condition) => out.extend_from_slice(condition.operand().values()),
                Node::Group(group) => operand_values(group, out),
            }
        }
    }

    // Property tests

    proptest! {
        #[test]
        fn test_template_binds_each_occurrence((template, order) in arb_template()) {
            let params = named_params();
            let compiled = compile_template(&template, &params).unwrap();

            let expected: Vec<Value> = order.iter().map(|i| Value::Integer(*i as i64)).collect();
            prop_assert_eq!(compiled.params(), expected.as_slice());
            prop_assert_eq!(count_placeholders(compiled.sql()), order.len());
            prop_assert!(!compiled.sql().contains('{'), "compiled SQL still contains a template brace");
        }

        #[test]
        fn test_template_reports_missing_names((template, order) in arb_template(), dropped in 0..NAMES.len()) {
            let params: NamedParams = NAMES
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != dropped)
                .map(|(i, name)| (name.to_string(), Value::Integer(i as i64)))
                .collect();

            let used: HashSet<usize> = order.iter().copied().collect();
            match compile_template(&template, &params) {
                Ok(compiled) => {
                    prop_assert!(!used.contains(&dropped));
                    prop_assert_eq!(compiled.params().len(), order.len());
                }
                Err(WeaveError::MissingParameter(name)) => {
                    prop_assert!(used.contains(&dropped));
                    prop_assert_eq!(name.as_str(), NAMES[dropped]);
                }
                Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
            }
        }

        #[test]
        fn test_conditions_placeholders_match_params(set in arb_set()) {
            let compiled = compile_conditions("select * from t", &set).unwrap();

            let mut expected = Vec::new();
            operand_values(&set, &mut expected);
            prop_assert_eq!(count_placeholders(compiled.sql()), compiled.params().len());
            prop_assert_eq!(compiled.params(), expected.as_slice());
            prop_assert!(compiled.sql().starts_with("select * from t where "));
        }
    }

    #[test]
    fn test_repeated_name_binds_twice() {
        let params = NamedParams::new().with("a", 1).with("b", 2);
        let compiled = compile_template("select {a}, {b}, {a}", &params).unwrap();
        assert_eq!(compiled.sql(), "select ?, ?, ?");
        assert_eq!(
            compiled.params(),
            &[Value::Integer(1), Value::Integer(2), Value::Integer(1)]
        );
    }
}
