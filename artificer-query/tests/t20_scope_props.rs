mod common;

use std::collections::BTreeSet;

use artificer_query::ast::{Expr, LocationPath, Query};
use artificer_query::model::{Constraint, CoreProperty, Operator, Property};
use artificer_query::{CompilerConfig, ConstraintTree, QueryCompiler, Value};
use common::{FakeIndex, collaborators};
use proptest::prelude::*;

fn core_name() -> impl Strategy<Value = CoreProperty> {
    prop::sample::select(
        CoreProperty::ALL
            .into_iter()
            .filter(|p| !p.is_timestamp())
            .collect::<Vec<_>>(),
    )
}

fn chain(tests: &[Expr], and: bool) -> Expr {
    let mut iter = tests.iter().rev().cloned();
    let last = iter.next().expect("non-empty chain");
    iter.fold(last, |acc, e| if and { e.and(acc) } else { e.or(acc) })
}

fn compile(query: &Query) -> ConstraintTree {
    let index = FakeIndex(Vec::new());
    let config = CompilerConfig::default();
    QueryCompiler::new(&collaborators(&index), &config)
        .compile_tree(query, None)
        .unwrap()
}

fn body(tree: &ConstraintTree) -> Constraint {
    match tree.constraint.clone() {
        Some(Constraint::And(body, _trash)) => *body,
        other => panic!("expected a predicate body, got {other:?}"),
    }
}

fn collect_aliases(c: &Constraint, out: &mut Vec<String>) {
    match c {
        Constraint::And(l, r) | Constraint::Or(l, r) => {
            collect_aliases(l, out);
            collect_aliases(r, out);
        }
        Constraint::Not(inner) => collect_aliases(inner, out),
        Constraint::ExistsSubquery(sub) => {
            out.extend(sub.source.selectors().iter().map(|s| s.alias.to_string()));
            if let Some(inner) = &sub.constraint {
                collect_aliases(inner, out);
            }
        }
        _ => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn and_chains_keep_every_test_in_order(
        tests in prop::collection::vec((core_name(), "v[a-z]{0,7}"), 1..8),
        and in any::<bool>(),
    ) {
        let exprs: Vec<Expr> = tests
            .iter()
            .map(|(p, v)| Expr::equals(p.local_name(), v.clone()))
            .collect();
        let tree = compile(&Query::new(LocationPath::all()).with_predicate(chain(&exprs, and)));

        let root = tree.column.clone();
        let expected: Vec<Constraint> = tests
            .iter()
            .map(|(p, v)| Constraint::Comparison {
                operand: root.operand(Property::Core(*p)),
                operator: Operator::Eq,
                value: Value::string(v.clone()),
            })
            .collect();
        let expected = if and {
            Constraint::and_all(expected)
        } else {
            Constraint::or_all(expected)
        };
        prop_assert_eq!(Some(body(&tree)), expected);
    }

    #[test]
    fn custom_property_probes_never_share_aliases(
        names in prop::collection::vec("[a-z]{3,8}", 1..6),
    ) {
        let exprs: Vec<Expr> = names.iter().map(|n| Expr::exists(format!("x{n}"))).collect();
        let tree = compile(&Query::new(LocationPath::all()).with_predicate(chain(&exprs, false)));

        let mut aliases = Vec::new();
        collect_aliases(&body(&tree), &mut aliases);
        prop_assert_eq!(aliases.len(), names.len() * 2);
        let unique: BTreeSet<_> = aliases.iter().collect();
        prop_assert_eq!(unique.len(), aliases.len());
        prop_assert!(!aliases.contains(&tree.column.alias.to_string()));
    }

    #[test]
    fn compiling_twice_gives_the_same_tree(
        names in prop::collection::vec("[a-z]{3,8}", 1..5),
    ) {
        let exprs: Vec<Expr> = names.iter().map(|n| Expr::equals(format!("x{n}"), n.clone())).collect();
        let query = Query::new(LocationPath::all()).with_predicate(chain(&exprs, true).negate());

        let index = FakeIndex(Vec::new());
        let config = CompilerConfig::default();
        let collaborators = collaborators(&index);
        let compiler = QueryCompiler::new(&collaborators, &config);
        let first = compiler.compile_tree(&query, None).unwrap();
        let second = compiler.compile_tree(&query, None).unwrap();
        prop_assert_eq!(first, second);
    }
}
