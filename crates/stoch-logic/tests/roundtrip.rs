//! Round-trip law for property rendering.
//!
//! For any property, rendering it, parsing the rendering, and rendering
//! again reproduces the first rendering exactly. This is the guarantee the
//! binding surface relies on: canonical text survives a parse unchanged.

use proptest::prelude::*;
use stoch_logic::{
    parse_property, Bound, CmpOp, OptimalityType, PathFormula, Property, StateFormula,
};
use stoch_syntax::{parse, BinOp, Expr, ExprKind, Program, Span};

fn test_program() -> Program {
    parse(
        "dtmc\nmodule m\ns : [0..7] init 0;\n[] s<7 -> 0.5 : (s'=s+1) + 0.5 : (s'=0);\n[] s=7 -> (s'=7);\nendmodule\nlabel \"one\" = s=1;\nlabel \"two\" = s=2;\n",
    )
    .unwrap()
}

/// An atomic comparison over the test program's variable.
fn atom_strategy() -> impl Strategy<Value = StateFormula> {
    let ops = prop::sample::select(vec![
        BinOp::Eq,
        BinOp::Ne,
        BinOp::Lt,
        BinOp::Le,
        BinOp::Gt,
        BinOp::Ge,
    ]);
    (ops, 0i64..=7).prop_map(|(op, k)| {
        let left = Expr::new(ExprKind::Ident("s".to_string()), Span::dummy());
        let right = Expr::new(ExprKind::Int(k), Span::dummy());
        StateFormula::Atom(Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            Span::dummy(),
        ))
    })
}

fn bound_strategy() -> impl Strategy<Value = Bound> {
    prop_oneof![
        Just(Bound::Query),
        prop::sample::select(vec![CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge]).prop_flat_map(
            |op| {
                prop::sample::select(vec![0.25f64, 0.5, 0.75, 1.0])
                    .prop_map(move |value| Bound::Threshold { op, value })
            }
        ),
    ]
}

fn formula_strategy(depth: u32) -> BoxedStrategy<StateFormula> {
    let leaf = prop_oneof![
        Just(StateFormula::True),
        Just(StateFormula::False),
        prop::sample::select(vec!["one".to_string(), "two".to_string()])
            .prop_map(StateFormula::Label),
        atom_strategy(),
    ]
    .boxed();

    if depth == 0 {
        return leaf;
    }

    let inner = formula_strategy(depth - 1);
    let path = path_strategy(depth - 1);
    prop_oneof![
        4 => leaf,
        1 => inner.clone().prop_map(|f| StateFormula::Not(Box::new(f))),
        1 => (formula_strategy(depth - 1), formula_strategy(depth - 1))
            .prop_map(|(l, r)| StateFormula::And(Box::new(l), Box::new(r))),
        1 => (formula_strategy(depth - 1), formula_strategy(depth - 1))
            .prop_map(|(l, r)| StateFormula::Or(Box::new(l), Box::new(r))),
        1 => (formula_strategy(depth - 1), formula_strategy(depth - 1))
            .prop_map(|(l, r)| StateFormula::Implies(Box::new(l), Box::new(r))),
        1 => inner.prop_map(|f| StateFormula::Paren(Box::new(f))),
        2 => (bound_strategy(), path).prop_map(|(bound, path)| StateFormula::Prob {
            opt: None,
            bound,
            path: Box::new(path),
        }),
    ]
    .boxed()
}

fn path_strategy(depth: u32) -> BoxedStrategy<PathFormula> {
    let sf = formula_strategy(depth);
    prop_oneof![
        sf.clone().prop_map(PathFormula::Next),
        sf.clone().prop_map(PathFormula::Eventually),
        (formula_strategy(depth), 0i64..=20)
            .prop_map(|(f, k)| PathFormula::BoundedEventually(f, k)),
        sf.clone().prop_map(PathFormula::Globally),
        (formula_strategy(depth), formula_strategy(depth))
            .prop_map(|(l, r)| PathFormula::Until(l, r)),
        (formula_strategy(depth), formula_strategy(depth), 0i64..=20)
            .prop_map(|(l, r, k)| PathFormula::BoundedUntil(l, r, k)),
    ]
    .boxed()
}

proptest! {
    #[test]
    fn rendering_roundtrips(formula in formula_strategy(3)) {
        let program = test_program();
        let property = Property { formula };
        let rendered = property.to_string();
        let reparsed = parse_property(&rendered, &program)
            .unwrap_or_else(|e| panic!("failed to reparse {rendered:?}: {e}"));
        prop_assert_eq!(reparsed.to_string(), rendered);
    }
}

#[test]
fn pinned_canonical_forms() {
    let program = test_program();
    for text in [
        "P=? [F \"one\"]",
        "P<=0.5 [\"one\" U \"two\"]",
        "Pmax=? [G s<7]",
        "P>=0.25 [X !\"two\"]",
    ] {
        let property = match parse_property(text, &program) {
            Ok(p) => p,
            Err(e) => panic!("{text}: {e}"),
        };
        assert_eq!(property.to_string(), text);
    }
}

#[test]
fn optimality_suffix_renders() {
    let property = Property {
        formula: StateFormula::Prob {
            opt: Some(OptimalityType::Min),
            bound: Bound::Query,
            path: Box::new(PathFormula::Eventually(StateFormula::True)),
        },
    };
    assert_eq!(property.to_string(), "Pmin=? [F true]");
}
