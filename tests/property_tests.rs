//! Property-based tests for the expression pipeline: randomly generated
//! integer arithmetic must evaluate exactly like a direct evaluation of the
//! generating tree, and a parsed expression re-emitted fully parenthesized
//! must re-parse to the same shape.

use proptest::prelude::*;

use stone::interpreter::environment::Environment;
use stone::interpreter::value::Value;
use stone::interpreter::Evaluator;
use stone::lexer::Lexer;
use stone::parser::ast::{Expr, ExprKind, StmtKind};
use stone::parser::Parser;

#[derive(Debug, Clone)]
enum Arith {
    Lit(i32),
    Add(Box<Arith>, Box<Arith>),
    Sub(Box<Arith>, Box<Arith>),
    Mul(Box<Arith>, Box<Arith>),
    Neg(Box<Arith>),
}

fn arb_arith() -> impl Strategy<Value = Arith> {
    let leaf = (0i32..1000).prop_map(Arith::Lit);
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Arith::Add(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Arith::Sub(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Arith::Mul(Box::new(a), Box::new(b))),
            inner.prop_map(|a| Arith::Neg(Box::new(a))),
        ]
    })
}

fn source_of(arith: &Arith) -> String {
    match arith {
        Arith::Lit(n) => n.to_string(),
        Arith::Add(l, r) => format!("({} + {})", source_of(l), source_of(r)),
        Arith::Sub(l, r) => format!("({} - {})", source_of(l), source_of(r)),
        Arith::Mul(l, r) => format!("({} * {})", source_of(l), source_of(r)),
        Arith::Neg(x) => format!("(-{})", source_of(x)),
    }
}

fn reference_eval(arith: &Arith) -> i32 {
    match arith {
        Arith::Lit(n) => *n,
        Arith::Add(l, r) => reference_eval(l).wrapping_add(reference_eval(r)),
        Arith::Sub(l, r) => reference_eval(l).wrapping_sub(reference_eval(r)),
        Arith::Mul(l, r) => reference_eval(l).wrapping_mul(reference_eval(r)),
        Arith::Neg(x) => reference_eval(x).wrapping_neg(),
    }
}

fn parse_expr(source: &str) -> Expr {
    let program = Parser::new(Lexer::new(source))
        .parse()
        .expect("generated source must parse");
    assert_eq!(program.statements.len(), 1);
    match program.statements.into_iter().next().unwrap().kind {
        StmtKind::Expr(expr) => expr,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

// Re-emits the tree fully parenthesized, preserving grouping exactly.
fn reemit(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Binary { op, left, right } => {
            format!("({} {} {})", reemit(left), op, reemit(right))
        }
        ExprKind::Unary { op, operand } => format!("({}{})", op, reemit(operand)),
        ExprKind::Int(value) => value.to_string(),
        other => panic!("unexpected node in arithmetic source: {:?}", other),
    }
}

proptest! {
    #[test]
    fn arithmetic_matches_direct_evaluation(arith in arb_arith()) {
        let program = Parser::new(Lexer::new(source_of(&arith)))
            .parse()
            .expect("generated source must parse");
        let env = Environment::new();
        let result = Evaluator::new()
            .evaluate(&program, &env)
            .expect("arithmetic must evaluate");

        let expected = reference_eval(&arith);
        prop_assert!(
            matches!(result, Value::Int(n) if n == expected),
            "expected {}, got {:?}", expected, result
        );
    }

    #[test]
    fn reemitted_expression_reparses_to_the_same_shape(arith in arb_arith()) {
        let first = parse_expr(&source_of(&arith));
        let second = parse_expr(&reemit(&first));
        prop_assert_eq!(format!("{:?}", first.kind), format!("{:?}", second.kind));
    }
}
