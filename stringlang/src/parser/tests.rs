//! Parser tests for stringlang syntax

use crate::ast::{BinOp, Expr, Lambda, Program};
use crate::error::ErrorToken;
use crate::parser::parse_source;

/// Helper to parse a program
fn parse_program(source: &str) -> crate::Result<Program> {
    parse_source("test.sl", source)
}

/// Helper to parse and expect success
fn parse_ok(source: &str) -> Program {
    parse_program(source).expect("Parse should succeed")
}

/// Helper to parse a single-statement program and return the statement
fn parse_expr(source: &str) -> Expr {
    let prog = parse_ok(source);
    assert!(prog.funcs.is_empty());
    assert_eq!(prog.body.len(), 1, "expected one statement in {source:?}");
    prog.body.into_iter().next().unwrap()
}

// ============================================
// Basic Expressions
// ============================================

#[test]
fn test_parse_empty_program() {
    let prog = parse_ok("");
    assert!(prog.funcs.is_empty());
    assert!(prog.body.is_empty());
}

#[test]
fn test_parse_string_literal() {
    assert_eq!(parse_expr(r#""hello""#), Expr::literal("hello"));
}

#[test]
fn test_parse_arg_and_var() {
    assert_eq!(parse_expr("$3"), Expr::Arg(3));
    assert_eq!(parse_expr("abc"), Expr::var("abc"));
}

#[test]
fn test_parse_statements_and_trailing_semicolon() {
    let prog = parse_ok(r#"a = "1"; b = "2"; a;"#);
    assert_eq!(prog.body.len(), 3);
    assert_eq!(prog.body[0], Expr::assign("a", Expr::literal("1")));
}

// ============================================
// Operators
// ============================================

#[test]
fn test_parse_precedence() {
    // || binds loosest, + tightest
    let e = parse_expr("a || b && c != d == e + f");
    let expected = Expr::binary(
        BinOp::Or,
        Expr::var("a"),
        Expr::binary(
            BinOp::And,
            Expr::var("b"),
            Expr::binary(
                BinOp::NotEquals,
                Expr::var("c"),
                Expr::binary(
                    BinOp::Equals,
                    Expr::var("d"),
                    Expr::binary(BinOp::Concat, Expr::var("e"), Expr::var("f")),
                ),
            ),
        ),
    );
    assert_eq!(e, expected);
}

#[test]
fn test_parse_left_associative_concat() {
    let e = parse_expr("a + b + c");
    let expected = Expr::binary(
        BinOp::Concat,
        Expr::binary(BinOp::Concat, Expr::var("a"), Expr::var("b")),
        Expr::var("c"),
    );
    assert_eq!(e, expected);
}

#[test]
fn test_parse_assignment_is_right_associative() {
    let e = parse_expr(r#"a = b = "x""#);
    assert_eq!(
        e,
        Expr::assign("a", Expr::assign("b", Expr::literal("x")))
    );
}

#[test]
fn test_parse_parenthesized_assignment_operand() {
    let e = parse_expr(r#"x + (x = "b")"#);
    assert_eq!(
        e,
        Expr::binary(
            BinOp::Concat,
            Expr::var("x"),
            Expr::assign("x", Expr::literal("b"))
        )
    );
}

// ============================================
// Calls, Index, Lambdas
// ============================================

#[test]
fn test_parse_call() {
    let e = parse_expr(r#"f(a, "b", $0)"#);
    assert_eq!(
        e,
        Expr::call_named("f", vec![Expr::var("a"), Expr::literal("b"), Expr::Arg(0)])
    );
    assert_eq!(parse_expr("g()"), Expr::call_named("g", vec![]));
}

#[test]
fn test_parse_index_forms() {
    assert_eq!(
        parse_expr("s[2]"),
        Expr::index(Expr::var("s"), Expr::literal("2"))
    );
    assert_eq!(
        parse_expr("s[i]"),
        Expr::index(Expr::var("s"), Expr::var("i"))
    );
}

#[test]
fn test_parse_lambda_and_immediate_call() {
    let e = parse_expr(r#"fun(x) { x }("a")"#);
    let lambda = Lambda {
        params: vec!["x".into()],
        body: vec![Expr::var("x")],
    };
    assert_eq!(
        e,
        Expr::call(Expr::Lambda(lambda), vec![Expr::literal("a")])
    );
}

#[test]
fn test_parse_chained_call() {
    let e = parse_expr("make()(x)");
    assert_eq!(
        e,
        Expr::call(Expr::call_named("make", vec![]), vec![Expr::var("x")])
    );
}

// ============================================
// Control Flow
// ============================================

#[test]
fn test_parse_if_else() {
    let e = parse_expr(r#"if (a == "1") { "yes" } else { "no" }"#);
    assert_eq!(
        e,
        Expr::if_else(
            Expr::binary(BinOp::Equals, Expr::var("a"), Expr::literal("1")),
            vec![Expr::literal("yes")],
            vec![Expr::literal("no")],
        )
    );
}

#[test]
fn test_parse_else_if_chain() {
    let e = parse_expr("if (a) { b } else if (c) { d } else { }");
    let inner = Expr::if_else(Expr::var("c"), vec![Expr::var("d")], vec![]);
    assert_eq!(
        e,
        Expr::if_else(Expr::var("a"), vec![Expr::var("b")], vec![inner])
    );
}

#[test]
fn test_parse_while() {
    let e = parse_expr(r#"while (a != "5") { a = a + "1" }"#);
    assert_eq!(
        e,
        Expr::while_loop(
            Expr::binary(BinOp::NotEquals, Expr::var("a"), Expr::literal("5")),
            vec![Expr::assign(
                "a",
                Expr::binary(BinOp::Concat, Expr::var("a"), Expr::literal("1"))
            )],
        )
    );
}

// ============================================
// Declarations
// ============================================

#[test]
fn test_parse_function_declarations() {
    let prog = parse_ok(r#"fun f(x) { x + "!" } fun g() { "g" } f("hi")"#);
    assert_eq!(prog.funcs.len(), 2);
    assert_eq!(prog.funcs[0].name, "f");
    assert_eq!(prog.funcs[0].params, vec!["x".to_string()]);
    assert_eq!(prog.funcs[1].name, "g");
    assert_eq!(prog.body.len(), 1);
}

#[test]
fn test_parse_declaration_then_lambda_body() {
    let prog = parse_ok("fun f() { \"f\" } fun() { \"lambda\" }");
    assert_eq!(prog.funcs.len(), 1);
    assert!(matches!(prog.body[0], Expr::Lambda(_)));
}

#[test]
fn test_parse_declarations_only() {
    let prog = parse_ok("fun id(x) { x }");
    assert_eq!(prog.funcs.len(), 1);
    assert!(prog.body.is_empty());
}

// ============================================
// Round Trips
// ============================================

#[test]
fn test_display_reparses_to_same_tree() {
    let sources = [
        r#"fun f(x, y) { x + y } a = f("1", "2"); if (a == "12") { b = a[0] } else { b = "" }; b"#,
        r#"i = ""; while (i != "aaa") { i = i + "a" }; (i + "b") + "c""#,
        r#"g = fun(q) { q + "\n" }; g("x")"#,
        r#"a + (b + c) == (d || e)"#,
    ];
    for source in sources {
        let prog = parse_ok(source);
        let printed = prog.to_string();
        assert_eq!(parse_ok(&printed), prog, "round trip of {printed:?}");
    }
}

// ============================================
// Errors
// ============================================

#[test]
fn test_parse_error_at_eof_needs_more_input() {
    let err = parse_program("while (a) {").unwrap_err();
    assert!(err.needs_more_input());
    assert_eq!(err.error_token(), Some(&ErrorToken::EndOfInput));
}

#[test]
fn test_parse_error_unexpected_token() {
    let err = parse_program("a = ) b").unwrap_err();
    assert!(!err.needs_more_input());
    let token = err.error_token().unwrap();
    assert_eq!(token.literal(), ")");
    assert_eq!(token.kind(), "punctuation");
}

#[test]
fn test_parse_if_requires_else() {
    let err = parse_program("if (a) { b } c").unwrap_err();
    assert!(!err.needs_more_input());
}
