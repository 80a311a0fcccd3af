//! Parser tests: statements, declarations, types, expression precedence,
//! terminators, syntax errors and determinism.

use odo_parser::parse;
use odo_types::ast::*;
use odo_types::{ErrorKind, OdoError, SourceFile};
use pretty_assertions::assert_eq;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse_ok(source: &str) -> Program {
    let sf = SourceFile::new("test.odo", source);
    match parse(&sf) {
        Ok(program) => program,
        Err(err) => panic!("unexpected parse error: {err}"),
    }
}

fn parse_err(source: &str) -> OdoError {
    let sf = SourceFile::new("test.odo", source);
    parse(&sf).expect_err("source should not parse")
}

fn stmt_kinds(source: &str) -> Vec<StmtKind> {
    parse_ok(source).stmts.into_iter().map(|s| s.kind).collect()
}

/// The single expression statement of `source`.
fn expr(source: &str) -> ExprKind {
    let mut stmts = stmt_kinds(source);
    assert_eq!(stmts.len(), 1, "expected one statement in {source:?}");
    match stmts.remove(0) {
        StmtKind::Expr(e) => e.kind,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

/// Render an expression with explicit grouping.
fn show(kind: &ExprKind) -> String {
    match kind {
        ExprKind::Int(n) => n.to_string(),
        ExprKind::Double(n) => format!("{n:?}"),
        ExprKind::Text(s) => format!("{s:?}"),
        ExprKind::Bool(b) => b.to_string(),
        ExprKind::Variable(name) => name.clone(),
        ExprKind::Unary { op, operand } => {
            let op = match op {
                UnaryOp::Plus => "+",
                UnaryOp::Neg => "-",
            };
            format!("({op}{})", show(&operand.kind))
        }
        ExprKind::Binary { left, op, right } => {
            format!("({} {op} {})", show(&left.kind), show(&right.kind))
        }
        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
            ..
        } => format!(
            "({} ? {} : {})",
            show(&cond.kind),
            show(&then_expr.kind),
            show(&else_expr.kind)
        ),
        ExprKind::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(|a| show(&a.kind)).collect();
            format!("{}({})", show(&callee.kind), args.join(", "))
        }
        ExprKind::StaticAccess { target, name } => {
            format!("{}::{}", show(&target.kind), name.name)
        }
        ExprKind::Assign { target, value } => {
            format!("({} = {})", show(&target.kind), show(&value.kind))
        }
        ExprKind::Func(decl) => format!("<func {}>", decl.display_name()),
    }
}

fn shown(source: &str) -> String {
    show(&expr(source))
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(shown("1 + 2 * 3 - 4 / 2"), "((1 + (2 * 3)) - (4 / 2))");
}

#[test]
fn test_comparison_and_logic_precedence() {
    assert_eq!(
        shown("a < 1 or b == c and d >= 2"),
        "((a < 1) or ((b == c) and (d >= 2)))"
    );
}

#[test]
fn test_unary_binds_tighter_than_multiplication() {
    assert_eq!(shown("-x * +y"), "((-x) * (+y))");
    assert_eq!(shown("--3"), "(-(-3))");
}

#[test]
fn test_ternary_is_right_associative() {
    assert_eq!(shown("a ? 1 : b ? 2 : 3"), "(a ? 1 : (b ? 2 : 3))");
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(shown("(1 + 2) * 3"), "((1 + 2) * 3)");
}

#[test]
fn test_postfix_chain() {
    assert_eq!(shown("m::inner::f(1, g(2))(3)"), "m::inner::f(1, g(2))(3)");
}

#[test]
fn test_call_args_span_lines() {
    assert_eq!(shown("f(\n  1,\n  2\n)"), "f(1, 2)");
}

#[test]
fn test_assignment_targets() {
    assert_eq!(shown("x = y = 2 + 1"), "(x = (y = (2 + 1)))");
    assert_eq!(shown("m::count = 3"), "(m::count = 3)");
}

#[test]
fn test_invalid_assignment_target() {
    let err = parse_err("f() = 3");
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert!(err.message.contains("non-variable"));
    assert_eq!(parse_err("1 + x = 3").kind, ErrorKind::SyntaxError);
}

#[test]
fn test_literals() {
    assert_eq!(expr("2.5"), ExprKind::Double(2.5));
    assert_eq!(expr("'hi'"), ExprKind::Text("hi".into()));
    assert_eq!(expr("false"), ExprKind::Bool(false));
}

#[test]
fn test_anonymous_function_literal() {
    let kinds = stmt_kinds("var f = func (x: int): int { return x }");
    let StmtKind::VarDecl(decl) = &kinds[0] else {
        panic!("expected var declaration");
    };
    let Some(Expr {
        kind: ExprKind::Func(func),
        ..
    }) = &decl.init
    else {
        panic!("expected function literal");
    };
    assert_eq!(func.name, None);
    assert_eq!(func.params.len(), 1);
    assert_eq!(func.ret.as_ref().map(ToString::to_string), Some("int".into()));
}

// ─────────────────────────────────────────────────────────────────────
// Declarations & types
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_var_and_const() {
    let kinds = stmt_kinds("var a\nvar b: int = 1; const c = 2\nconst d: text");
    let decls: Vec<(String, Option<String>, bool, bool)> = kinds
        .iter()
        .map(|k| match k {
            StmtKind::VarDecl(d) => (
                d.name.name.clone(),
                d.ty.as_ref().map(ToString::to_string),
                d.init.is_some(),
                d.constant,
            ),
            other => panic!("expected declaration, got {other:?}"),
        })
        .collect();
    assert_eq!(
        decls,
        vec![
            ("a".into(), None, false, false),
            ("b".into(), Some("int".into()), true, false),
            ("c".into(), None, true, true),
            ("d".into(), Some("text".into()), false, true),
        ]
    );
}

#[test]
fn test_untyped_const_requires_initializer() {
    assert_eq!(parse_err("const c").kind, ErrorKind::SyntaxError);
}

#[test]
fn test_function_types() {
    let kinds = stmt_kinds("var f: <int, double?: text>\nvar g: <:>\nvar h: <geo::Shape:>");
    let types: Vec<String> = kinds
        .iter()
        .filter_map(|k| match k {
            StmtKind::VarDecl(d) => d.ty.as_ref().map(ToString::to_string),
            _ => None,
        })
        .collect();
    assert_eq!(types, vec!["<int, double?: text>", "<:>", "<geo::Shape:>"]);
}

#[test]
fn test_func_declaration() {
    let kinds = stmt_kinds("func add(a: int, b: int = 2): int {\n  return a + b\n}");
    let StmtKind::Func(func) = &kinds[0] else {
        panic!("expected function");
    };
    assert_eq!(func.display_name(), "add");
    let params: Vec<(&str, bool)> = func
        .params
        .iter()
        .map(|p| (p.name.name.as_str(), p.init.is_some()))
        .collect();
    assert_eq!(params, vec![("a", false), ("b", true)]);
    assert_eq!(func.body.stmts.len(), 1);
    assert!(matches!(func.body.stmts[0].kind, StmtKind::Return(Some(_))));
}

#[test]
fn test_module_and_enum() {
    let kinds = stmt_kinds(
        r#"module geo {
  enum Shape { Circle, Square
    Triangle }
  const sides = 3
}"#,
    );
    let StmtKind::Module(module) = &kinds[0] else {
        panic!("expected module");
    };
    assert_eq!(module.name.name, "geo");
    assert_eq!(module.body.len(), 2);
    let StmtKind::Enum(shape) = &module.body[0].kind else {
        panic!("expected enum");
    };
    let cases: Vec<&str> = shape.cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(cases, vec!["Circle", "Square", "Triangle"]);
}

// ─────────────────────────────────────────────────────────────────────
// Control flow
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_if_else_chain() {
    let kinds = stmt_kinds("if a { 1 }\nelse if b { 2 } else { 3 }");
    let StmtKind::If(stmt) = &kinds[0] else {
        panic!("expected if");
    };
    let Some(ElseBranch::ElseIf(nested)) = &stmt.else_branch else {
        panic!("expected else if");
    };
    assert!(matches!(nested.else_branch, Some(ElseBranch::Block(_))));
}

#[test]
fn test_loops_and_jumps() {
    let kinds = stmt_kinds("loop { break }\nwhile x < 3 { continue }\nreturn\nreturn 1");
    assert!(matches!(&kinds[0], StmtKind::Loop(b) if matches!(b.stmts[0].kind, StmtKind::Break)));
    assert!(matches!(&kinds[1], StmtKind::While { body, .. } if matches!(body.stmts[0].kind, StmtKind::Continue)));
    assert!(matches!(kinds[2], StmtKind::Return(None)));
    assert!(matches!(kinds[3], StmtKind::Return(Some(_))));
}

#[test]
fn test_forange_forms() {
    let forms: Vec<(Option<String>, bool, bool)> = stmt_kinds(
        "forange : 3 {}\nforange i: 1, 4 {}\nforange (j ~: 5) {}",
    )
    .into_iter()
    .map(|k| match k {
        StmtKind::Forange(f) => (f.ident.map(|i| i.name), f.reversed, f.second.is_some()),
        other => panic!("expected forange, got {other:?}"),
    })
    .collect();
    assert_eq!(
        forms,
        vec![
            (None, false, false),
            (Some("i".into()), false, true),
            (Some("j".into()), true, false),
        ]
    );
}

#[test]
fn test_forange_requires_colon() {
    assert_eq!(parse_err("forange i 3 {}").kind, ErrorKind::SyntaxError);
}

// ─────────────────────────────────────────────────────────────────────
// Terminators & errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_separators() {
    assert_eq!(stmt_kinds("\n\n;a;;b\n\nc;").len(), 3);
    assert_eq!(stmt_kinds("{ a }").len(), 1);
}

#[test]
fn test_missing_terminator() {
    let err = parse_err("var a = 1 var b = 2");
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert!(err.message.contains("Unexpected token `var`"), "{}", err.message);
}

#[test]
fn test_unclosed_block() {
    let err = parse_err("if a { 1");
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert!(err.message.contains("end of input"), "{}", err.message);
}

#[test]
fn test_stray_closing_brace() {
    assert_eq!(parse_err("a }").kind, ErrorKind::SyntaxError);
}

#[test]
fn test_lexer_errors_pass_through() {
    assert_eq!(parse_err("a $ b").kind, ErrorKind::InputError);
}

#[test]
fn test_deeply_nested_parentheses() {
    let depth = 2000;
    let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(expr(&source), ExprKind::Int(1));
}

#[test]
fn test_parser_determinism_100_iterations() {
    let source = r#"module m {
  func g(): int { return h() }
  func h(): int { return 1 }
}
var x = m::g() > 0 ? "yes" : "no""#;
    let first = parse_ok(source);
    for i in 0..100 {
        assert_eq!(first, parse_ok(source), "Determinism failure at iteration {i}");
    }
}
