//! Interpreter integration tests.
//!
//! Each test runs an Odo program through [`Engine::interpret`] (analysis
//! followed by evaluation) and asserts on the resulting value or error.

use std::cell::RefCell;
use std::rc::Rc;

use odo_eval::{
    Arity, Engine, EngineConfig, Environment, ErrorKind, Interpreter, NativeCall, OdoError,
    ParamSpec, TypeId, Value,
};
use odo_types::{SourceFile, TypeTable};
use pretty_assertions::assert_eq;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn run(source: &str) -> Value {
    run_with(&mut Engine::new(), source)
}

fn run_with(engine: &mut Engine, source: &str) -> Value {
    match engine.interpret(source) {
        Ok(value) => value,
        Err(err) => panic!("expected program to run, got {err}"),
    }
}

fn run_err(source: &str) -> OdoError {
    run_err_with(&mut Engine::new(), source)
}

fn run_err_with(engine: &mut Engine, source: &str) -> OdoError {
    match engine.interpret(source) {
        Ok(value) => panic!("expected program to fail, got {value:?}"),
        Err(err) => err,
    }
}

fn assert_error(source: &str, kind: ErrorKind, message: &str) {
    let err = run_err(source);
    assert_eq!((err.kind, err.message.as_str()), (kind, message));
}

type Log = Rc<RefCell<Vec<String>>>;

/// Engine with a `log` native that records its arguments.
fn engine_with_log() -> (Engine, Log) {
    let log: Log = Rc::default();
    let sink = Rc::clone(&log);
    let mut engine = Engine::new();
    engine
        .add_function("log", Arity::Any, None, move |args: &[Value]| {
            let line: Vec<String> = args.iter().map(Value::to_string).collect();
            sink.borrow_mut().push(line.join(" "));
            Ok(Value::Null)
        })
        .unwrap();
    (engine, log)
}

fn lines(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// ══════════════════════════════════════════════════════════════════════════════
// Arithmetic & text
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_constant_sum() {
    assert_eq!(
        run("const x = 10; const y = -10; const z = x + y\nz"),
        Value::Int(0)
    );
}

#[test]
fn test_text_repetition() {
    assert_eq!(run("var s = \"ab\" * 3\ns"), Value::text("ababab"));
    assert_eq!(run("2 * \"ab\""), Value::text("abab"));
    assert_eq!(run("\"ab\" * 0"), Value::text(""));
    assert_error(
        "\"ab\" * 2.5",
        ErrorKind::TypeError,
        "Text can only be multiplied by an integer.",
    );
    assert_error(
        "\"ab\" * 9223372036854775807",
        ErrorKind::RuntimeError,
        "Text repetition by `9223372036854775807` exceeds the maximum text length.",
    );
}

#[test]
fn test_ternary_result_takes_false_branch_type() {
    assert_eq!(run("var t = true ? 1 : 2.5\nt"), Value::Double(1.0));
    assert_eq!(run("false ? 2.5 : 7"), Value::Int(7));
    assert_eq!(run("true ? 2.5 : 7"), Value::Int(2));
    assert_eq!(run("var x = 3\nx > 2 ? \"big\" : \"small\""), Value::text("big"));
}

#[test]
fn test_ternary_rejects_void_branch() {
    assert_error(
        "func f() { }\ntrue ? f() : f()",
        ErrorKind::ValueError,
        "True branch in ternary operator must have a type (provide value).",
    );
}

#[test]
fn test_text_concatenation_uses_display_forms() {
    assert_eq!(run("\"a\" + 1 + 2.0"), Value::text("a12.0"));
    assert_eq!(run("1 + \"a\""), Value::text("1a"));
    assert_eq!(run("\"is \" + true"), Value::text("is true"));
}

#[test]
fn test_division_is_double_and_checks_zero() {
    assert_eq!(run("7 / 2"), Value::Double(3.5));
    assert_eq!(run("6 / 3"), Value::Double(2.0));
    let err = run_err("10 / 0");
    assert_eq!(err.kind, ErrorKind::RuntimeError);
    assert_eq!(
        err.to_string(),
        "RuntimeError:\n\tAttempted Division operation over zero."
    );
    assert!(err.span.is_some());
}

#[test]
fn test_mixed_arithmetic_widens() {
    assert_eq!(run("3 * 2"), Value::Int(6));
    assert_eq!(run("3 * 2.0"), Value::Double(6.0));
    assert_eq!(run("1 - 0.5"), Value::Double(0.5));
    assert_eq!(run("-(2 + 3)"), Value::Int(-5));
}

#[test]
fn test_integer_overflow() {
    assert_error(
        "9223372036854775807 + 1",
        ErrorKind::RuntimeError,
        "Integer overflow in operation `+`.",
    );
}

#[test]
fn test_comparisons_and_equality() {
    assert_eq!(run("1 == 1.0"), Value::Bool(true));
    assert_eq!(run("2 < 2.5"), Value::Bool(true));
    assert_eq!(run("3 >= 3"), Value::Bool(true));
    assert_eq!(run("\"a\" != \"b\""), Value::Bool(true));
    assert_eq!(run("func f() {}\nvar g = f\ng == f"), Value::Bool(true));
}

// ══════════════════════════════════════════════════════════════════════════════
// Variables & coercion
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_narrowing_truncates_toward_zero() {
    assert_eq!(run("var d: int = 2.9\nd"), Value::Int(2));
    assert_eq!(run("var d: int = -2.9\nd"), Value::Int(-2));
    assert_eq!(run("var e: double = 2\ne"), Value::Double(2.0));
}

#[test]
fn test_any_adopts_first_write() {
    assert_eq!(run("var a\na = 3\na = 2.5\na"), Value::Int(2));
    assert_eq!(run("var a = 1.5\na = 2\na"), Value::Double(2.0));
}

#[test]
fn test_constant_initialized_later() {
    assert_eq!(run("const c: int\nc = 4\nc"), Value::Int(4));
}

#[test]
fn test_shadowing_restores_outer_binding() {
    assert_eq!(run("var a = 1\n{ var a = \"x\" }\na"), Value::Int(1));
    assert_eq!(run("var a = 1\n{ var a = 5\n a }"), Value::Int(5));
    assert_eq!(run("var a = 1\n{ a = 7 }\na"), Value::Int(7));
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_if_else_chain() {
    let source = r#"
var x = 5
var label = ""
if x < 3 { label = "small" } else if x < 10 { label = "medium" } else { label = "large" }
label
"#;
    assert_eq!(run(source), Value::text("medium"));
}

#[test]
fn test_break_stays_in_loop_and_return_leaves_function() {
    let source = r#"
func f(): int {
  var total = 0
  loop {
    total = total + 1
    if total == 3 { break }
  }
  while true {
    return total * 10
  }
  return 0
}
f()
"#;
    assert_eq!(run(source), Value::Int(30));
}

#[test]
fn test_return_from_nested_loops() {
    let source = r#"
func find(target: int): int {
  forange i : 10 {
    forange j : 10 {
      if i * j == target { return i * 100 + j }
    }
  }
  return -1
}
find(12)
"#;
    assert_eq!(run(source), Value::Int(206));
}

#[test]
fn test_continue_skips_iteration() {
    let source = r#"
var sum = 0
forange i : 5 {
  if i == 2 { continue }
  sum = sum + i
}
sum
"#;
    assert_eq!(run(source), Value::Int(8));
}

#[test]
fn test_forange_ranges() {
    let collect = |header: &str| {
        run(&format!("var out = \"\"\nforange {header} {{ out = out + i }}\nout"))
    };
    assert_eq!(collect("i : 3"), Value::text("012"));
    assert_eq!(collect("i ~: 3"), Value::text("210"));
    assert_eq!(collect("i : 2, 5"), Value::text("234"));
    assert_eq!(collect("i ~: 2, 5"), Value::text("432"));
    assert_eq!(collect("i : 1, 3.9"), Value::text("12"));
    assert_eq!(collect("i : 5, 2"), Value::text(""));
}

#[test]
fn test_forange_without_identifier() {
    assert_eq!(run("var n = 0\nforange : 4 { n = n + 1 }\nn"), Value::Int(4));
}

#[test]
fn test_while_loop() {
    assert_eq!(
        run("var n = 1\nwhile n < 100 { n = n * 3 }\nn"),
        Value::Int(243)
    );
}

#[test]
fn test_logic_operators_evaluate_both_sides() {
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    let mut engine = Engine::new();
    engine
        .add_typed_function("touch", vec![], TypeId::BOOL, move |_: &[Value]| {
            *counter.borrow_mut() += 1;
            Ok(Value::Bool(true))
        })
        .unwrap();

    assert_eq!(run_with(&mut engine, "false and touch()"), Value::Bool(false));
    assert_eq!(run_with(&mut engine, "true or touch()"), Value::Bool(true));
    assert_eq!(*calls.borrow(), 2);

    assert_eq!(run_with(&mut engine, "false ? touch() : true"), Value::Bool(true));
    assert_eq!(*calls.borrow(), 2);
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_function_without_return_never_runs() {
    let (mut engine, log) = engine_with_log();
    let err = run_err_with(&mut engine, "log(\"ran\")\nfunc f(): int { }");
    assert_eq!(err.kind, ErrorKind::SemanticError);
    assert!(lines(&log).is_empty());
}

#[test]
fn test_default_parameters() {
    let decl = "func f(a: int, b: int = 2): int { return a + b }\n";
    assert_eq!(run(&format!("{decl}f(1) + f(1, 5)")), Value::Int(9));
}

#[test]
fn test_argument_and_return_coercion() {
    assert_eq!(
        run("func half(x: double): double { return x / 2 }\nhalf(3)"),
        Value::Double(1.5)
    );
    assert_eq!(run("func id(x: int): int { return x }\nid(2.7)"), Value::Int(2));
    assert_eq!(run("func f(): int { return 2.5 }\nf()"), Value::Int(2));
}

#[test]
fn test_void_function_yields_null() {
    assert_eq!(run("func f() { return }\nf()"), Value::Null);
}

#[test]
fn test_mutual_recursion_in_either_order() {
    let even = "func isEven(n: int): bool { return n == 0 ? true : isOdd(n - 1) }";
    let odd = "func isOdd(n: int): bool { return n == 0 ? false : isEven(n - 1) }";
    let forward = run(&format!("{even}\n{odd}\nisEven(10)"));
    let backward = run(&format!("{odd}\n{even}\nisEven(10)"));
    assert_eq!(forward, Value::Bool(true));
    assert_eq!(forward, backward);
}

#[test]
fn test_function_sees_globals_declared_later() {
    assert_eq!(
        run("func f(): int { return limit }\nvar limit = 3\nf()"),
        Value::Int(3)
    );
}

#[test]
fn test_recursion() {
    let source = r#"
func fib(n: int): int {
  if n < 2 { return n }
  return fib(n - 1) + fib(n - 2)
}
fib(15)
"#;
    assert_eq!(run(source), Value::Int(610));
}

#[test]
fn test_structural_function_types() {
    let source = r#"
func dbl(x: int): int { return x * 2 }
var f: <int: int> = dbl
var g: <int: int> = func (y: int): int { return y + 1 }
f(3) + g(4)
"#;
    assert_eq!(run(source), Value::Int(11));
}

// ══════════════════════════════════════════════════════════════════════════════
// Closures & call depth
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_closure_keeps_defining_scope() {
    let source = r#"
func counter(): <: int> {
  var n = 0
  func inc(): int {
    n = n + 1
    return n
  }
  return inc
}
var c = counter()
c()
c()
"#;
    assert_eq!(run(source), Value::Int(2));
}

#[test]
fn test_closure_resolves_defining_scope_not_call_site() {
    let source = r#"
var n = 100
func adder(n: int): <int: int> {
  return func (x: int): int { return x + n }
}
var add1 = adder(1)
func call(f: <int: int>): int {
  var n = 50
  return f(2)
}
call(add1)
"#;
    assert_eq!(run(source), Value::Int(3));
}

#[test]
fn test_independent_closures() {
    let source = r#"
func counter(): <: int> {
  var n = 0
  return func (): int {
    n = n + 1
    return n
  }
}
var a = counter()
var b = counter()
a()
a()
b()
a() * 10 + b()
"#;
    assert_eq!(run(source), Value::Int(32));
}

#[test]
fn test_unbounded_recursion_hits_call_depth() {
    assert_error(
        "func f(n: int): int { return f(n + 1) }\nf(0)",
        ErrorKind::RuntimeError,
        "Callback depth exceeded!",
    );
}

#[test]
fn test_configured_call_depth() {
    let config = EngineConfig {
        max_call_depth: 5,
        ..EngineConfig::default()
    };
    let decl = "func f(n: int): int { return n == 0 ? 0 : f(n - 1) }\n";
    let mut engine = Engine::with_config(config);
    assert_eq!(run_with(&mut engine, &format!("{decl}f(4)")), Value::Int(0));
    let err = run_err_with(&mut engine, &format!("{decl}f(5)"));
    assert_eq!(err.kind, ErrorKind::RuntimeError);

    // The failed run does not leak depth into the next one.
    assert_eq!(run_with(&mut engine, &format!("{decl}f(4)")), Value::Int(0));
}

// ══════════════════════════════════════════════════════════════════════════════
// Modules & enums
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_module_forward_call() {
    let source = r#"
module m {
  func g(): int { return h() }
  func h(): int { return 1 }
}
m::g()
"#;
    assert_eq!(run(source), Value::Int(1));
}

#[test]
fn test_module_keeps_state() {
    let source = r#"
module counter {
  var count = 0
  func bump(): int {
    count = count + 1
    return count
  }
}
counter::bump()
counter::bump()
counter::count = counter::count + 10
counter::count
"#;
    assert_eq!(run(source), Value::Int(12));
}

#[test]
fn test_module_body_runs_on_first_access() {
    let (mut engine, log) = engine_with_log();
    let source = r#"
log("start")
module m {
  log("init")
  var x = 1
}
log("before")
m::x
"#;
    assert_eq!(run_with(&mut engine, source), Value::Int(1));
    assert_eq!(lines(&log), vec!["start", "before", "init"]);
}

#[test]
fn test_unused_module_runs_at_end_of_scope() {
    let (mut engine, log) = engine_with_log();
    run_with(&mut engine, "module m { log(\"init\") }\nlog(\"after\")");
    assert_eq!(lines(&log), vec!["after", "init"]);
}

#[test]
fn test_nested_modules() {
    let source = r#"
module outer {
  module inner {
    const value = 7
  }
  func get(): int { return inner::value }
}
outer::get() + outer::inner::value
"#;
    assert_eq!(run(source), Value::Int(14));
}

#[test]
fn test_module_body_cannot_break_enclosing_loop() {
    let err = run_err("var n = 0\nwhile n < 3 {\n  n = n + 1\n  module m { break }\n}\nn");
    assert_eq!(err.kind, ErrorKind::SemanticError);
    assert_eq!(err.message, "Invalid use of `break` statement outside of loop.");
}

#[test]
fn test_enum_cases() {
    let source = r#"
enum Color { Red, Green }
var c: Color = Color::Red
c == Color::Green
"#;
    assert_eq!(run(source), Value::Bool(false));
    assert_eq!(run("enum Color { Red }\nColor::Red").to_string(), "Color::Red");
}

#[test]
fn test_enum_in_module_is_qualified() {
    let source = r#"
module geo {
  enum Shape { Circle, Square }
}
var s: geo::Shape = geo::Shape::Circle
s
"#;
    let value = run(source);
    assert_eq!(value.to_string(), "geo::Shape::Circle");
    let compared = source.replace("\ns\n", "\ns == geo::Shape::Circle\n");
    assert_eq!(run(&compared), Value::Bool(true));
}

#[test]
fn test_enum_as_parameter_type() {
    let source = r#"
enum Dir { Up, Down }
func sign(d: Dir): int { return d == Dir::Up ? 1 : -1 }
sign(Dir::Up) + sign(Dir::Down) * 10
"#;
    assert_eq!(run(source), Value::Int(-9));
}

// ══════════════════════════════════════════════════════════════════════════════
// Natives
// ══════════════════════════════════════════════════════════════════════════════

fn engine_with_math() -> Engine {
    let mut engine = Engine::new();
    engine
        .add_function(
            "sqrt",
            Arity::Exact(1),
            Some(Rc::new(|call: &NativeCall<'_>| -> odo_types::Result<Option<TypeId>> {
                call.expect_arg(0, TypeId::DOUBLE)?;
                Ok(Some(TypeId::DOUBLE))
            })),
            |args: &[Value]| Ok(Value::Double(args[0].as_double().unwrap_or(0.0).sqrt())),
        )
        .unwrap();
    engine
        .add_typed_function(
            "repeat",
            vec![ParamSpec::Text, ParamSpec::IntOr(2)],
            TypeId::TEXT,
            |args: &[Value]| {
                let text = args[0].as_text().unwrap_or_default();
                let times = args[1].as_int().unwrap_or(0);
                Ok(Value::text(text.repeat(times.max(0) as usize)))
            },
        )
        .unwrap();
    engine
        .add_function("at", Arity::Exact(1), None, |args: &[Value]| {
            Err(OdoError::out_of_range(format!("Index {} out of range.", args[0])))
        })
        .unwrap();

    let mut math = engine.add_module("math").unwrap();
    math.add_value("half", Value::Double(1.5)).unwrap();
    math.add_function(
        "abs",
        Arity::Exact(1),
        Some(Rc::new(|call: &NativeCall<'_>| -> odo_types::Result<Option<TypeId>> {
            call.expect_arg(0, TypeId::DOUBLE)?;
            Ok(call.args[0])
        })),
        |args: &[Value]| {
            Ok(match &args[0] {
                Value::Int(n) => Value::Int(n.abs()),
                other => Value::Double(other.as_double().unwrap_or(0.0).abs()),
            })
        },
    )
    .unwrap();
    let mut consts = math.add_module("consts").unwrap();
    consts.add_value("e", Value::Double(2.5)).unwrap();
    engine
}

#[test]
fn test_native_with_validation() {
    let mut engine = engine_with_math();
    assert_eq!(run_with(&mut engine, "sqrt(16)"), Value::Double(4.0));
    assert_eq!(run_with(&mut engine, "math::abs(-3)"), Value::Int(3));
    assert_eq!(run_with(&mut engine, "math::abs(-3) + 1"), Value::Int(4));
    let err = run_err_with(&mut engine, "sqrt(\"x\")");
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn test_typed_native_defaults_and_coercion() {
    let mut engine = engine_with_math();
    assert_eq!(run_with(&mut engine, "repeat(\"ab\")"), Value::text("abab"));
    assert_eq!(run_with(&mut engine, "repeat(\"ab\", 3)"), Value::text("ababab"));
    assert_eq!(run_with(&mut engine, "repeat(\"a\", 2.9)"), Value::text("aa"));
}

#[test]
fn test_native_module_values() {
    let mut engine = engine_with_math();
    assert_eq!(run_with(&mut engine, "math::half * 2"), Value::Double(3.0));
    assert_eq!(run_with(&mut engine, "math::consts::e"), Value::Double(2.5));
    assert_eq!(
        run_with(&mut engine, "math::abs").to_string(),
        "<native func math::abs>"
    );
}

#[test]
fn test_native_arity_is_rechecked_at_runtime() {
    let mut engine = engine_with_math();
    let err = run_err_with(&mut engine, "var s = sqrt\ns(1, 2)");
    assert_eq!(
        (err.kind, err.message.as_str()),
        (ErrorKind::RuntimeError, "Function `sqrt` takes `1` arguments.")
    );
}

#[test]
fn test_native_errors_propagate() {
    let mut engine = engine_with_math();
    let err = run_err_with(&mut engine, "at(5)");
    assert_eq!(
        (err.kind, err.message.as_str()),
        (ErrorKind::OutOfRangeError, "Index 5 out of range.")
    );
}

#[test]
fn test_void_native() {
    let seen: Log = Rc::default();
    let sink = Rc::clone(&seen);
    let mut engine = Engine::new();
    engine
        .add_void_function("emit", vec![ParamSpec::Any], move |args: &[Value]| {
            sink.borrow_mut().push(args[0].to_string());
            Ok(())
        })
        .unwrap();
    assert_eq!(run_with(&mut engine, "emit(1.0)\nemit(\"x\")"), Value::Null);
    assert_eq!(lines(&seen), vec!["1.0", "x"]);
    let err = run_err_with(&mut engine, "var a = emit(1)");
    assert_eq!(err.kind, ErrorKind::ValueError);
}

#[test]
fn test_duplicate_native_registration() {
    let mut engine = engine_with_math();
    let err = engine
        .add_function("sqrt", Arity::Any, None, |_: &[Value]| Ok(Value::Null))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NameError);
}

// ══════════════════════════════════════════════════════════════════════════════
// Display, scope hygiene & determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_value_display() {
    assert_eq!(run("1.0 * 2").to_string(), "2.0");
    assert_eq!(run("func f() {}\nf").to_string(), "<func f>");
    assert_eq!(run("module m { }\nm").to_string(), "<module m>");
    assert_eq!(run("var x = 1").to_string(), "null");
}

#[test]
fn test_runs_release_their_scopes() {
    let source = r#"
func f(x: int): int {
  var total = 0
  forange i : x { total = total + i }
  return total
}
{ var inner = f(3) }
f(4)
"#;
    let program = odo_parser::parse(&SourceFile::new("test.odo", source)).unwrap();
    let mut env = Environment::new();
    let mut types = TypeTable::new();
    let config = EngineConfig::default();

    let first = Interpreter::new(&mut env, &mut types, &config)
        .run(&program)
        .unwrap();
    assert_eq!(first, Value::Int(6));
    let live = env.live_scopes();
    Interpreter::new(&mut env, &mut types, &config)
        .run(&program)
        .unwrap();
    assert_eq!(env.live_scopes(), live);
}

#[test]
fn test_interpret_determinism_100_iterations() {
    let source = r#"
module m {
  func g(): int { return h() }
  func h(): int { return 1 }
}
var out = ""
forange i ~: 4 { out = out + i * m::g() }
out + (m::g() > 0 ? " yes" : " no")
"#;
    let first = Engine::new().interpret(source);
    assert_eq!(first, Ok(Value::text("3210 yes")));
    for i in 0..100 {
        assert_eq!(
            first,
            Engine::new().interpret(source),
            "Determinism failure at iteration {i}"
        );
    }
}
