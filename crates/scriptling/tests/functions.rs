//! Function definition and calling: parameter binding, keyword arguments,
//! defaults, variadics, closures, and scope declarations.

use scriptling::{ExcType, Interpreter, Object};

fn eval(source: &str) -> Object {
    Interpreter::new().eval(source).unwrap()
}

fn eval_err(source: &str) -> scriptling::Exception {
    Interpreter::new().eval(source).unwrap_err()
}

#[test]
fn recursion() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
def fib(n):
    if n <= 1: return n
    return fib(n-1)+fib(n-2)
result = fib(10)
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_int("result").unwrap(), 55);
}

#[test]
fn positional_then_keyword_then_default() {
    let script = r"
def describe(name, size=10, color='red'):
    return f'{name}/{size}/{color}'
describe('box', color='blue')
";
    assert_eq!(eval(script), Object::str("box/10/blue"));
}

#[test]
fn keyword_overrides_are_rejected_for_bound_params() {
    let exc = eval_err("def f(a):\n    return a\nf(1, a=2)");
    assert_eq!(exc.exc_type(), Some(ExcType::TypeError));
    assert!(exc.message().contains("multiple values"));
}

#[test]
fn unknown_keyword_rejected() {
    let exc = eval_err("def f(a):\n    return a\nf(1, b=2)");
    assert!(exc.message().contains("unexpected keyword argument"));
}

#[test]
fn missing_required_parameter() {
    let exc = eval_err("def f(a, b):\n    return a\nf(1)");
    assert_eq!(exc.exc_type(), Some(ExcType::TypeError));
    assert!(exc.message().contains("missing required argument"));
}

#[test]
fn surplus_positional_rejected_without_variadic() {
    let exc = eval_err("def f(a):\n    return a\nf(1, 2)");
    assert_eq!(exc.exc_type(), Some(ExcType::TypeError));
}

#[test]
fn variadic_collects_surplus() {
    let script = r"
def collect(first, *rest):
    return len(rest)
collect(1, 2, 3, 4)
";
    assert_eq!(eval(script), Object::Int(3));
}

#[test]
fn variadic_may_be_empty() {
    assert_eq!(eval("def f(*args):\n    return len(args)\nf()"), Object::Int(0));
}

#[test]
fn function_without_return_yields_none() {
    assert_eq!(eval("def f():\n    pass\nf()"), Object::None);
}

#[test]
fn closures_capture_definition_environment() {
    let script = r"
def make_adder(n):
    def add(x):
        return x + n
    return add
add5 = make_adder(5)
add5(37)
";
    assert_eq!(eval(script), Object::Int(42));
}

#[test]
fn nonlocal_mutates_enclosing_binding() {
    let script = r"
def make_counter():
    count = 0
    def bump():
        nonlocal count
        count = count + 1
        return count
    return bump
c = make_counter()
c()
c()
c()
";
    assert_eq!(eval(script), Object::Int(3));
}

#[test]
fn nonlocal_without_target_errors() {
    let exc = eval_err("def f():\n    nonlocal missing\n    missing = 1\nf()");
    assert_eq!(exc.exc_type(), Some(ExcType::NameError));
}

#[test]
fn global_binds_to_root_scope() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
value = 1
def set_value():
    global value
    value = 99
set_value()
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_int("value").unwrap(), 99);
}

#[test]
fn lambdas() {
    assert_eq!(eval("double = lambda x: x * 2\ndouble(21)"), Object::Int(42));
    assert_eq!(eval("add = lambda a, b=10: a + b\nadd(5)"), Object::Int(15));
}

#[test]
fn lambda_closures() {
    let script = r"
factor = 3
scale = lambda x: x * factor
scale(7)
";
    assert_eq!(eval(script), Object::Int(21));
}

#[test]
fn recursion_limit_yields_recursion_error() {
    let exc = eval_err("def forever():\n    return forever()\nforever()");
    assert_eq!(exc.exc_type(), Some(ExcType::RecursionError));
}

#[test]
fn recursion_limit_is_configurable() {
    let mut interp = Interpreter::new();
    interp.set_max_call_depth(16);
    let script = r"
def depth(n):
    return depth(n + 1)
depth(0)
";
    let exc = interp.eval(script).unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::RecursionError));
}

#[test]
fn return_outside_function_errors() {
    let exc = eval_err("return 1");
    assert!(exc.message().contains("outside function"));
}

#[test]
fn docstrings_are_captured() {
    let script = r#"
def documented():
    "does a thing"
    return 1
documented()
"#;
    assert_eq!(eval(script), Object::Int(1));
}

#[test]
fn argument_evaluation_is_left_to_right() {
    let script = r"
order = []
def probe(tag):
    order.append(tag)
    return tag
def f(a, b, c=0):
    return a
f(probe(1), probe(2), c=probe(3))
order
";
    assert_eq!(eval(script), eval("[1, 2, 3]"));
}
