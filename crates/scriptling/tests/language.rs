//! Core language semantics: operators, control flow, comprehensions,
//! slicing, f-strings, and the statement forms.

use pretty_assertions::assert_eq;
use scriptling::{ExcType, Interpreter, Object};

fn eval(source: &str) -> Object {
    Interpreter::new().eval(source).unwrap()
}

fn eval_err(source: &str) -> scriptling::Exception {
    Interpreter::new().eval(source).unwrap_err()
}

// === Arithmetic ===

#[test]
fn integer_arithmetic() {
    assert_eq!(eval("2 + 3 * 4"), Object::Int(14));
    assert_eq!(eval("(2 + 3) * 4"), Object::Int(20));
    assert_eq!(eval("7 - 10"), Object::Int(-3));
}

#[test]
fn true_division_always_floats() {
    assert_eq!(eval("7 / 2"), Object::Float(3.5));
    assert_eq!(eval("8 / 2"), Object::Float(4.0));
}

#[test]
fn modulo_follows_divisor_sign() {
    assert_eq!(eval("7 % 3"), Object::Int(1));
    assert_eq!(eval("-7 % 3"), Object::Int(2));
    assert_eq!(eval("7 % -3"), Object::Int(-2));
}

#[test]
fn power_rules() {
    assert_eq!(eval("2 ** 10"), Object::Int(1024));
    assert_eq!(eval("2 ** -1"), Object::Float(0.5));
    assert_eq!(eval("2 ** 3 ** 2"), Object::Int(512));
    assert_eq!(eval("2.0 ** 2"), Object::Float(4.0));
}

#[test]
fn unary_minus_binds_tighter_than_power() {
    assert_eq!(eval("-2 ** 2"), Object::Int(4));
}

#[test]
fn mixed_numeric_promotion() {
    assert_eq!(eval("1 + 2.5"), Object::Float(3.5));
    assert_eq!(eval("True + 1"), Object::Int(2));
}

#[test]
fn division_by_zero() {
    let exc = eval_err("1 / 0");
    assert_eq!(exc.exc_type(), Some(ExcType::ZeroDivisionError));
    let exc = eval_err("1 % 0");
    assert_eq!(exc.exc_type(), Some(ExcType::ZeroDivisionError));
}

// === Strings and sequences ===

#[test]
fn string_concat_and_repeat() {
    assert_eq!(eval("'ab' + 'cd'"), Object::str("abcd"));
    assert_eq!(eval("'ab' * 3"), Object::str("ababab"));
}

#[test]
fn implicit_string_concatenation() {
    assert_eq!(eval("'ab' 'cd'"), Object::str("abcd"));
    assert_eq!(eval("x = ('line one '\n     'line two')\nx"), Object::str("line one line two"));
}

#[test]
fn list_operations() {
    assert_eq!(eval("[1, 2] + [3]"), eval("[1, 2, 3]"));
    assert_eq!(eval("[0] * 3"), eval("[0, 0, 0]"));
    assert_eq!(eval("len([1, 2, 3])"), Object::Int(3));
}

#[test]
fn negative_indices_wrap() {
    assert_eq!(eval("'hello'[-1]"), Object::str("o"));
    assert_eq!(eval("[1, 2, 3][-2]"), Object::Int(2));
}

#[test]
fn out_of_range_index_errors() {
    let exc = eval_err("[1, 2][5]");
    assert_eq!(exc.exc_type(), Some(ExcType::IndexError));
}

#[test]
fn slices_clamp() {
    assert_eq!(eval("'hello'[1:3]"), Object::str("el"));
    assert_eq!(eval("'hello'[:200]"), Object::str("hello"));
    assert_eq!(eval("'hello'[::-1]"), Object::str("olleh"));
    assert_eq!(eval("[1, 2, 3, 4][1:]"), eval("[2, 3, 4]"));
    assert_eq!(eval("[1, 2, 3, 4][::2]"), eval("[1, 3]"));
}

#[test]
fn membership_operators() {
    assert_eq!(eval("'ell' in 'hello'"), Object::Bool(true));
    assert_eq!(eval("2 in [1, 2, 3]"), Object::Bool(true));
    assert_eq!(eval("5 not in (1, 2)"), Object::Bool(true));
    assert_eq!(eval("'k' in {'k': 1}"), Object::Bool(true));
}

#[test]
fn string_methods() {
    assert_eq!(eval("'Hello'.upper()"), Object::str("HELLO"));
    assert_eq!(eval("'  x  '.strip()"), Object::str("x"));
    assert_eq!(eval("'a,b,c'.split(',')"), eval("['a', 'b', 'c']"));
    assert_eq!(eval("'-'.join(['a', 'b'])"), Object::str("a-b"));
    assert_eq!(eval("'hello'.replace('l', 'L')"), Object::str("heLLo"));
    assert_eq!(eval("'hello'.find('ll')"), Object::Int(2));
    assert_eq!(eval("'hello'.startswith('he')"), Object::Bool(true));
}

#[test]
fn dict_methods() {
    assert_eq!(eval("{'a': 1}.get('a')"), Object::Int(1));
    assert_eq!(eval("{'a': 1}.get('b', 9)"), Object::Int(9));
    assert_eq!(eval("len({'a': 1, 'b': 2}.keys())"), Object::Int(2));
    assert_eq!(eval("{'a': 1, 'b': 2}.items()[1]"), eval("('b', 2)"));
}

#[test]
fn list_methods() {
    assert_eq!(eval("xs = [3, 1, 2]\nxs.sort()\nxs"), eval("[1, 2, 3]"));
    assert_eq!(eval("xs = [1]\nxs.extend([2, 3])\nxs.pop()"), Object::Int(3));
    assert_eq!(eval("[1, 2, 2, 3].count(2)"), Object::Int(2));
}

// === Booleans and comparison ===

#[test]
fn short_circuit_returns_operand() {
    assert_eq!(eval("0 or 'fallback'"), Object::str("fallback"));
    assert_eq!(eval("1 and 2"), Object::Int(2));
    assert_eq!(eval("0 and crash()"), Object::Int(0));
    assert_eq!(eval("1 or crash()"), Object::Int(1));
}

#[test]
fn chained_comparisons() {
    assert_eq!(eval("1 < 2 < 3"), Object::Bool(true));
    assert_eq!(eval("1 < 2 > 3"), Object::Bool(false));
    assert_eq!(eval("1 <= 1 <= 1"), Object::Bool(true));
}

#[test]
fn chained_comparison_evaluates_middle_once() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
calls = 0
def mid():
    global calls
    calls = calls + 1
    return 5
r = 1 < mid() < 10
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_int("calls").unwrap(), 1);
    assert_eq!(interp.get_var_as_bool("r").unwrap(), true);
}

#[test]
fn cross_kind_equality_never_errors() {
    assert_eq!(eval("5 == 'hello'"), Object::Bool(false));
    assert_eq!(eval("5 != 'hello'"), Object::Bool(true));
    assert_eq!(eval("None == 0"), Object::Bool(false));
    assert_eq!(eval("1 == 1.0"), Object::Bool(true));
    assert_eq!(eval("True == 1"), Object::Bool(true));
}

#[test]
fn cross_kind_ordering_errors() {
    let exc = eval_err("5 < 'hello'");
    assert_eq!(exc.exc_type(), Some(ExcType::TypeError));
}

#[test]
fn equality_inequality_duality() {
    for pair in ["1, 1", "1, 2", "1, 'x'", "None, None", "[1], [1]", "1.5, 1.5"] {
        let script = format!("a, b = {pair}\n(a == b) == (not (a != b))");
        assert_eq!(eval(&script), Object::Bool(true), "failed for {pair}");
    }
}

// === Control flow ===

#[test]
fn if_elif_else() {
    let script = r"
def grade(n):
    if n >= 90:
        return 'A'
    elif n >= 80:
        return 'B'
    else:
        return 'C'
grade(85)
";
    assert_eq!(eval(script), Object::str("B"));
}

#[test]
fn while_with_break_continue() {
    let script = r"
total = 0
i = 0
while True:
    i = i + 1
    if i > 10:
        break
    if i % 2 == 0:
        continue
    total = total + i
total
";
    assert_eq!(eval(script), Object::Int(25));
}

#[test]
fn for_over_string_and_dict() {
    assert_eq!(
        eval("out = []\nfor c in 'abc':\n    out.append(c)\nout"),
        eval("['a', 'b', 'c']")
    );
    assert_eq!(
        eval("ks = []\nfor k in {'a': 1, 'b': 2}:\n    ks.append(k)\nks"),
        eval("['a', 'b']")
    );
}

#[test]
fn for_unpacks_tuples() {
    let script = r"
total = 0
for k, v in {'a': 1, 'b': 2}.items():
    total = total + v
total
";
    assert_eq!(eval(script), Object::Int(3));
}

#[test]
fn multiple_assignment_and_swap() {
    let mut interp = Interpreter::new();
    interp.eval("x=1; y=2; x,y = [y,x]").unwrap();
    assert_eq!(interp.get_var_as_int("x").unwrap(), 2);
    assert_eq!(interp.get_var_as_int("y").unwrap(), 1);
}

#[test]
fn multiple_assignment_packs_rhs() {
    let mut interp = Interpreter::new();
    interp.eval("a, b, c = 1, 2, 3").unwrap();
    assert_eq!(interp.get_var_as_int("b").unwrap(), 2);
}

#[test]
fn unpack_arity_mismatch_errors() {
    let exc = eval_err("a, b = [1, 2, 3]");
    assert_eq!(exc.exc_type(), Some(ExcType::ValueError));
}

#[test]
fn augmented_assignment_forms() {
    assert_eq!(eval("x = 10\nx += 5\nx -= 3\nx *= 2\nx"), Object::Int(24));
    assert_eq!(eval("xs = [1, 2]\nxs[0] += 10\nxs[0]"), Object::Int(11));
}

// === Comprehensions ===

#[test]
fn list_comprehension_with_guard() {
    assert_eq!(eval("[x * 2 for x in range(5) if x % 2 == 0]"), eval("[0, 4, 8]"));
}

#[test]
fn dict_comprehension() {
    assert_eq!(eval("{k: v * 10 for k, v in {'a': 1}.items()}"), eval("{'a': 10}"));
}

#[test]
fn generator_in_call_position_is_eager() {
    assert_eq!(eval("sum(x * x for x in range(4))"), Object::Int(14));
}

// === F-strings ===

#[test]
fn fstring_with_format_spec() {
    assert_eq!(eval("f\"{3.14159:.2f}\""), Object::str("3.14"));
}

#[test]
fn fstring_interpolation() {
    let script = "name = 'World'\ncount = 3\nf\"Hello {name}, {count} times\"";
    assert_eq!(eval(script), Object::str("Hello World, 3 times"));
}

#[test]
fn fstring_literal_braces() {
    assert_eq!(eval("f\"{{not an expr}}\""), Object::str("{not an expr}"));
}

#[test]
fn fstring_width_and_fill() {
    assert_eq!(eval("f\"{42:05d}\""), Object::str("00042"));
    assert_eq!(eval("f\"{'hi':>5}\""), Object::str("   hi"));
    assert_eq!(eval("f\"{1234567:,}\""), Object::str("1,234,567"));
}

// === Builtins ===

#[test]
fn conversion_builtins() {
    assert_eq!(eval("int('12')"), Object::Int(12));
    assert_eq!(eval("int(3.7)"), Object::Int(3));
    assert_eq!(eval("float('1.5')"), Object::Float(1.5));
    assert_eq!(eval("str(3.0)"), Object::str("3.0"));
    assert_eq!(eval("bool([])"), Object::Bool(false));
    assert_eq!(eval("bool('x')"), Object::Bool(true));
}

#[test]
fn aggregate_builtins() {
    assert_eq!(eval("min([3, 1, 2])"), Object::Int(1));
    assert_eq!(eval("max(3, 1, 2)"), Object::Int(3));
    assert_eq!(eval("sum([1, 2, 3])"), Object::Int(6));
    assert_eq!(eval("sum([1, 2], 10)"), Object::Int(13));
}

#[test]
fn isinstance_forms() {
    assert_eq!(eval("isinstance(1, int)"), Object::Bool(true));
    assert_eq!(eval("isinstance(True, int)"), Object::Bool(true));
    assert_eq!(eval("isinstance(1.5, 'float')"), Object::Bool(true));
    assert_eq!(eval("isinstance('x', int)"), Object::Bool(false));
    assert_eq!(eval("isinstance(None, None)"), Object::Bool(true));
    assert_eq!(eval("isinstance([], list)"), Object::Bool(true));
}

#[test]
fn type_builtin_reports_names() {
    assert_eq!(eval("type(1)"), Object::str("int"));
    assert_eq!(eval("type('x')"), Object::str("str"));
    assert_eq!(eval("type(None)"), Object::str("NoneType"));
}

// === Parse errors ===

#[test]
fn parse_error_reports_line() {
    let exc = eval_err("x = 1\ny = = 2");
    assert_eq!(exc.exc_type(), Some(ExcType::ParseError));
    assert!(exc.message().contains("line 2"), "message: {}", exc.message());
}

#[test]
fn multiple_parse_errors_collected() {
    let exc = eval_err("x = = 1\ny = ) 2");
    assert!(exc.message().contains("line 1"));
    assert!(exc.message().contains("line 2"));
}

#[test]
fn inconsistent_indentation_is_indent_error() {
    let exc = eval_err("if True:\n    x = 1\n  y = 2");
    assert_eq!(exc.exc_type(), Some(ExcType::IndentError));
}
