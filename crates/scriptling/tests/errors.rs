//! Exception semantics: try/except/finally, raise, assert, SystemExit,
//! cancellation, and error classification.

use std::time::Duration;

use scriptling::{CancelToken, ExcType, Interpreter, Object};

fn eval_err(source: &str) -> scriptling::Exception {
    Interpreter::new().eval(source).unwrap_err()
}

#[test]
fn try_except_finally() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
result = 0
cleanup = 0
try:
    x = 10/0
except:
    result = 1
finally:
    cleanup = 1
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_int("result").unwrap(), 1);
    assert_eq!(interp.get_var_as_int("cleanup").unwrap(), 1);
}

#[test]
fn except_matches_by_kind() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
kind = 'none'
try:
    xs = []
    xs[5]
except ValueError:
    kind = 'value'
except IndexError:
    kind = 'index'
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_string("kind").unwrap(), "index");
}

#[test]
fn except_exception_catches_runtime_errors() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
caught = False
try:
    undefined_name
except Exception:
    caught = True
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_bool("caught").unwrap(), true);
}

#[test]
fn except_as_binds_exception_object() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
try:
    raise ValueError('bad input')
except ValueError as e:
    message = e.message
    kind = e.kind
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_string("message").unwrap(), "bad input");
    assert_eq!(interp.get_var_as_string("kind").unwrap(), "ValueError");
}

#[test]
fn unmatched_kind_propagates() {
    let exc = eval_err(
        r"
try:
    raise ValueError('nope')
except IndexError:
    pass
",
    );
    assert_eq!(exc.exc_type(), Some(ExcType::ValueError));
}

#[test]
fn finally_runs_on_return() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
trace = []
def f():
    try:
        return 'early'
    finally:
        trace.append('cleanup')
r = f()
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_string("r").unwrap(), "early");
    assert_eq!(interp.get_var_as_list("trace").unwrap(), vec![Object::str("cleanup")]);
}

#[test]
fn finally_runs_on_break_and_continue() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
count = 0
for i in range(5):
    try:
        if i == 2:
            break
        continue
    finally:
        count = count + 1
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_int("count").unwrap(), 3);
}

#[test]
fn finally_runs_exactly_once_per_exit() {
    let mut interp = Interpreter::new();
    for script in [
        "runs = 0\ntry:\n    x = 1\nfinally:\n    runs = runs + 1",
        "runs = 0\ntry:\n    [][5]\nexcept:\n    pass\nfinally:\n    runs = runs + 1",
    ] {
        interp.eval(script).unwrap();
        assert_eq!(interp.get_var_as_int("runs").unwrap(), 1, "script: {script}");
    }
}

#[test]
fn bare_raise_reraises() {
    let exc = eval_err(
        r"
try:
    raise ValueError('original')
except ValueError:
    raise
",
    );
    assert_eq!(exc.exc_type(), Some(ExcType::ValueError));
    assert_eq!(exc.message(), "original");
}

#[test]
fn bare_raise_without_active_exception() {
    let exc = eval_err("raise");
    assert_eq!(exc.exc_type(), Some(ExcType::RuntimeError));
}

#[test]
fn assert_is_catchable() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
caught = False
try:
    assert 1 == 2, 'numbers drifted'
except AssertionError as e:
    caught = True
    message = e.message
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_bool("caught").unwrap(), true);
    assert_eq!(interp.get_var_as_string("message").unwrap(), "numbers drifted");
}

#[test]
fn assert_carries_line_number() {
    let exc = eval_err("x = 1\nassert x == 2");
    assert_eq!(exc.exc_type(), Some(ExcType::AssertionError));
    assert_eq!(exc.line(), Some(2));
}

#[test]
fn custom_exception_kinds_match_by_name() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
caught = 'no'
try:
    raise QuotaExceeded('too many requests')
except QuotaExceeded:
    caught = 'yes'
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_string("caught").unwrap(), "yes");
}

#[test]
fn host_raised_custom_kind_is_catchable() {
    let mut interp = Interpreter::new();
    interp.register_callable(
        "explode",
        |_ctx, _args| Err(scriptling::Exception::custom("BoomError", "kaboom")),
        None,
    );
    interp
        .eval(
            r"
caught = False
try:
    explode()
except BoomError:
    caught = True
",
        )
        .unwrap();
    assert_eq!(interp.get_var_as_bool("caught").unwrap(), true);
}

// === SystemExit ===

#[test]
fn system_exit_zero_is_success() {
    let mut interp = Interpreter::new();
    let r = interp.eval("x = 1\nraise SystemExit(0)").unwrap();
    assert_eq!(r, Object::None);
    let exit = interp.last_system_exit().unwrap();
    assert_eq!(exit.exit_code(), Some(0));
}

#[test]
fn system_exit_nonzero_is_error() {
    let mut interp = Interpreter::new();
    let exc = interp.eval("raise SystemExit(3)").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::SystemExit));
    assert_eq!(exc.exit_code(), Some(3));
}

#[test]
fn except_exception_does_not_catch_system_exit() {
    let mut interp = Interpreter::new();
    let exc = interp
        .eval(
            r"
try:
    raise SystemExit(2)
except Exception:
    pass
",
        )
        .unwrap_err();
    assert_eq!(exc.exit_code(), Some(2));
}

// === Cancellation ===

#[test]
fn pre_cancelled_token_stops_immediately() {
    let mut interp = Interpreter::new();
    let token = CancelToken::new();
    token.cancel();
    let exc = interp.eval_with_context(token, "x = 1").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::SystemExit));
}

#[test]
fn timeout_interrupts_infinite_loop() {
    let mut interp = Interpreter::new();
    let exc = interp
        .eval_with_timeout(Duration::from_millis(50), "while True:\n    pass")
        .unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::SystemExit));
}

// === Error location reporting ===

#[test]
fn runtime_error_carries_line_and_source_file() {
    let mut interp = Interpreter::new();
    interp.set_source_file("job.py");
    let exc = interp.eval("x = 1\ny = x + missing").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::NameError));
    assert_eq!(exc.line(), Some(2));
    assert_eq!(exc.source_file(), Some("job.py"));
    let rendered = exc.to_string();
    assert!(rendered.contains("job.py"), "rendered: {rendered}");
    assert!(rendered.contains("2"), "rendered: {rendered}");
}

#[test]
fn interpreter_remains_usable_after_errors() {
    let mut interp = Interpreter::new();
    assert!(interp.eval("1 / 0").is_err());
    assert_eq!(interp.eval("2 + 2").unwrap(), Object::Int(4));
}
