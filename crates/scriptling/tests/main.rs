use scriptling::{Interpreter, Object};

/// Test we can reuse an interpreter across evaluations.
#[test]
fn repeat_eval() {
    let mut interp = Interpreter::new();

    let r = interp.eval("1 + 2").unwrap();
    assert_eq!(r, Object::Int(3));

    let r = interp.eval("1 + 2").unwrap();
    assert_eq!(r, Object::Int(3));
}

#[test]
fn eval_returns_last_expression_value() {
    let mut interp = Interpreter::new();
    let r = interp.eval("x = 10\nx * 2").unwrap();
    assert_eq!(r, Object::Int(20));
}

#[test]
fn assignments_evaluate_to_none() {
    let mut interp = Interpreter::new();
    let r = interp.eval("x = 10").unwrap();
    assert_eq!(r, Object::None);
}

#[test]
fn state_persists_between_evals() {
    let mut interp = Interpreter::new();
    interp.eval("counter = 0").unwrap();
    interp.eval("counter = counter + 1").unwrap();
    interp.eval("counter = counter + 1").unwrap();
    assert_eq!(interp.get_var_as_int("counter").unwrap(), 2);
}

/// Repeated evaluation of the same pure script produces the same value,
/// whether parsed fresh or served from the shared program cache.
#[test]
fn repeated_eval_is_deterministic() {
    let mut interp = Interpreter::new();
    let script = "total = 0\nfor i in range(10):\n    total = total + i * i\ntotal";
    let first = interp.eval(script).unwrap();
    for _ in 0..5 {
        assert_eq!(interp.eval(script).unwrap(), first);
    }
    assert_eq!(first, Object::Int(285));
}

#[test]
fn separate_interpreters_are_independent() {
    let mut a = Interpreter::new();
    let mut b = Interpreter::new();
    a.eval("x = 'from a'").unwrap();
    b.eval("x = 'from b'").unwrap();
    assert_eq!(a.get_var_as_string("x").unwrap(), "from a");
    assert_eq!(b.get_var_as_string("x").unwrap(), "from b");
}

#[test]
fn distinct_scripts_never_share_cached_results() {
    let mut interp = Interpreter::new();
    // Near-identical sources must not collide in the content-addressed cache.
    assert_eq!(interp.eval("1 + 1").unwrap(), Object::Int(2));
    assert_eq!(interp.eval("1 + 2").unwrap(), Object::Int(3));
    assert_eq!(interp.eval("1 + 1 ").unwrap(), Object::Int(2));
    assert_eq!(interp.eval("1 + 2").unwrap(), Object::Int(3));
}
