//! The embedding surface: registering native functions, host-initiated
//! calls, output capture and redirection, input, kwargs, and the panic
//! recovery boundary.

use scriptling::{ExcType, Interpreter, Kwargs, Object};

// === register_fn: native signatures ===

#[test]
fn register_fn_basic() {
    let mut interp = Interpreter::new();
    interp.register_fn("add", |a: i64, b: i64| a + b);
    assert_eq!(interp.eval("add(40, 2)").unwrap(), Object::Int(42));
}

#[test]
fn register_fn_zero_args() {
    let mut interp = Interpreter::new();
    interp.register_fn("five", || 5i64);
    assert_eq!(interp.eval("five()").unwrap(), Object::Int(5));
}

#[test]
fn register_fn_string_and_list() {
    let mut interp = Interpreter::new();
    interp.register_fn("join_upper", |parts: Vec<String>, sep: String| {
        parts
            .iter()
            .map(|p| p.to_uppercase())
            .collect::<Vec<_>>()
            .join(&sep)
    });
    assert_eq!(
        interp.eval("join_upper(['a', 'b'], '-')").unwrap(),
        Object::str("A-B")
    );
}

#[test]
fn register_fn_result_return() {
    let mut interp = Interpreter::new();
    interp.register_fn("checked_div", |a: i64, b: i64| -> Result<i64, String> {
        if b == 0 {
            Err("denominator is zero".to_owned())
        } else {
            Ok(a / b)
        }
    });
    assert_eq!(interp.eval("checked_div(10, 2)").unwrap(), Object::Int(5));
    let exc = interp.eval("checked_div(1, 0)").unwrap_err();
    assert!(exc.message().contains("denominator is zero"));
}

#[test]
fn register_fn_with_context() {
    use scriptling::Context;

    let mut interp = Interpreter::new();
    interp.register_fn("emit", |ctx: &mut Context, text: String| {
        ctx.stdout_write(&text).and_then(|()| ctx.stdout_push('\n')).is_ok()
    });
    interp.enable_output_capture();
    interp.eval("emit('ping')").unwrap();
    assert_eq!(interp.get_output().unwrap(), "ping\n");
}

#[test]
fn register_fn_with_kwargs() {
    let mut interp = Interpreter::new();
    interp.register_fn("describe", |name: String, kwargs: Kwargs| {
        let width = match kwargs.get("width") {
            Some(Object::Int(n)) => *n,
            _ => 1,
        };
        format!("{name}x{width}")
    });
    assert_eq!(interp.eval("describe('col', width=3)").unwrap(), Object::str("colx3"));
    assert_eq!(interp.eval("describe('col')").unwrap(), Object::str("colx1"));
}

#[test]
fn register_fn_argument_conversion_errors() {
    let mut interp = Interpreter::new();
    interp.register_fn("add", |a: i64, b: i64| a + b);
    let exc = interp.eval("add('x', 2)").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::TypeError));
    let exc = interp.eval("add(1)").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::TypeError));
}

#[test]
fn register_callable_raw_contract() {
    let mut interp = Interpreter::new();
    interp.register_callable(
        "count_args",
        |_ctx, args| Ok(Object::Int(args.len() as i64)),
        Some("count_args(...) - number of positional arguments"),
    );
    assert_eq!(interp.eval("count_args(1, 'x', None)").unwrap(), Object::Int(3));
}

#[test]
fn help_shows_builtin_help_text() {
    let mut interp = Interpreter::new();
    interp.register_callable("noop", |_ctx, _args| Ok(Object::None), Some("noop() - does nothing"));
    interp.enable_output_capture();
    interp.eval("help(noop)").unwrap();
    assert!(interp.get_output().unwrap().contains("does nothing"));
}

// === Host-initiated calls ===

#[test]
fn call_function_by_name() {
    let mut interp = Interpreter::new();
    interp.eval("def triple(n):\n    return n * 3").unwrap();
    let r = interp.call_function("triple", vec![Object::Int(14)]).unwrap();
    assert_eq!(r, Object::Int(42));
}

#[test]
fn call_function_dotted_name() {
    let mut interp = Interpreter::new();
    interp.register_script_library("pkg.sub", "def fn(x):\n    return x + 1");
    interp.import_library("pkg.sub").unwrap();
    let r = interp.call_function("pkg.sub.fn", vec![Object::Int(41)]).unwrap();
    assert_eq!(r, Object::Int(42));
}

#[test]
fn call_function_with_kwargs_wrapper() {
    let mut interp = Interpreter::new();
    interp
        .eval("def fmt(value, prefix='<', suffix='>'):\n    return prefix + str(value) + suffix")
        .unwrap();
    let mut kwargs = Kwargs::new();
    kwargs.insert("suffix", Object::str("]")).unwrap();
    let r = interp
        .call_function_kwargs("fmt", vec![Object::Int(7)], kwargs)
        .unwrap();
    assert_eq!(r, Object::str("<7]"));
}

#[test]
fn call_missing_function_is_name_error() {
    let mut interp = Interpreter::new();
    let exc = interp.call_function("ghost", vec![]).unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::NameError));
}

#[test]
fn call_function_primitive_round_trip() {
    let mut interp = Interpreter::new();
    interp.eval("def echo(x):\n    return x").unwrap();
    for value in [
        Object::None,
        Object::Bool(true),
        Object::Int(-17),
        Object::Float(2.75),
        Object::str("round trip"),
    ] {
        let back = interp.call_function("echo", vec![value.clone()]).unwrap();
        assert_eq!(back, value);
    }
}

// === Output and input ===

#[test]
fn output_capture() {
    let mut interp = Interpreter::new();
    interp.enable_output_capture();
    interp.eval("print('hello', 'world')").unwrap();
    assert_eq!(interp.get_output().unwrap(), "hello world\n");
    // get_output drains the buffer.
    assert_eq!(interp.get_output().unwrap(), "");
}

#[test]
fn print_sep_and_end_kwargs() {
    let mut interp = Interpreter::new();
    interp.enable_output_capture();
    interp.eval("print(1, 2, 3, sep='-', end='!')").unwrap();
    assert_eq!(interp.get_output().unwrap(), "1-2-3!");
}

#[test]
fn custom_output_writer() {
    use std::{cell::RefCell, io, rc::Rc};

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl io::Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let sink = Shared::default();
    let mut interp = Interpreter::new();
    interp.set_output_writer(sink.clone());
    interp.eval("print('routed')").unwrap();
    assert_eq!(String::from_utf8(sink.0.borrow().clone()).unwrap(), "routed\n");
}

#[test]
fn input_reader() {
    let mut interp = Interpreter::new();
    interp.set_input_reader(std::io::Cursor::new("Ada\n".as_bytes()));
    interp.enable_output_capture();
    let r = interp.eval("name = input('who? ')\n'hello ' + name").unwrap();
    assert_eq!(r, Object::str("hello Ada"));
    assert_eq!(interp.get_output().unwrap(), "who? ");
}

// === Panic recovery ===

#[test]
fn panicking_builtin_becomes_fatal_exception() {
    let mut interp = Interpreter::new();
    interp.register_callable("blow_up", |_ctx, _args| panic!("builtin went sideways"), None);
    let exc = interp.eval("blow_up()").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::RuntimeError));
    assert!(exc.message().contains("builtin went sideways"));

    // The interpreter stays usable after the recovery boundary fires.
    assert_eq!(interp.eval("1 + 1").unwrap(), Object::Int(2));
}

// === Script-registered callables ===

#[test]
fn register_script_callable() {
    let mut interp = Interpreter::new();
    interp
        .register_script_callable("shout", "def shout(s):\n    return s.upper() + '!'")
        .unwrap();
    let r = interp.call_function("shout", vec![Object::str("hey")]).unwrap();
    assert_eq!(r, Object::str("HEY!"));
}

#[test]
fn register_script_callable_requires_definition() {
    let mut interp = Interpreter::new();
    let err = interp.register_script_callable("missing", "x = 1");
    assert!(err.is_err());
}
