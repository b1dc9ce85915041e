//! Library registration, the import resolver, placeholder mounting, the
//! on-demand loader, and per-interpreter library instance data.

use scriptling::{ExcType, Interpreter, LibraryBuilder, Object, OnDemandLibrary};

#[test]
fn native_library_import_and_call() {
    let lib = LibraryBuilder::new("mathx")
        .description("extra math helpers")
        .function("double", |n: i64| n * 2)
        .constant("answer", 42i64)
        .build();
    let mut interp = Interpreter::new();
    interp.register_library(lib);
    let r = interp.eval("import mathx\nmathx.double(mathx.answer)").unwrap();
    assert_eq!(r, Object::Int(84));
}

#[test]
fn import_is_lazy_until_requested() {
    let mut interp = Interpreter::new();
    interp.register_script_library("util", "def ident(x):\n    return x");
    // Not imported yet: the name must not exist.
    assert!(interp.eval("util.ident(1)").is_err());
    assert_eq!(interp.eval("import util\nutil.ident(7)").unwrap(), Object::Int(7));
}

#[test]
fn script_library_docstring_becomes_doc() {
    let mut interp = Interpreter::new();
    interp.register_script_library("greet", "'greeting helpers'\ndef hi():\n    return 'hi'");
    interp.import_library("greet").unwrap();
    let r = interp.eval("greet.__doc__").unwrap();
    assert_eq!(r, Object::str("greeting helpers"));
}

#[test]
fn script_library_loads_once() {
    let mut interp = Interpreter::new();
    interp.register_script_library("stateful", "items = []\ndef add(x):\n    items.append(x)\n    return len(items)");
    interp.import_library("stateful").unwrap();
    assert_eq!(interp.eval("stateful.add(1)").unwrap(), Object::Int(1));
    // Re-import must not reset library state.
    interp.import_library("stateful").unwrap();
    assert_eq!(interp.eval("stateful.add(2)").unwrap(), Object::Int(2));
}

#[test]
fn import_with_alias_binds_alias() {
    let mut interp = Interpreter::new();
    interp.register_script_library("tools.text", "def shout(s):\n    return s.upper()");
    let r = interp.eval("import tools.text as txt\ntxt.shout('hey')").unwrap();
    assert_eq!(r, Object::str("HEY"));
}

/// Nested libraries with child imported before parent: the intermediate
/// placeholder must be filled without losing the child entry.
#[test]
fn nested_import_child_before_parent() {
    let mut interp = Interpreter::new();
    interp.register_script_library("a.b", "def greet():\n    return 'hello from a.b'");
    interp.register_script_library("a.b.c", "def farewell():\n    return 'goodbye from a.b.c'");
    let r = interp
        .eval(
            r"
import a.b.c as child
import a.b as parent
[child.farewell(), parent.greet(), a.b.greet(), a.b.c.farewell()]
",
        )
        .unwrap();
    assert_eq!(
        r,
        Object::list(vec![
            Object::str("goodbye from a.b.c"),
            Object::str("hello from a.b"),
            Object::str("hello from a.b"),
            Object::str("goodbye from a.b.c"),
        ])
    );
}

#[test]
fn parent_loads_lazily_before_child() {
    let mut interp = Interpreter::new();
    interp.register_script_library("outer", "marker = 'outer loaded'");
    interp.register_script_library("outer.inner", "marker = 'inner loaded'");
    let r = interp.eval("import outer.inner\n[outer.marker, outer.inner.marker]").unwrap();
    assert_eq!(r, Object::list(vec![Object::str("outer loaded"), Object::str("inner loaded")]));
}

#[test]
fn sub_libraries_resolve_through_parent() {
    let strings = LibraryBuilder::new("strings")
        .function("upper", |s: String| s.to_uppercase())
        .build();
    let lib = LibraryBuilder::new("toolkit")
        .description("grab bag")
        .sub_library(strings)
        .build();
    let mut interp = Interpreter::new();
    interp.register_library(lib);
    let r = interp.eval("import toolkit.strings\ntoolkit.strings.upper('ok')").unwrap();
    assert_eq!(r, Object::str("OK"));
}

#[test]
fn missing_import_is_import_error() {
    let mut interp = Interpreter::new();
    let exc = interp.eval("import no.such.library").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::ImportError));
    assert!(exc.message().contains("no.such.library"));
}

#[test]
fn import_path_depth_is_limited() {
    let mut interp = Interpreter::new();
    let exc = interp.eval("import a.b.c.d.e.f.g.h.i.j.k").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::ImportError));
}

#[test]
fn on_demand_callback_loads_missing_libraries() {
    let mut interp = Interpreter::new();
    interp.set_on_demand_library_callback(|name| {
        if name == "lazy.strings" {
            Some(OnDemandLibrary::Script("def shout(s):\n    return s.upper()".to_owned()))
        } else {
            None
        }
    });
    let r = interp.eval("import lazy.strings\nlazy.strings.shout('quiet')").unwrap();
    assert_eq!(r, Object::str("QUIET"));

    let exc = interp.eval("import lazy.other").unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::ImportError));
}

#[test]
fn on_demand_callback_can_supply_native_library() {
    let mut interp = Interpreter::new();
    interp.set_on_demand_library_callback(|name| {
        if name == "dyn" {
            Some(OnDemandLibrary::Native(
                LibraryBuilder::new("dyn").function("three", || 3i64).build(),
            ))
        } else {
            None
        }
    });
    assert_eq!(interp.eval("import dyn\ndyn.three()").unwrap(), Object::Int(3));
}

#[test]
fn library_instance_data_is_per_interpreter() {
    fn build_lib() -> scriptling::Library {
        LibraryBuilder::new("cfg")
            .raw_function("prefix", None, |ctx, _args| {
                Ok(ctx.instance_data().cloned().unwrap_or(Object::None))
            })
            .build()
    }

    let mut first = Interpreter::new();
    first.register_library_instance(build_lib(), "alpha");
    let mut second = Interpreter::new();
    second.register_library_instance(build_lib(), "beta");

    assert_eq!(first.eval("import cfg\ncfg.prefix()").unwrap(), Object::str("alpha"));
    assert_eq!(second.eval("import cfg\ncfg.prefix()").unwrap(), Object::str("beta"));
    // Interleaved calls keep their own data.
    assert_eq!(first.eval("cfg.prefix()").unwrap(), Object::str("alpha"));
}

#[test]
fn instance_data_is_cleared_outside_library_calls() {
    let lib = LibraryBuilder::new("probe")
        .raw_function("data", None, |ctx, _args| {
            Ok(ctx.instance_data().cloned().unwrap_or(Object::None))
        })
        .build();
    let mut interp = Interpreter::new();
    interp.register_library_instance(lib, 7i64);
    interp.register_callable(
        "outside",
        |ctx, _args| Ok(ctx.instance_data().cloned().unwrap_or(Object::None)),
        None,
    );
    let r = interp.eval("import probe\n[probe.data(), outside()]").unwrap();
    assert_eq!(r, Object::list(vec![Object::Int(7), Object::None]));
}

#[test]
fn script_library_sees_builtins_but_not_globals_leak() {
    let mut interp = Interpreter::new();
    interp.register_script_library("calc", "def twice(x):\n    return x * 2\nhidden = 99");
    interp.import_library("calc").unwrap();
    assert_eq!(interp.eval("calc.twice(21)").unwrap(), Object::Int(42));
    // Library top-level bindings do not become interpreter globals.
    assert!(interp.eval("hidden").is_err());
    // But they are visible as library members.
    assert_eq!(interp.eval("calc.hidden").unwrap(), Object::Int(99));
}

#[test]
fn help_lists_registered_libraries() {
    let mut interp = Interpreter::new();
    interp.register_script_library("zeta", "x = 1");
    interp.register_library(LibraryBuilder::new("alpha").description("first").build());
    interp.enable_output_capture();
    interp.eval("help()").unwrap();
    let output = interp.get_output().unwrap();
    assert!(output.contains("alpha"));
    assert!(output.contains("zeta"));
}
