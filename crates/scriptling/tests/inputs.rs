//! Tests for passing host values into the interpreter and reading them back.
//!
//! These cover the host→script→host round trip for every primitive kind and
//! the compound conversions.

use std::collections::HashMap;

use scriptling::{Dict, Interpreter, Object};

// === Primitive round trips ===

#[test]
fn input_int() {
    let mut interp = Interpreter::new();
    interp.set_var("x", 42i64);
    assert_eq!(interp.eval("x").unwrap(), Object::Int(42));
    assert_eq!(interp.get_var_as_int("x").unwrap(), 42);
}

#[test]
fn input_int_arithmetic() {
    let mut interp = Interpreter::new();
    interp.set_var("x", 41i64);
    assert_eq!(interp.eval("x + 1").unwrap(), Object::Int(42));
}

#[test]
fn input_bool() {
    let mut interp = Interpreter::new();
    interp.set_var("t", true);
    interp.set_var("f", false);
    assert_eq!(interp.get_var_as_bool("t").unwrap(), true);
    assert_eq!(interp.get_var_as_bool("f").unwrap(), false);
}

#[test]
fn input_float() {
    let mut interp = Interpreter::new();
    interp.set_var("x", 2.5f64);
    assert_eq!(interp.eval("x").unwrap(), Object::Float(2.5));
    assert_eq!(interp.get_var_as_float("x").unwrap(), 2.5);
}

#[test]
fn input_string() {
    let mut interp = Interpreter::new();
    interp.set_var("x", "hello");
    assert_eq!(interp.eval("x + ' world'").unwrap(), Object::str("hello world"));
    assert_eq!(interp.get_var_as_string("x").unwrap(), "hello");
}

#[test]
fn input_none() {
    let mut interp = Interpreter::new();
    interp.set_object_var("x", Object::None);
    assert_eq!(interp.eval("x").unwrap(), Object::None);
}

// === Compound values ===

#[test]
fn input_list() {
    let mut interp = Interpreter::new();
    interp.set_var("xs", vec![1i64, 2, 3]);
    assert_eq!(interp.eval("len(xs)").unwrap(), Object::Int(3));
    let list = interp.get_var_as_list("xs").unwrap();
    assert_eq!(list, vec![Object::Int(1), Object::Int(2), Object::Int(3)]);
}

#[test]
fn input_list_mutation_is_visible_to_host() {
    let mut interp = Interpreter::new();
    interp.set_var("xs", vec![1i64, 2]);
    interp.eval("xs.append(3)").unwrap();
    let list = interp.get_var_as_list("xs").unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[2], Object::Int(3));
}

#[test]
fn input_map_becomes_dict() {
    let mut interp = Interpreter::new();
    let mut map = HashMap::new();
    map.insert("a".to_owned(), 1i64);
    map.insert("b".to_owned(), 2i64);
    interp.set_var("m", map);
    assert_eq!(interp.eval("m['a'] + m['b']").unwrap(), Object::Int(3));

    let dict: Dict = interp.get_var_as_dict("m").unwrap();
    assert_eq!(dict.len(), 2);
    assert_eq!(dict.get_by_string("a"), Some(Object::Int(1)));
}

#[test]
fn input_nested_structures() {
    let mut interp = Interpreter::new();
    interp.set_object_var(
        "data",
        Object::list(vec![
            Object::list(vec![Object::Int(1), Object::Int(2)]),
            Object::list(vec![Object::Int(3)]),
        ]),
    );
    assert_eq!(interp.eval("data[0][1] + data[1][0]").unwrap(), Object::Int(5));
}

// === serde fallback path ===

#[test]
fn serialize_fallback_round_trip() {
    #[derive(serde::Serialize)]
    struct Point {
        x: i64,
        y: i64,
        label: String,
    }

    let mut interp = Interpreter::new();
    interp
        .set_var_serialize(
            "p",
            &Point {
                x: 3,
                y: 4,
                label: "origin-ish".to_owned(),
            },
        )
        .unwrap();
    assert_eq!(interp.eval("p['x'] + p['y']").unwrap(), Object::Int(7));
    assert_eq!(interp.eval("p['label']").unwrap(), Object::str("origin-ish"));
}

#[test]
fn object_to_json() {
    let mut interp = Interpreter::new();
    let value = interp.eval("{'a': [1, 2.5, None, True]}").unwrap();
    let json = value.to_json().unwrap();
    assert_eq!(json, serde_json::json!({"a": [1, 2.5, null, true]}));
}

// === Typed accessor errors ===

#[test]
fn typed_accessor_kind_mismatch() {
    let mut interp = Interpreter::new();
    interp.set_var("s", "text");
    assert!(interp.get_var_as_int("s").is_err());
    assert!(interp.get_var_as_int("missing").is_err());
}

#[test]
fn numeric_kinds_preserved() {
    let mut interp = Interpreter::new();
    interp.eval("i = 7\nf = 7.0").unwrap();
    assert_eq!(interp.get_var("i"), Some(Object::Int(7)));
    assert_eq!(interp.get_var("f"), Some(Object::Float(7.0)));
    // Strict host equality distinguishes the kinds even though script
    // equality treats them as one numeric family.
    assert_ne!(interp.get_var("i"), interp.get_var("f"));
}
