//! Built-in methods on strings, lists, tuples, and dicts.
//!
//! Attribute access on these kinds produces a [`Builtin`] closure bound to
//! the receiver, so `xs.append(3)` and `m = xs.append; m(3)` behave the same
//! way.

use std::rc::Rc;

use crate::{
    exception::{ExcType, Exception},
    expressions::ordering_of,
    function::Builtin,
    object::{Dict, Object},
};

/// Looks up a built-in method on a receiver, returning a callable bound to
/// it. `None` when the receiver kind has no such method.
pub(crate) fn builtin_method(receiver: &Object, name: &str) -> Option<Object> {
    match receiver {
        Object::Str(_) => str_method(receiver.clone(), name),
        Object::List(_) => list_method(receiver.clone(), name),
        Object::Tuple(_) => tuple_method(receiver.clone(), name),
        Object::Dict(_) => dict_method(receiver.clone(), name),
        _ => None,
    }
}

fn bound(name: &str, func: impl Fn(&mut crate::context::Context, crate::args::ArgValues) -> Result<Object, Exception> + 'static) -> Option<Object> {
    Some(Object::Builtin(Rc::new(Builtin::new(name, None, func))))
}

fn as_str(obj: &Object) -> Rc<str> {
    match obj {
        Object::Str(s) => Rc::clone(s),
        _ => Rc::from(""),
    }
}

fn expect_str(value: &Object, method: &str) -> Result<Rc<str>, Exception> {
    match value {
        Object::Str(s) => Ok(Rc::clone(s)),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("{method}() expected a string, got {}", other.type_name()),
        )),
    }
}

fn str_method(receiver: Object, name: &str) -> Option<Object> {
    let this = as_str(&receiver);
    match name {
        "upper" => bound("upper", move |_, args| {
            args.check_zero_args("upper")?;
            Ok(Object::str(this.to_uppercase()))
        }),
        "lower" => bound("lower", move |_, args| {
            args.check_zero_args("lower")?;
            Ok(Object::str(this.to_lowercase()))
        }),
        "strip" => bound("strip", move |_, args| {
            strip_impl(&this, args, "strip", true, true)
        }),
        "lstrip" => bound("lstrip", move |_, args| {
            strip_impl(&this, args, "lstrip", true, false)
        }),
        "rstrip" => bound("rstrip", move |_, args| {
            strip_impl(&this, args, "rstrip", false, true)
        }),
        "split" => bound("split", move |_, args| {
            let sep = args.get_zero_one_args("split")?;
            let parts: Vec<Object> = match sep {
                None | Some(Object::None) => this.split_whitespace().map(Object::str).collect(),
                Some(sep) => {
                    let sep = expect_str(&sep, "split")?;
                    if sep.is_empty() {
                        return Err(Exception::new(ExcType::ValueError, "empty separator"));
                    }
                    this.split(sep.as_ref()).map(Object::str).collect()
                }
            };
            Ok(Object::list(parts))
        }),
        "join" => bound("join", move |_, args| {
            let items = args.get_one_arg("join")?;
            let values: Vec<Object> = (&items).try_into()?;
            let mut parts = Vec::with_capacity(values.len());
            for value in &values {
                parts.push(expect_str(value, "join")?.to_string());
            }
            Ok(Object::str(parts.join(&this)))
        }),
        "replace" => bound("replace", move |_, args| {
            let (from, to) = args.get_two_args("replace")?;
            let from = expect_str(&from, "replace")?;
            let to = expect_str(&to, "replace")?;
            Ok(Object::str(this.replace(from.as_ref(), to.as_ref())))
        }),
        "startswith" => bound("startswith", move |_, args| {
            let prefix = args.get_one_arg("startswith")?;
            let prefix = expect_str(&prefix, "startswith")?;
            Ok(Object::Bool(this.starts_with(prefix.as_ref())))
        }),
        "endswith" => bound("endswith", move |_, args| {
            let suffix = args.get_one_arg("endswith")?;
            let suffix = expect_str(&suffix, "endswith")?;
            Ok(Object::Bool(this.ends_with(suffix.as_ref())))
        }),
        "find" => bound("find", move |_, args| {
            let needle = args.get_one_arg("find")?;
            let needle = expect_str(&needle, "find")?;
            match this.find(needle.as_ref()) {
                Some(byte_pos) => Ok(Object::Int(this[..byte_pos].chars().count() as i64)),
                None => Ok(Object::Int(-1)),
            }
        }),
        "count" => bound("count", move |_, args| {
            let needle = args.get_one_arg("count")?;
            let needle = expect_str(&needle, "count")?;
            if needle.is_empty() {
                return Ok(Object::Int(this.chars().count() as i64 + 1));
            }
            Ok(Object::Int(this.matches(needle.as_ref()).count() as i64))
        }),
        _ => None,
    }
}

fn strip_impl(
    this: &Rc<str>,
    args: crate::args::ArgValues,
    name: &str,
    left: bool,
    right: bool,
) -> Result<Object, Exception> {
    let chars_arg = args.get_zero_one_args(name)?;
    let set: Vec<char> = match chars_arg {
        None | Some(Object::None) => vec![],
        Some(value) => expect_str(&value, name)?.chars().collect(),
    };
    let matches = |c: char| {
        if set.is_empty() {
            c.is_whitespace()
        } else {
            set.contains(&c)
        }
    };
    let mut result: &str = this;
    if left {
        result = result.trim_start_matches(&matches);
    }
    if right {
        result = result.trim_end_matches(&matches);
    }
    Ok(Object::str(result))
}

fn as_list(obj: &Object) -> Option<Rc<std::cell::RefCell<Vec<Object>>>> {
    match obj {
        Object::List(items) => Some(Rc::clone(items)),
        _ => None,
    }
}

fn list_method(receiver: Object, name: &str) -> Option<Object> {
    let this = as_list(&receiver)?;
    match name {
        "append" => bound("append", move |_, args| {
            let value = args.get_one_arg("append")?;
            this.borrow_mut().push(value);
            Ok(Object::None)
        }),
        "extend" => bound("extend", move |_, args| {
            let other = args.get_one_arg("extend")?;
            let values: Vec<Object> = (&other).try_into()?;
            this.borrow_mut().extend(values);
            Ok(Object::None)
        }),
        "insert" => bound("insert", move |_, args| {
            let (index, value) = args.get_two_args("insert")?;
            let index = i64::try_from(&index)?;
            let mut items = this.borrow_mut();
            let len = items.len() as i64;
            let pos = if index < 0 { (index + len).max(0) } else { index.min(len) } as usize;
            items.insert(pos, value);
            Ok(Object::None)
        }),
        "remove" => bound("remove", move |_, args| {
            let value = args.get_one_arg("remove")?;
            let mut items = this.borrow_mut();
            match items.iter().position(|v| v.py_eq(&value)) {
                Some(pos) => {
                    items.remove(pos);
                    Ok(Object::None)
                }
                None => Err(Exception::new(ExcType::ValueError, "list.remove(x): x not in list")),
            }
        }),
        "pop" => bound("pop", move |_, args| {
            let index = args.get_zero_one_args("pop")?;
            let mut items = this.borrow_mut();
            if items.is_empty() {
                return Err(Exception::new(ExcType::IndexError, "pop from empty list"));
            }
            let len = items.len() as i64;
            let index = match index {
                Some(value) => i64::try_from(&value)?,
                None => -1,
            };
            let pos = if index < 0 { index + len } else { index };
            if pos < 0 || pos >= len {
                return Err(Exception::new(ExcType::IndexError, "pop index out of range"));
            }
            Ok(items.remove(pos as usize))
        }),
        "clear" => bound("clear", move |_, args| {
            args.check_zero_args("clear")?;
            this.borrow_mut().clear();
            Ok(Object::None)
        }),
        "index" => bound("index", move |_, args| {
            let value = args.get_one_arg("index")?;
            let items = this.borrow();
            items
                .iter()
                .position(|v| v.py_eq(&value))
                .map(|pos| Object::Int(pos as i64))
                .ok_or_else(|| Exception::new(ExcType::ValueError, format!("{} is not in list", value.repr())))
        }),
        "count" => bound("count", move |_, args| {
            let value = args.get_one_arg("count")?;
            let count = this.borrow().iter().filter(|v| v.py_eq(&value)).count();
            Ok(Object::Int(count as i64))
        }),
        "reverse" => bound("reverse", move |_, args| {
            args.check_zero_args("reverse")?;
            this.borrow_mut().reverse();
            Ok(Object::None)
        }),
        "sort" => bound("sort", move |_, args| {
            args.check_zero_args("sort")?;
            let mut items = this.borrow_mut();
            let mut err: Option<Exception> = None;
            items.sort_by(|a, b| match ordering_of(a, b, 0) {
                Ok(Some(ordering)) => ordering,
                Ok(None) => std::cmp::Ordering::Equal,
                Err(e) => {
                    err.get_or_insert(e);
                    std::cmp::Ordering::Equal
                }
            });
            match err {
                Some(e) => Err(e),
                None => Ok(Object::None),
            }
        }),
        "copy" => bound("copy", move |_, args| {
            args.check_zero_args("copy")?;
            Ok(Object::list(this.borrow().clone()))
        }),
        _ => None,
    }
}

fn tuple_method(receiver: Object, name: &str) -> Option<Object> {
    let Object::Tuple(this) = receiver else {
        return None;
    };
    match name {
        "count" => {
            let this = Rc::clone(&this);
            bound("count", move |_, args| {
                let value = args.get_one_arg("count")?;
                Ok(Object::Int(this.iter().filter(|v| v.py_eq(&value)).count() as i64))
            })
        }
        "index" => bound("index", move |_, args| {
            let value = args.get_one_arg("index")?;
            this.iter()
                .position(|v| v.py_eq(&value))
                .map(|pos| Object::Int(pos as i64))
                .ok_or_else(|| Exception::new(ExcType::ValueError, format!("{} is not in tuple", value.repr())))
        }),
        _ => None,
    }
}

fn as_dict(obj: &Object) -> Option<Rc<std::cell::RefCell<Dict>>> {
    match obj {
        Object::Dict(dict) => Some(Rc::clone(dict)),
        _ => None,
    }
}

fn dict_method(receiver: Object, name: &str) -> Option<Object> {
    let this = as_dict(&receiver)?;
    match name {
        "get" => bound("get", move |_, args| {
            let (key, default) = args.get_one_two_args("get")?;
            let canonical = Dict::canonical_key(&key);
            Ok(this
                .borrow()
                .get_by_string(&canonical)
                .unwrap_or(default.unwrap_or(Object::None)))
        }),
        "keys" => bound("keys", move |_, args| {
            args.check_zero_args("keys")?;
            Ok(Object::list(this.borrow().keys()))
        }),
        "values" => bound("values", move |_, args| {
            args.check_zero_args("values")?;
            Ok(Object::list(this.borrow().values()))
        }),
        "items" => bound("items", move |_, args| {
            args.check_zero_args("items")?;
            let items: Vec<Object> = this
                .borrow()
                .iter()
                .map(|(key, value)| Object::tuple(vec![key.clone(), value.clone()]))
                .collect();
            Ok(Object::list(items))
        }),
        "pop" => bound("pop", move |_, args| {
            let (key, default) = args.get_one_two_args("pop")?;
            let canonical = Dict::canonical_key(&key);
            match this.borrow_mut().remove_by_string(&canonical) {
                Some(value) => Ok(value),
                None => default.ok_or_else(|| Exception::new(ExcType::KeyError, key.repr())),
            }
        }),
        "clear" => bound("clear", move |_, args| {
            args.check_zero_args("clear")?;
            this.borrow_mut().clear();
            Ok(Object::None)
        }),
        "update" => bound("update", move |_, args| {
            let other = args.get_one_arg("update")?;
            let Object::Dict(other) = other else {
                return Err(Exception::new(
                    ExcType::TypeError,
                    format!("update() expected a dict, got {}", other.type_name()),
                ));
            };
            let entries: Vec<(Object, Object)> = other
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let mut this = this.borrow_mut();
            for (key, value) in entries {
                this.insert(key, value);
            }
            Ok(Object::None)
        }),
        "setdefault" => bound("setdefault", move |_, args| {
            let (key, default) = args.get_one_two_args("setdefault")?;
            let canonical = Dict::canonical_key(&key);
            let mut this = this.borrow_mut();
            if let Some(existing) = this.get_by_string(&canonical) {
                return Ok(existing);
            }
            let value = default.unwrap_or(Object::None);
            this.insert(key, value.clone());
            Ok(value)
        }),
        _ => None,
    }
}
