//! Core builtins installed into every fresh interpreter.
//!
//! Deliberately small: conversions, sequence helpers, `print`/`input`
//! through the interpreter's I/O sinks, and `help`. No filesystem, network,
//! or other ambient capability lives here; hosts grant those by registering
//! libraries explicitly.

mod isinstance;
mod len;
mod min_max;
mod print;
mod range;

use std::rc::Rc;

use crate::{
    args::ArgValues,
    context::Context,
    exception::{ExcType, Exception},
    function::Builtin,
    namespace::{Namespace, ScopeRef},
    object::{Dict, Object},
};

fn install(scope: &ScopeRef, name: &str, help: &str, func: impl Fn(&mut Context, ArgValues) -> Result<Object, Exception> + 'static) {
    let builtin = Builtin::new(name, Some(help), func);
    Namespace::set_local(scope, name, Object::Builtin(Rc::new(builtin)));
}

/// Installs the core builtins into the root scope.
pub(crate) fn install_builtins(scope: &ScopeRef) {
    install(scope, "print", "print(values..., sep=' ', end='\\n') - write values to output", print::builtin_print);
    install(scope, "input", "input(prompt='') - read one line from the input reader", builtin_input);
    install(scope, "len", "len(obj) - number of items in a sequence, dict, or string", len::builtin_len);
    install(scope, "type", "type(obj) - name of the object's type", builtin_type);
    install(scope, "str", "str(obj) - string form of a value", builtin_str);
    install(scope, "repr", "repr(obj) - printable representation of a value", builtin_repr);
    install(scope, "int", "int(x) - convert a number or numeric string to an integer", builtin_int);
    install(scope, "float", "float(x) - convert a number or numeric string to a float", builtin_float);
    install(scope, "bool", "bool(x) - truthiness of a value", builtin_bool);
    install(scope, "list", "list(iterable) - new list from an iterable", builtin_list);
    install(scope, "tuple", "tuple(iterable) - new tuple from an iterable", builtin_tuple);
    install(scope, "dict", "dict(mapping) - new dict, optionally copying a mapping", builtin_dict);
    install(scope, "range", "range(start, stop, step) - list of integers", range::builtin_range);
    install(scope, "abs", "abs(x) - absolute value of a number", builtin_abs);
    install(scope, "min", "min(iterable | values...) - smallest value", min_max::builtin_min);
    install(scope, "max", "max(iterable | values...) - largest value", min_max::builtin_max);
    install(scope, "sum", "sum(iterable, start=0) - sum of values", builtin_sum);
    install(scope, "isinstance", "isinstance(obj, type) - type check, subclass-aware for classes", isinstance::builtin_isinstance_entry);
    install(scope, "help", "help(obj) - show help for a value, or list registered libraries", builtin_help);
}

fn builtin_input(ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let prompt = args.get_zero_one_args("input")?;
    if let Some(prompt) = prompt {
        ctx.stdout_write(&prompt.to_string())?;
    }
    ctx.read_line().map(Object::str)
}

fn builtin_type(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let value = args.get_one_arg("type")?;
    match &value {
        Object::Instance(instance) => {
            let name = instance.borrow().class().name().to_owned();
            Ok(Object::str(name))
        }
        other => Ok(Object::str(other.type_name())),
    }
}

fn builtin_str(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    match args.get_zero_one_args("str")? {
        Some(value) => Ok(Object::str(value.to_string())),
        None => Ok(Object::str("")),
    }
}

fn builtin_repr(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let value = args.get_one_arg("repr")?;
    Ok(Object::str(value.repr()))
}

fn builtin_int(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let Some(value) = args.get_zero_one_args("int")? else {
        return Ok(Object::Int(0));
    };
    match &value {
        Object::Int(n) => Ok(Object::Int(*n)),
        Object::Bool(b) => Ok(Object::Int(i64::from(*b))),
        Object::Float(f) => Ok(Object::Int(*f as i64)),
        Object::Str(s) => s.trim().parse::<i64>().map(Object::Int).map_err(|_| {
            Exception::new(
                ExcType::ValueError,
                format!("invalid literal for int(): {}", value.repr()),
            )
        }),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("int() argument must be a number or string, not '{}'", other.type_name()),
        )),
    }
}

fn builtin_float(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let Some(value) = args.get_zero_one_args("float")? else {
        return Ok(Object::Float(0.0));
    };
    match &value {
        Object::Float(f) => Ok(Object::Float(*f)),
        Object::Int(n) => Ok(Object::Float(*n as f64)),
        Object::Bool(b) => Ok(Object::Float(if *b { 1.0 } else { 0.0 })),
        Object::Str(s) => s.trim().parse::<f64>().map(Object::Float).map_err(|_| {
            Exception::new(
                ExcType::ValueError,
                format!("could not convert string to float: {}", value.repr()),
            )
        }),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("float() argument must be a number or string, not '{}'", other.type_name()),
        )),
    }
}

fn builtin_bool(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    match args.get_zero_one_args("bool")? {
        Some(value) => Ok(Object::Bool(value.is_truthy())),
        None => Ok(Object::Bool(false)),
    }
}

/// Snapshot of an iterable's elements for `list()`/`tuple()`.
fn iterable_items(value: &Object, name: &str) -> Result<Vec<Object>, Exception> {
    match value {
        Object::List(items) => Ok(items.borrow().clone()),
        Object::Tuple(items) => Ok(items.as_ref().clone()),
        Object::Str(s) => Ok(s.chars().map(|c| Object::str(c.to_string())).collect()),
        Object::Dict(dict) => Ok(dict.borrow().keys()),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("{name}() argument must be iterable, not '{}'", other.type_name()),
        )),
    }
}

fn builtin_list(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    match args.get_zero_one_args("list")? {
        Some(value) => Ok(Object::list(iterable_items(&value, "list")?)),
        None => Ok(Object::list(vec![])),
    }
}

fn builtin_tuple(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    match args.get_zero_one_args("tuple")? {
        Some(value) => Ok(Object::tuple(iterable_items(&value, "tuple")?)),
        None => Ok(Object::tuple(vec![])),
    }
}

fn builtin_dict(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    match args.get_zero_one_args("dict")? {
        None => Ok(Object::dict(Dict::new())),
        Some(Object::Dict(source)) => {
            let mut dict = Dict::new();
            for (key, value) in source.borrow().iter() {
                dict.insert(key.clone(), value.clone());
            }
            Ok(Object::dict(dict))
        }
        Some(other) => Err(Exception::new(
            ExcType::TypeError,
            format!("dict() argument must be a dict, not '{}'", other.type_name()),
        )),
    }
}

fn builtin_abs(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let value = args.get_one_arg("abs")?;
    match &value {
        Object::Int(n) => n.checked_abs().map(Object::Int).ok_or_else(|| {
            Exception::new(ExcType::OverflowError, "abs() result overflows")
        }),
        Object::Float(f) => Ok(Object::Float(f.abs())),
        Object::Bool(b) => Ok(Object::Int(i64::from(*b))),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("bad operand type for abs(): '{}'", other.type_name()),
        )),
    }
}

fn builtin_sum(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let (iterable, start) = args.get_one_two_args("sum")?;
    let items = iterable_items(&iterable, "sum")?;
    let mut acc = start.unwrap_or(Object::Int(0));
    for item in items {
        acc = crate::expressions::binary_op(crate::ast::BinOp::Add, &acc, &item, 0)?;
    }
    Ok(acc)
}

fn builtin_help(ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let target = args.get_zero_one_args("help")?;
    let text = match target {
        None => {
            let catalog = ctx.registry.borrow().catalog();
            if catalog.is_empty() {
                "no libraries registered".to_owned()
            } else {
                format!("registered libraries:\n  {}", catalog.join("\n  "))
            }
        }
        Some(Object::Builtin(builtin)) => builtin
            .help()
            .map_or_else(|| format!("{}: no help available", builtin.name()), ToOwned::to_owned),
        Some(Object::Function(func)) => func
            .doc()
            .map_or_else(|| format!("{}: no documentation", func.name()), ToOwned::to_owned),
        Some(Object::Class(class)) => class
            .doc()
            .map_or_else(|| format!("class {}", class.name()), ToOwned::to_owned),
        Some(Object::Dict(dict)) => {
            let dict = dict.borrow();
            match dict.get_by_string("__doc__") {
                Some(doc) => doc.to_string(),
                None => "no help available".to_owned(),
            }
        }
        Some(other) => format!("{}: no help available", other.type_name()),
    };
    ctx.stdout_write(&text)?;
    ctx.stdout_push('\n')?;
    Ok(Object::None)
}
