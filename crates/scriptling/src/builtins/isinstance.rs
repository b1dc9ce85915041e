//! Implementation of the isinstance() builtin function.

use crate::{
    args::ArgValues,
    class::Class,
    context::Context,
    exception::{ExcType, Exception},
    object::Object,
};

pub(crate) fn builtin_isinstance_entry(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let (value, type_spec) = args.get_two_args("isinstance")?;
    isinstance_check(&value, &type_spec).map(Object::Bool)
}

/// Checks a value against a type specifier: a bare type token (which
/// resolves to the conversion builtin of the same name), the string form,
/// `None`, or a class (subclass-aware).
pub(crate) fn isinstance_check(value: &Object, type_spec: &Object) -> Result<bool, Exception> {
    match type_spec {
        Object::Str(name) => Ok(matches_type_name(value, name)),
        // `isinstance(x, int)`: the bare token resolves to the builtin.
        Object::Builtin(builtin) => Ok(matches_type_name(value, builtin.name())),
        Object::None => Ok(matches!(value, Object::None)),
        Object::Class(class) => match value {
            Object::Instance(instance) => {
                let value_class = std::rc::Rc::clone(&instance.borrow().class);
                Ok(Class::is_subclass_of(&value_class, class))
            }
            _ => Ok(false),
        },
        other => Err(Exception::new(
            ExcType::TypeError,
            format!(
                "isinstance() arg 2 must be a type, type name, or class, not '{}'",
                other.type_name()
            ),
        )),
    }
}

fn matches_type_name(value: &Object, name: &str) -> bool {
    match name {
        // bool is a subtype of int.
        "int" => matches!(value, Object::Int(_) | Object::Bool(_)),
        "float" => matches!(value, Object::Float(_)),
        "str" => matches!(value, Object::Str(_)),
        "bool" => matches!(value, Object::Bool(_)),
        "list" => matches!(value, Object::List(_)),
        "tuple" => matches!(value, Object::Tuple(_)),
        "dict" => matches!(value, Object::Dict(_)),
        "None" | "NoneType" => matches!(value, Object::None),
        other => match value {
            // String form also matches instance class names up the chain.
            Object::Instance(instance) => {
                let mut class = std::rc::Rc::clone(&instance.borrow().class);
                loop {
                    if class.name() == other {
                        return true;
                    }
                    let Some(base) = class.base().cloned() else {
                        return false;
                    };
                    class = base;
                }
            }
            _ => false,
        },
    }
}
