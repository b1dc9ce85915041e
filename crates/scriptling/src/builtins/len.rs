//! Implementation of the len() builtin function.

use crate::{
    args::ArgValues,
    context::Context,
    exception::{ExcType, Exception},
    object::Object,
};

pub(crate) fn builtin_len(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    let value = args.get_one_arg("len")?;
    let len = match &value {
        Object::Str(s) => s.chars().count(),
        Object::List(items) => items.borrow().len(),
        Object::Tuple(items) => items.len(),
        Object::Dict(dict) => dict.borrow().len(),
        other => {
            return Err(Exception::new(
                ExcType::TypeError,
                format!("object of type '{}' has no len()", other.type_name()),
            ));
        }
    };
    Ok(Object::Int(len as i64))
}
