//! Implementation of the range() builtin function.
//!
//! Ranges materialize eagerly as lists; there is no lazy sequence kind in
//! the object model.

use crate::{
    args::ArgValues,
    context::Context,
    exception::{ExcType, Exception},
    object::Object,
};

pub(crate) fn builtin_range(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    args.reject_kwargs("range")?;
    let (positional, _) = args.into_parts();
    let ints: Vec<i64> = positional
        .iter()
        .map(|v| match v {
            Object::Int(n) => Ok(*n),
            Object::Bool(b) => Ok(i64::from(*b)),
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("range() argument must be an integer, not '{}'", other.type_name()),
            )),
        })
        .collect::<Result<_, _>>()?;

    let (start, stop, step) = match ints.len() {
        1 => (0, ints[0], 1),
        2 => (ints[0], ints[1], 1),
        3 => (ints[0], ints[1], ints[2]),
        n => {
            return Err(if n == 0 {
                crate::exception::ExcType::type_error_at_least("range", 1, 0)
            } else {
                crate::exception::ExcType::type_error_at_most("range", 3, n)
            });
        }
    };
    if step == 0 {
        return Err(Exception::new(ExcType::ValueError, "range() step must not be zero"));
    }

    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            out.push(Object::Int(i));
            i += step;
        }
    } else {
        while i > stop {
            out.push(Object::Int(i));
            i += step;
        }
    }
    Ok(Object::list(out))
}
