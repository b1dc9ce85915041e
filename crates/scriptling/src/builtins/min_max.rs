//! Implementation of the min() and max() builtin functions.

use std::cmp::Ordering;

use crate::{
    args::ArgValues,
    context::Context,
    exception::{ExcType, Exception},
    expressions::ordering_of,
    object::Object,
};

pub(crate) fn builtin_min(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    extreme("min", args, Ordering::Less)
}

pub(crate) fn builtin_max(_ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
    extreme("max", args, Ordering::Greater)
}

/// Shared min/max body: a single iterable argument, or two or more plain
/// values. Comparing incompatible kinds propagates the usual `TypeError`.
fn extreme(name: &str, args: ArgValues, keep: Ordering) -> Result<Object, Exception> {
    args.reject_kwargs(name)?;
    let (positional, _) = args.into_parts();
    let candidates: Vec<Object> = match positional.len() {
        0 => return Err(ExcType::type_error_at_least(name, 1, 0)),
        1 => match &positional[0] {
            Object::List(items) => items.borrow().clone(),
            Object::Tuple(items) => items.as_ref().clone(),
            Object::Str(s) => s.chars().map(|c| Object::str(c.to_string())).collect(),
            Object::Dict(dict) => dict.borrow().keys(),
            other => {
                return Err(Exception::new(
                    ExcType::TypeError,
                    format!("'{}' object is not iterable", other.type_name()),
                ));
            }
        },
        _ => positional.into_iter().collect(),
    };

    let mut iter = candidates.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(Exception::new(ExcType::ValueError, format!("{name}() arg is an empty sequence")));
    };
    for candidate in iter {
        if ordering_of(&candidate, &best, 0)? == Some(keep) {
            best = candidate;
        }
    }
    Ok(best)
}
