//! Implementation of the print() builtin function.

use crate::{
    args::ArgValues,
    context::Context,
    exception::{ExcType, Exception},
    object::Object,
};

/// Writes each argument's `str()` form to the interpreter's output sink.
///
/// `sep` (default a space) separates arguments; `end` (default a newline)
/// terminates the line. Output goes wherever the host pointed the sink:
/// stdout, a capture buffer, or a custom writer.
pub(crate) fn builtin_print(ctx: &mut Context, mut args: ArgValues) -> Result<Object, Exception> {
    let sep = take_str_kwarg(&mut args, "sep")?.unwrap_or_else(|| " ".to_owned());
    let end = take_str_kwarg(&mut args, "end")?.unwrap_or_else(|| "\n".to_owned());
    if let Some(unknown) = args.kwargs().first_name() {
        return Err(Exception::new(
            ExcType::TypeError,
            format!("print() got an unexpected keyword argument '{unknown}'"),
        ));
    }

    let mut first = true;
    for value in args.iter() {
        if !first {
            ctx.stdout_write(&sep)?;
        }
        first = false;
        ctx.stdout_write(&value.to_string())?;
    }
    ctx.stdout_write(&end)?;
    Ok(Object::None)
}

fn take_str_kwarg(args: &mut ArgValues, name: &str) -> Result<Option<String>, Exception> {
    match args.kwargs_mut().remove(name) {
        None => Ok(None),
        Some(Object::Str(s)) => Ok(Some(s.to_string())),
        Some(other) => Err(Exception::new(
            ExcType::TypeError,
            format!("{name} must be a string, not '{}'", other.type_name()),
        )),
    }
}
