//! Scriptling: an embeddable, sandboxed interpreter for a Python-inspired
//! scripting language.
//!
//! A host registers data, functions, classes, and libraries from its native
//! runtime; scripts read and update host state, invoke host capabilities,
//! and return values back. A fresh [`Interpreter`] carries no ambient
//! capability: no filesystem, no network, no clock. Anything beyond pure
//! computation must be granted explicitly.
//!
//! ```
//! use scriptling::Interpreter;
//!
//! let mut interp = Interpreter::new();
//! interp.set_var("base", 40i64);
//! interp.register_fn("bump", |n: i64| n + 2);
//! let result = interp.eval("bump(base)").unwrap();
//! assert_eq!(i64::try_from(&result).unwrap(), 42);
//! ```

mod args;
mod ast;
mod builtins;
mod cache;
mod class;
mod context;
mod eval;
mod exception;
mod expressions;
mod fstring;
mod function;
mod io;
mod lex;
mod library;
mod methods;
mod namespace;
mod object;
mod parse;
mod run;
mod signature;

pub use crate::{
    args::{ArgValues, Kwargs},
    class::{Class, Instance, SuperProxy},
    context::{CancelToken, Context, DEFAULT_MAX_CALL_DEPTH},
    exception::{ExcKind, ExcType, Exception},
    function::{BoundMethod, Builtin, Function, LambdaFn},
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint, WriterPrint},
    library::{Library, LibraryBuilder, OnDemandLibrary},
    object::{Dict, Object},
    run::Interpreter,
    signature::{ClassBuilder, CtxArg, FallibleReturn, FromObject, KwargsArg, NativeFunction},
};
