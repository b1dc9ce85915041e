//! Callable value kinds: script functions, lambdas, host builtins, and bound
//! methods.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use crate::{
    args::ArgValues,
    ast::{Block, Expr, Param},
    class::{Class, Instance},
    context::Context,
    exception::Exception,
    namespace::ScopeRef,
    object::Object,
};

/// A function defined by a `def` statement.
///
/// Holds the environment active at its definition site, so nested functions
/// close over outer bindings (and may mutate them via `nonlocal`).
pub struct Function {
    pub(crate) name: String,
    pub(crate) params: Vec<Param>,
    pub(crate) body: Rc<Block>,
    pub(crate) env: ScopeRef,
    pub(crate) doc: Option<String>,
}

impl Function {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured environment may reference this function; print the
        // name only.
        write!(f, "<function {}>", self.name)
    }
}

/// A `lambda` expression value.
pub struct LambdaFn {
    pub(crate) params: Vec<Param>,
    pub(crate) body: Rc<Expr>,
    pub(crate) env: ScopeRef,
}

impl fmt::Debug for LambdaFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<lambda>")
    }
}

/// Implementation signature shared by every host-registered callable.
///
/// Positional and keyword arguments arrive bundled in [`ArgValues`]; the
/// context carries cancellation, depth, I/O sinks and per-library instance
/// data.
pub type BuiltinImpl = dyn Fn(&mut Context, ArgValues) -> Result<Object, Exception>;

/// A host-supplied callable installed under a name, with optional help text.
#[derive(Clone)]
pub struct Builtin {
    pub(crate) name: String,
    pub(crate) func: Rc<BuiltinImpl>,
    pub(crate) help: Option<String>,
}

impl Builtin {
    pub fn new(
        name: impl Into<String>,
        help: Option<&str>,
        func: impl Fn(&mut Context, ArgValues) -> Result<Object, Exception> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
            help: help.map(ToOwned::to_owned),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub(crate) fn call(&self, ctx: &mut Context, args: ArgValues) -> Result<Object, Exception> {
        (self.func)(ctx, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

/// An instance/method pair produced by attribute access.
///
/// Holds only a weak reference to the instance: the bound method exists to
/// prepend `self` when invoked and never keeps the instance alive beyond the
/// call.
pub struct BoundMethod {
    pub(crate) instance: Weak<RefCell<Instance>>,
    /// The underlying `Function` or `Builtin`.
    pub(crate) func: Object,
    /// Class the method was found on; `super()` starts above this.
    pub(crate) defining: Rc<Class>,
}

impl BoundMethod {
    pub(crate) fn name(&self) -> String {
        match &self.func {
            Object::Function(func) => func.name.clone(),
            Object::Builtin(builtin) => builtin.name.clone(),
            other => other.type_name().to_owned(),
        }
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<bound method {}>", self.name())
    }
}
