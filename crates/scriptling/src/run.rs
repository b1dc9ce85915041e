//! Public interface for embedding and running Scriptling code.

use std::{
    cell::RefCell,
    io::{self, BufRead},
    panic::{AssertUnwindSafe, catch_unwind},
    rc::Rc,
    sync::Arc,
    time::Duration,
};

use crate::{
    args::{ArgValues, Kwargs},
    ast::Program,
    builtins::install_builtins,
    cache::{ProgramCache, SourceKey},
    context::{CancelToken, Context, DEFAULT_MAX_CALL_DEPTH},
    eval::eval_program,
    exception::{ExcType, Exception},
    expressions::{call_object, get_attr, instantiate},
    function::Builtin,
    io::{CollectStringPrint, OutputSink, StdPrint, WriterPrint},
    library::{Library, LibraryRegistry, OnDemandLibrary, import_path},
    namespace::{Namespace, ScopeRef},
    object::{Dict, Object},
    parse::parse,
    signature::{ClassBuilder, NativeFunction},
};

/// Maximum depth for dotted-name lookup in `call_function` and friends.
const MAX_DOTTED_LOOKUP: usize = 10;

/// A sandboxed interpreter instance.
///
/// A fresh interpreter has only the core builtins installed: no filesystem,
/// no network, no clock. Everything else enters through explicit
/// registration. Each instance is single-threaded; run separate instances
/// for parallel evaluation. Parsed programs are shared process-wide through
/// the program cache, so constructing interpreters is cheap.
///
/// # Example
/// ```
/// use scriptling::Interpreter;
///
/// let mut interp = Interpreter::new();
/// interp.eval("x = 40 + 2").unwrap();
/// assert_eq!(interp.get_var_as_int("x").unwrap(), 42);
/// ```
pub struct Interpreter {
    globals: ScopeRef,
    registry: Rc<RefCell<LibraryRegistry>>,
    out: Rc<RefCell<OutputSink>>,
    input: Option<Rc<RefCell<dyn BufRead>>>,
    source_file: Option<Rc<str>>,
    max_depth: usize,
    last_system_exit: Option<Exception>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a fresh interpreter with only the core builtins installed.
    #[must_use]
    pub fn new() -> Self {
        let globals = Namespace::new_root();
        install_builtins(&globals);
        Self {
            globals,
            registry: Rc::new(RefCell::new(LibraryRegistry::default())),
            out: Rc::new(RefCell::new(OutputSink::Std(StdPrint))),
            input: None,
            source_file: None,
            max_depth: DEFAULT_MAX_CALL_DEPTH,
            last_system_exit: None,
        }
    }

    fn make_context(&self, cancel: CancelToken) -> Context {
        Context::new(
            cancel,
            self.max_depth,
            self.source_file.clone(),
            Rc::clone(&self.out),
            self.input.clone(),
            Rc::clone(&self.registry),
        )
    }

    fn tag(&self, exc: Exception) -> Exception {
        exc.with_source_file(self.source_file.as_deref())
    }

    fn parse_cached(&self, source: &str) -> Result<Arc<Program>, Exception> {
        let key = SourceKey::of(source);
        let cache = ProgramCache::global();
        if let Some(program) = cache.get(key) {
            return Ok(program);
        }
        let program = parse(source).map_err(|errors| {
            let message = errors
                .iter()
                .map(|e| format!("line {}: {}", e.line, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            let kind = errors.first().map_or(ExcType::ParseError, |e| e.kind);
            self.tag(Exception::new(kind, message))
        })?;
        let program = Arc::new(program);
        cache.insert(key, Arc::clone(&program));
        Ok(program)
    }

    /// Runs a closure with a recovery boundary: a panic in a builtin or in
    /// the evaluator itself becomes a fatal exception instead of unwinding
    /// into the host.
    fn with_recovery(f: impl FnOnce() -> Result<Object, Exception>) -> Result<Object, Exception> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_owned());
                let backtrace = std::backtrace::Backtrace::force_capture();
                Err(Exception::new(
                    ExcType::RuntimeError,
                    format!("fatal: {message}\n{backtrace}"),
                ))
            }
        }
    }

    // === Evaluation ===

    /// Parses (or fetches from the program cache) and evaluates a script.
    ///
    /// Returns the value of the last expression statement. `SystemExit(0)`
    /// surfaces as success with the exception retrievable through
    /// [`Interpreter::last_system_exit`]; a nonzero exit code is an error.
    pub fn eval(&mut self, source: &str) -> Result<Object, Exception> {
        self.eval_with_context(CancelToken::new(), source)
    }

    /// Evaluates with a deadline; on expiry the script stops with a
    /// `SystemExit`-flavored exception at the next statement boundary or
    /// loop iteration.
    pub fn eval_with_timeout(&mut self, timeout: Duration, source: &str) -> Result<Object, Exception> {
        self.eval_with_context(CancelToken::with_timeout(timeout), source)
    }

    /// Evaluates under a host-controlled cancellation token.
    pub fn eval_with_context(&mut self, cancel: CancelToken, source: &str) -> Result<Object, Exception> {
        let program = self.parse_cached(source)?;
        let mut ctx = self.make_context(cancel);
        let globals = Rc::clone(&self.globals);
        let result = Self::with_recovery(move || eval_program(&mut ctx, &globals, program.as_ref()));
        match result {
            Ok(value) => Ok(value),
            Err(exc) if exc.is_system_exit() && exc.exit_code() == Some(0) => {
                self.last_system_exit = Some(exc);
                Ok(Object::None)
            }
            Err(exc) => {
                if exc.is_system_exit() {
                    self.last_system_exit = Some(exc.clone());
                }
                Err(self.tag(exc))
            }
        }
    }

    /// The `SystemExit` raised by the most recent evaluation, if any.
    #[must_use]
    pub fn last_system_exit(&self) -> Option<&Exception> {
        self.last_system_exit.as_ref()
    }

    // === Variables ===

    /// Sets a global variable from any host value with a direct conversion.
    pub fn set_var(&mut self, name: &str, value: impl Into<Object>) {
        Namespace::set(&self.globals, name, value.into());
    }

    /// Sets a global variable from an existing script object.
    pub fn set_object_var(&mut self, name: &str, value: Object) {
        Namespace::set(&self.globals, name, value);
    }

    /// Sets a global variable from any serde-serializable host value, using
    /// the JSON fallback conversion.
    pub fn set_var_serialize<T: serde::Serialize>(&mut self, name: &str, value: &T) -> Result<(), Exception> {
        let obj = Object::from_serialize(value)?;
        Namespace::set(&self.globals, name, obj);
        Ok(())
    }

    #[must_use]
    pub fn get_var(&self, name: &str) -> Option<Object> {
        Namespace::get(&self.globals, name)
    }

    fn get_var_required(&self, name: &str) -> Result<Object, Exception> {
        self.get_var(name)
            .ok_or_else(|| Exception::new(ExcType::NameError, format!("name '{name}' is not defined")))
    }

    pub fn get_var_as_int(&self, name: &str) -> Result<i64, Exception> {
        let value = self.get_var_required(name)?;
        i64::try_from(&value)
    }

    pub fn get_var_as_float(&self, name: &str) -> Result<f64, Exception> {
        let value = self.get_var_required(name)?;
        f64::try_from(&value)
    }

    pub fn get_var_as_bool(&self, name: &str) -> Result<bool, Exception> {
        let value = self.get_var_required(name)?;
        bool::try_from(&value)
    }

    pub fn get_var_as_string(&self, name: &str) -> Result<String, Exception> {
        let value = self.get_var_required(name)?;
        String::try_from(&value)
    }

    pub fn get_var_as_list(&self, name: &str) -> Result<Vec<Object>, Exception> {
        let value = self.get_var_required(name)?;
        Vec::<Object>::try_from(&value)
    }

    pub fn get_var_as_dict(&self, name: &str) -> Result<Dict, Exception> {
        let value = self.get_var_required(name)?;
        match &value {
            Object::Dict(dict) => Ok(dict.borrow().clone()),
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("expected dict, got {}", other.type_name()),
            )),
        }
    }

    // === Host callables and classes ===

    /// Installs a builtin under `name` using the raw `(ctx, args)` contract.
    pub fn register_callable(
        &mut self,
        name: &str,
        func: impl Fn(&mut Context, ArgValues) -> Result<Object, Exception> + 'static,
        help: Option<&str>,
    ) {
        let builtin = Builtin::new(name, help, func);
        Namespace::set(&self.globals, name, Object::Builtin(Rc::new(builtin)));
    }

    /// Installs a builtin from a native Rust signature; parameter and return
    /// types are adapted automatically.
    ///
    /// ```
    /// use scriptling::Interpreter;
    ///
    /// let mut interp = Interpreter::new();
    /// interp.register_fn("add", |a: i64, b: i64| a + b);
    /// interp.eval("r = add(40, 2)").unwrap();
    /// assert_eq!(interp.get_var_as_int("r").unwrap(), 42);
    /// ```
    pub fn register_fn<M>(&mut self, name: &str, func: impl NativeFunction<M>) {
        let builtin = Builtin {
            name: name.to_owned(),
            func: func.into_builtin_impl(),
            help: None,
        };
        Namespace::set(&self.globals, name, Object::Builtin(Rc::new(builtin)));
    }

    /// Registers a host class assembled by a [`ClassBuilder`]. Scripts can
    /// instantiate it, subclass it, and mix it into inheritance chains.
    pub fn register_class(&mut self, builder: ClassBuilder) {
        let name = builder.name().to_owned();
        Namespace::set(&self.globals, &name, builder.build());
    }

    /// Evaluates script source and requires it to define `name` as a
    /// callable, making script-defined helpers registrable like builtins.
    pub fn register_script_callable(&mut self, name: &str, source: &str) -> Result<(), Exception> {
        self.eval(source)?;
        match self.get_var(name) {
            Some(Object::Function(_) | Object::Lambda(_) | Object::Builtin(_) | Object::Class(_)) => Ok(()),
            Some(other) => Err(Exception::new(
                ExcType::TypeError,
                format!("'{name}' is {} after evaluation, not a callable", other.type_name()),
            )),
            None => Err(Exception::new(
                ExcType::NameError,
                format!("source did not define '{name}'"),
            )),
        }
    }

    // === Libraries ===

    /// Registers a native library for import.
    pub fn register_library(&mut self, library: Library) {
        self.registry.borrow_mut().register_native(library, None);
    }

    /// Registers a native library template bound to per-interpreter instance
    /// data. The data rides on the [`Context`] during every call into this
    /// library instance, so the same template registered on several
    /// interpreters carries distinct configuration without global state.
    pub fn register_library_instance(&mut self, library: Library, instance_data: impl Into<Object>) {
        self.registry.borrow_mut().register_native(library, Some(instance_data.into()));
    }

    /// Registers a library implemented in script source; it is evaluated
    /// lazily on first import.
    pub fn register_script_library(&mut self, name: &str, source: &str) {
        self.registry.borrow_mut().register_script(name, source);
    }

    /// Sets the callback consulted once when an import finds no registered
    /// library, letting hosts load libraries on demand.
    pub fn set_on_demand_library_callback(&mut self, callback: impl FnMut(&str) -> Option<OnDemandLibrary> + 'static) {
        self.registry.borrow_mut().set_on_demand(Box::new(callback));
    }

    /// Imports a library into the global scope, as `import name` would.
    pub fn import_library(&mut self, name: &str) -> Result<(), Exception> {
        let mut ctx = self.make_context(CancelToken::new());
        import_path(&mut ctx, &self.globals, name, None)?;
        Ok(())
    }

    /// Imports several libraries in order.
    pub fn import_libraries(&mut self, names: &[&str]) -> Result<(), Exception> {
        for name in names {
            self.import_library(name)?;
        }
        Ok(())
    }

    // === Host-initiated calls ===

    /// Calls a script-visible callable by (possibly dotted) name.
    pub fn call_function(&mut self, name: &str, args: Vec<Object>) -> Result<Object, Exception> {
        self.call_function_with_context(CancelToken::new(), name, args)
    }

    /// Calls a script-visible callable with keyword arguments.
    pub fn call_function_kwargs(
        &mut self,
        name: &str,
        args: Vec<Object>,
        kwargs: Kwargs,
    ) -> Result<Object, Exception> {
        let callee = self.lookup_dotted(name)?;
        let mut ctx = self.make_context(CancelToken::new());
        Self::with_recovery(move || call_object(&mut ctx, &callee, ArgValues::with_kwargs(args, kwargs), 0))
            .map_err(|e| self.tag(e))
    }

    /// Calls a script-visible callable under a cancellation token.
    pub fn call_function_with_context(
        &mut self,
        cancel: CancelToken,
        name: &str,
        args: Vec<Object>,
    ) -> Result<Object, Exception> {
        let callee = self.lookup_dotted(name)?;
        let mut ctx = self.make_context(cancel);
        Self::with_recovery(move || call_object(&mut ctx, &callee, ArgValues::positional(args), 0))
            .map_err(|e| self.tag(e))
    }

    /// Constructs an instance of a registered or script-defined class,
    /// running `__init__`.
    pub fn create_instance(&mut self, class_name: &str, args: Vec<Object>) -> Result<Object, Exception> {
        self.create_instance_with_context(CancelToken::new(), class_name, args)
    }

    pub fn create_instance_with_context(
        &mut self,
        cancel: CancelToken,
        class_name: &str,
        args: Vec<Object>,
    ) -> Result<Object, Exception> {
        let class = match self.lookup_dotted(class_name)? {
            Object::Class(class) => class,
            other => {
                return Err(Exception::new(
                    ExcType::TypeError,
                    format!("'{class_name}' is {}, not a class", other.type_name()),
                ));
            }
        };
        let mut ctx = self.make_context(cancel);
        Self::with_recovery(move || instantiate(&mut ctx, &class, ArgValues::positional(args), 0))
            .map_err(|e| self.tag(e))
    }

    /// Calls a method on an instance, dispatching through its class chain.
    pub fn call_method(&mut self, instance: &Object, name: &str, args: Vec<Object>) -> Result<Object, Exception> {
        self.call_method_with_context(CancelToken::new(), instance, name, args)
    }

    pub fn call_method_with_context(
        &mut self,
        cancel: CancelToken,
        instance: &Object,
        name: &str,
        args: Vec<Object>,
    ) -> Result<Object, Exception> {
        let method = get_attr(instance, name, 0)?;
        let mut ctx = self.make_context(cancel);
        Self::with_recovery(move || call_object(&mut ctx, &method, ArgValues::positional(args), 0))
            .map_err(|e| self.tag(e))
    }

    /// Resolves `"pkg.sub.fn"`-style names through nested library dicts.
    fn lookup_dotted(&self, name: &str) -> Result<Object, Exception> {
        let segments: Vec<&str> = name.split('.').collect();
        if segments.len() > MAX_DOTTED_LOOKUP {
            return Err(Exception::new(
                ExcType::NameError,
                format!("'{name}' exceeds {MAX_DOTTED_LOOKUP} lookup levels"),
            ));
        }
        let mut current = self.get_var_required(segments[0])?;
        for segment in &segments[1..] {
            current = get_attr(&current, segment, 0)?;
        }
        Ok(current)
    }

    // === I/O ===

    /// Redirects `print` output into an in-memory buffer readable via
    /// [`Interpreter::get_output`].
    pub fn enable_output_capture(&mut self) {
        *self.out.borrow_mut() = OutputSink::Capture(CollectStringPrint::new());
    }

    /// Returns and clears the captured output. `None` when capture is not
    /// enabled.
    pub fn get_output(&mut self) -> Option<String> {
        let mut sink = self.out.borrow_mut();
        let text = sink.captured().map(ToOwned::to_owned);
        sink.clear_captured();
        text
    }

    /// Routes `print` output to a host writer.
    pub fn set_output_writer(&mut self, writer: impl io::Write + 'static) {
        *self.out.borrow_mut() = OutputSink::Custom(Box::new(WriterPrint::new(writer)));
    }

    /// Sets the reader used by the `input()` builtin.
    pub fn set_input_reader(&mut self, reader: impl BufRead + 'static) {
        self.input = Some(Rc::new(RefCell::new(reader)));
    }

    /// Tags subsequent runtime errors with a source file name.
    pub fn set_source_file(&mut self, name: &str) {
        self.source_file = Some(Rc::from(name));
    }

    /// Overrides the default recursion cap of 1000 user-function calls.
    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }
}
