//! The ambient evaluation context.
//!
//! A `Context` travels through every evaluator call and into every host
//! builtin. It carries cancellation, call-depth tracking, source-file
//! attribution, the interpreter's I/O sinks, the library registry, and the
//! per-library instance data attached while a call into an instantiated
//! library is in flight.

use std::{
    cell::RefCell,
    io::BufRead,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::{
    exception::{ExcType, Exception},
    io::{OutputSink, PrintWriter as _},
    library::LibraryRegistry,
    object::Object,
};

/// Default cap on user-function call depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Cooperative cancellation signal observed by the evaluator.
///
/// The evaluator checks the token at statement boundaries and on every loop
/// iteration; long-running builtins should check the context they receive as
/// well. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that trips automatically once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Signals cancellation. Safe to call from another thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

pub struct Context {
    cancel: CancelToken,
    depth: usize,
    max_depth: usize,
    source_file: Option<Rc<str>>,
    instance_data: Option<Object>,
    pub(crate) out: Rc<RefCell<OutputSink>>,
    pub(crate) input: Option<Rc<RefCell<dyn BufRead>>>,
    pub(crate) registry: Rc<RefCell<LibraryRegistry>>,
    /// Exception being handled by the innermost active `except` block, for
    /// bare `raise`.
    pub(crate) current_exception: Option<Exception>,
}

impl Context {
    pub(crate) fn new(
        cancel: CancelToken,
        max_depth: usize,
        source_file: Option<Rc<str>>,
        out: Rc<RefCell<OutputSink>>,
        input: Option<Rc<RefCell<dyn BufRead>>>,
        registry: Rc<RefCell<LibraryRegistry>>,
    ) -> Self {
        Self {
            cancel,
            depth: 0,
            max_depth,
            source_file,
            instance_data: None,
            out,
            input,
            registry,
            current_exception: None,
        }
    }

    /// The cancellation token for this evaluation, for builtins that spawn
    /// or poll long-running work.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Fails with a `SystemExit`-flavored exception once cancelled.
    pub fn check_cancelled(&self) -> Result<(), Exception> {
        if self.cancel.is_cancelled() {
            Err(Exception::new(ExcType::SystemExit, "evaluation cancelled"))
        } else {
            Ok(())
        }
    }

    /// Source file used to tag errors, when the host set one.
    #[must_use]
    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    /// Instance data of the library instance currently being called, if any.
    ///
    /// Set by the import resolver's call wrappers; different interpreters
    /// hosting the same library see their own data here.
    #[must_use]
    pub fn instance_data(&self) -> Option<&Object> {
        self.instance_data.as_ref()
    }

    pub(crate) fn swap_instance_data(&mut self, data: Option<Object>) -> Option<Object> {
        std::mem::replace(&mut self.instance_data, data)
    }

    /// Enters a user-function call, failing once the depth cap is exceeded.
    pub(crate) fn enter_call(&mut self) -> Result<(), Exception> {
        if self.depth >= self.max_depth {
            return Err(Exception::new(
                ExcType::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Writes a fragment to the interpreter's output sink.
    pub fn stdout_write(&mut self, output: &str) -> Result<(), Exception> {
        self.out.borrow_mut().write_str(output)
    }

    /// Writes a separator or terminator character to the output sink.
    pub fn stdout_push(&mut self, end: char) -> Result<(), Exception> {
        self.out.borrow_mut().push(end)
    }

    /// Reads one line from the interpreter's input reader, without the
    /// trailing newline.
    pub fn read_line(&mut self) -> Result<String, Exception> {
        let Some(input) = &self.input else {
            return Err(Exception::new(ExcType::RuntimeError, "no input reader is set"));
        };
        let mut line = String::new();
        input
            .borrow_mut()
            .read_line(&mut line)
            .map_err(|err| Exception::new(ExcType::RuntimeError, format!("input read failed: {err}")))?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}
