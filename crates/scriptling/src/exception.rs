use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

use crate::object::Object;

/// Result type alias for operations that can produce a runtime error.
pub(crate) type RunResult<T> = Result<T, RunError>;

/// Exception kinds built into the interpreter.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `ValueError` -> "ValueError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ExcType {
    /// Primary exception class - matches any catchable exception in `except` clauses.
    Exception,
    /// Raised by `exit()` / cancellation; carries an integer exit code.
    /// Not caught by `except Exception`.
    SystemExit,

    /// Lexical or syntactic failure, surfaced before any execution.
    ParseError,
    /// Inconsistent block indentation, surfaced before any execution.
    IndentError,

    AssertionError,
    AttributeError,
    ImportError,
    IndexError,
    KeyError,
    NameError,
    OverflowError,
    RecursionError,
    RuntimeError,
    /// Raised by the iteration protocol (`__next__`) to signal exhaustion.
    StopIteration,
    TypeError,
    ValueError,
    ZeroDivisionError,
}

impl ExcType {
    /// Checks if this exception kind would be caught by `except handler_type:`.
    ///
    /// The hierarchy is flat apart from two rules: `Exception` catches every
    /// kind except `SystemExit`, and every kind catches itself.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            Self::Exception => self != Self::SystemExit,
            _ => false,
        }
    }

    /// Builds a `TypeError` for a callable invoked with the wrong number of arguments.
    pub(crate) fn type_error_arg_count(name: &str, expected: usize, got: usize) -> Exception {
        Exception::new(
            Self::TypeError,
            format!("{name}() takes exactly {expected} argument{} ({got} given)", plural(expected)),
        )
    }

    /// Builds a `TypeError` for a callable invoked with too few arguments.
    pub(crate) fn type_error_at_least(name: &str, expected: usize, got: usize) -> Exception {
        Exception::new(
            Self::TypeError,
            format!("{name}() takes at least {expected} argument{} ({got} given)", plural(expected)),
        )
    }

    /// Builds a `TypeError` for a callable invoked with too many arguments.
    pub(crate) fn type_error_at_most(name: &str, expected: usize, got: usize) -> Exception {
        Exception::new(
            Self::TypeError,
            format!("{name}() takes at most {expected} argument{} ({got} given)", plural(expected)),
        )
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// The kind tag carried by every [`Exception`].
///
/// Host code may raise and catch exception kinds the interpreter does not
/// know about; those travel as `Custom` and are matched by name in `except`
/// clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcKind {
    Builtin(ExcType),
    Custom(Box<str>),
}

impl ExcKind {
    /// Parses an exception name: a known builtin kind, or a custom kind.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        name.parse::<ExcType>()
            .map_or_else(|_| Self::Custom(name.into()), Self::Builtin)
    }

    /// The kind name as written in scripts (e.g. `ValueError`).
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(t) => t.into(),
            Self::Custom(name) => name,
        }
    }

    /// Whether an exception of this kind is caught by `except handler:`.
    #[must_use]
    pub fn is_caught_by(&self, handler: &Self) -> bool {
        match (self, handler) {
            (Self::Builtin(t), Self::Builtin(h)) => t.is_subclass_of(*h),
            // `except Exception` catches host-defined kinds too.
            (Self::Custom(_), Self::Builtin(h)) => *h == ExcType::Exception,
            (Self::Custom(a), Self::Custom(b)) => a == b,
            (Self::Builtin(_), Self::Custom(_)) => false,
        }
    }
}

impl fmt::Display for ExcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A runtime error or raised exception.
///
/// This is the single error currency of the interpreter: lexer/parser
/// failures, runtime errors (`TypeError`, `NameError`, ...), script `raise`
/// statements, assertion failures, and `SystemExit` all surface as an
/// `Exception` tagged with an [`ExcKind`]. Source file and line are attached
/// where known so host-visible messages carry a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    kind: ExcKind,
    message: String,
    exit_code: Option<i64>,
    line: Option<u32>,
    source_file: Option<String>,
}

impl Exception {
    /// Creates an exception of a builtin kind.
    pub fn new(exc_type: ExcType, message: impl Into<String>) -> Self {
        Self {
            kind: ExcKind::Builtin(exc_type),
            message: message.into(),
            exit_code: None,
            line: None,
            source_file: None,
        }
    }

    /// Creates an exception with a host-defined kind name.
    pub fn custom(kind_name: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ExcKind::from_name(kind_name),
            message: message.into(),
            exit_code: None,
            line: None,
            source_file: None,
        }
    }

    /// Creates a `SystemExit` exception carrying an exit code.
    #[must_use]
    pub fn system_exit(code: i64) -> Self {
        Self {
            kind: ExcKind::Builtin(ExcType::SystemExit),
            message: code.to_string(),
            exit_code: Some(code),
            line: None,
            source_file: None,
        }
    }

    /// Attaches a source line if none is recorded yet.
    ///
    /// The innermost location wins: an exception that already carries a line
    /// keeps it as the error propagates through enclosing statements.
    #[must_use]
    pub(crate) fn with_line(mut self, line: u32) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    /// Attaches the source file name if none is recorded yet.
    pub(crate) fn with_source_file(mut self, file: Option<&str>) -> Self {
        if self.source_file.is_none() {
            if let Some(file) = file {
                self.source_file = Some(file.to_owned());
            }
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> &ExcKind {
        &self.kind
    }

    /// The builtin kind, when this is not a host-defined exception.
    #[must_use]
    pub fn exc_type(&self) -> Option<ExcType> {
        match self.kind {
            ExcKind::Builtin(t) => Some(t),
            ExcKind::Custom(_) => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The exit code for `SystemExit` exceptions.
    #[must_use]
    pub fn exit_code(&self) -> Option<i64> {
        self.exit_code
    }

    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    #[must_use]
    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub(crate) fn is_system_exit(&self) -> bool {
        self.kind == ExcKind::Builtin(ExcType::SystemExit)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source_file, self.line) {
            (Some(file), Some(line)) => write!(f, "{file}:{line}: ")?,
            (Some(file), None) => write!(f, "{file}: ")?,
            (None, Some(line)) => write!(f, "line {line}: ")?,
            (None, None) => {}
        }
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Exception {}

/// Non-local exits produced while evaluating statements.
///
/// `Return`, `Break` and `Continue` are plain control flow: they unwind until
/// the enclosing function call or loop absorbs them. `Exc` carries a runtime
/// error or raised exception until a `try`/`except` handler or the host
/// catches it.
#[derive(Debug)]
pub(crate) enum RunError {
    Exc(Exception),
    Return(Object),
    Break,
    Continue,
}

impl From<Exception> for RunError {
    fn from(exc: Exception) -> Self {
        Self::Exc(exc)
    }
}

impl RunError {
    /// Converts a statement-level exit into the exception seen outside any
    /// function or loop. `Return`/`Break`/`Continue` at top level are
    /// malformed programs rather than catchable conditions.
    pub(crate) fn into_exception(self) -> Exception {
        match self {
            Self::Exc(exc) => exc,
            Self::Return(_) => Exception::new(ExcType::ParseError, "'return' outside function"),
            Self::Break => Exception::new(ExcType::ParseError, "'break' outside loop"),
            Self::Continue => Exception::new(ExcType::ParseError, "'continue' outside loop"),
        }
    }
}
