//! Output handling for the `print()` builtin and host-directed capture.

use std::io::{self, Write as _};

use crate::exception::{ExcType, Exception};

/// Trait for handling output from the `print()` builtin.
///
/// Implement this to capture or redirect print output from sandboxed code.
/// The default implementation [`StdPrint`] writes to stdout.
pub trait PrintWriter {
    /// Writes one formatted fragment, without separators or terminators.
    fn write_str(&mut self, output: &str) -> Result<(), Exception>;

    /// Writes a single separator or terminator character.
    fn push(&mut self, end: char) -> Result<(), Exception>;
}

/// Default writer: straight to stdout.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write_str(&mut self, output: &str) -> Result<(), Exception> {
        io::stdout().write_all(output.as_bytes()).map_err(io_error)
    }

    fn push(&mut self, end: char) -> Result<(), Exception> {
        let mut buf = [0u8; 4];
        io::stdout().write_all(end.encode_utf8(&mut buf).as_bytes()).map_err(io_error)
    }
}

/// Writer that collects all output into a string.
///
/// Useful for testing or capturing print output programmatically.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn output(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_str(&mut self, output: &str) -> Result<(), Exception> {
        self.0.push_str(output);
        Ok(())
    }

    fn push(&mut self, end: char) -> Result<(), Exception> {
        self.0.push(end);
        Ok(())
    }
}

/// Writer that ignores all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_str(&mut self, _output: &str) -> Result<(), Exception> {
        Ok(())
    }

    fn push(&mut self, _end: char) -> Result<(), Exception> {
        Ok(())
    }
}

/// Bridges an arbitrary `io::Write` into the print pipeline, for hosts that
/// redirect output to their own sinks.
pub struct WriterPrint(Box<dyn io::Write>);

impl WriterPrint {
    pub fn new(writer: impl io::Write + 'static) -> Self {
        Self(Box::new(writer))
    }
}

impl PrintWriter for WriterPrint {
    fn write_str(&mut self, output: &str) -> Result<(), Exception> {
        self.0.write_all(output.as_bytes()).map_err(io_error)
    }

    fn push(&mut self, end: char) -> Result<(), Exception> {
        let mut buf = [0u8; 4];
        self.0.write_all(end.encode_utf8(&mut buf).as_bytes()).map_err(io_error)
    }
}

/// The interpreter's active output sink.
///
/// Modeled as an enum rather than a boxed trait so `get_output()` can reach
/// the capture buffer without downcasting.
pub(crate) enum OutputSink {
    Std(StdPrint),
    Capture(CollectStringPrint),
    Custom(Box<dyn PrintWriter>),
}

impl OutputSink {
    pub(crate) fn captured(&self) -> Option<&str> {
        match self {
            Self::Capture(collect) => Some(collect.output()),
            _ => None,
        }
    }

    pub(crate) fn clear_captured(&mut self) {
        if let Self::Capture(collect) = self {
            collect.0.clear();
        }
    }
}

impl PrintWriter for OutputSink {
    fn write_str(&mut self, output: &str) -> Result<(), Exception> {
        match self {
            Self::Std(w) => w.write_str(output),
            Self::Capture(w) => w.write_str(output),
            Self::Custom(w) => w.write_str(output),
        }
    }

    fn push(&mut self, end: char) -> Result<(), Exception> {
        match self {
            Self::Std(w) => w.push(end),
            Self::Capture(w) => w.push(end),
            Self::Custom(w) => w.push(end),
        }
    }
}

fn io_error(err: io::Error) -> Exception {
    Exception::new(ExcType::RuntimeError, format!("output write failed: {err}"))
}
