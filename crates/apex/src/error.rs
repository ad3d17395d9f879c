//! Source locations and the per-stage error types shared by every pipeline stage.
//!
//! Mirrors the teacher's `ReplError` split: each stage (lex/parse, compile,
//! runtime) gets its own error type, and a top-level enum wraps them with
//! `From` impls so callers can use `?` across stage boundaries.

use std::fmt;

/// A location in source text, attached to tokens, AST nodes, and instructions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SrcLoc {
    pub line: u32,
    pub filename: String,
}

impl SrcLoc {
    #[must_use]
    pub fn new(line: u32, filename: impl Into<String>) -> Self {
        Self {
            line,
            filename: filename.into(),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self {
            line: 0,
            filename: String::new(),
        }
    }
}

impl fmt::Display for SrcLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filename.is_empty() {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "{}:{}", self.filename, self.line)
        }
    }
}

/// A syntax error raised while lexing or parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub srcloc: SrcLoc,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: syntax error: {}", self.srcloc, self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// An error raised while compiling an AST to bytecode (e.g. `break` outside a loop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub srcloc: SrcLoc,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: compile error: {}", self.srcloc, self.message)
    }
}

impl std::error::Error for CompileError {}

/// One frame of the call-frame trace attached to a runtime error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub fn_name: String,
    pub srcloc: SrcLoc,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  at {} ({})", self.fn_name, self.srcloc)
    }
}

/// An error raised by the VM's dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub srcloc: SrcLoc,
    pub message: String,
    pub trace: Vec<TraceFrame>,
}

impl RuntimeError {
    #[must_use]
    pub fn new(srcloc: SrcLoc, message: impl Into<String>) -> Self {
        Self {
            srcloc,
            message: message.into(),
            trace: Vec::new(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: runtime error: {}", self.srcloc, self.message)?;
        for frame in &self.trace {
            writeln!(f, "{frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Top-level error type covering the whole source-to-result pipeline.
///
/// Kept separate from `FatalError` (out-of-memory, spec.md §7) which this
/// implementation does not model explicitly: allocation failure in Rust
/// aborts the process rather than surfacing as a typed error, which satisfies
/// the spec's "terminates the process" requirement without a dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApexError {
    Syntax(SyntaxError),
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl fmt::Display for ApexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(e) => write!(f, "{e}"),
            Self::Compile(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApexError {}

impl From<SyntaxError> for ApexError {
    fn from(e: SyntaxError) -> Self {
        Self::Syntax(e)
    }
}

impl From<CompileError> for ApexError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<RuntimeError> for ApexError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}
