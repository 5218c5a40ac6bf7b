//! Seams to the host runtime that produces code objects.

use std::borrow::Cow;

use thiserror::Error;

use crate::code::CodeObject;
use crate::error::DisError;

/// A source string the host compiler rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filename}:{}: {message}", .line.map_or_else(|| "?".to_string(), |l| l.to_string()))]
pub struct CompileError {
    pub filename: String,
    pub line: Option<u32>,
    pub message: String,
}

/// Turns source text into a code object. Supplied by the host.
pub trait Compiler {
    fn compile(&self, source: &str, filename: &str) -> Result<CodeObject, CompileError>;
}

/// Anything that owns a compiled body: functions, bound methods.
pub trait HasCode {
    fn code(&self) -> &CodeObject;
}

impl HasCode for CodeObject {
    fn code(&self) -> &CodeObject {
        self
    }
}

/// What to disassemble.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Code(&'a CodeObject),
    Function(&'a dyn HasCode),
    Source(&'a str),
}

impl<'a> Target<'a> {
    /// Filename handed to the compiler for source targets.
    pub const SOURCE_FILENAME: &'static str = "<string>";

    /// The code object for this target, compiling source text if needed.
    pub fn code_object(self, compiler: &dyn Compiler) -> Result<Cow<'a, CodeObject>, DisError> {
        match self {
            Target::Code(code) => Ok(Cow::Borrowed(code)),
            Target::Function(f) => Ok(Cow::Borrowed(f.code())),
            Target::Source(src) => compiler
                .compile(src, Self::SOURCE_FILENAME)
                .map(Cow::Owned)
                .map_err(DisError::from),
        }
    }
}

impl<'a> From<&'a CodeObject> for Target<'a> {
    fn from(code: &'a CodeObject) -> Self {
        Target::Code(code)
    }
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(src: &'a str) -> Self {
        Target::Source(src)
    }
}

/// Compiler for hosts that cannot compile source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompiler;

impl Compiler for NoCompiler {
    fn compile(&self, _source: &str, filename: &str) -> Result<CodeObject, CompileError> {
        Err(CompileError {
            filename: filename.to_string(),
            line: None,
            message: "no compiler available".to_string(),
        })
    }
}
