//! Structured interpreter error shared across the crate.
//!
//! [`NcError`] is serialized to `{ kind, line, message, context }` JSON
//! payloads so embedding applications can pattern-match on a stable `kind`
//! string.

use serde::Serialize;

/// Classification of an interpreter failure.
///
/// Serialized as a snake_case string (`"code_error"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// More than one G-code of the same modal group appeared on one block.
    TooManyGcodeOfOneGroup,
    /// A semantic error in the program: unknown variable, bad arc geometry,
    /// out-of-range tool number, exceeded step budget, …
    CodeError,
    /// A controller call addressed a canal index that is not configured.
    SelectedCanalDoesNotExist,
    /// A failure caught at the canal boundary (parser, configuration) and
    /// wrapped so callers see one error shape.
    ErrorInACanal,
    /// A cross-canal wait code had no counterpart. Reserved; canal
    /// synchronisation is not implemented.
    WaitCodeNotMatch,
}

/// Structured error produced by handlers, the engine, and the controller.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[error("{message} (line {line})")]
pub struct NcError {
    pub kind: ErrorKind,
    /// Source line index the error refers to; `-1` when not tied to a line.
    pub line: i64,
    /// Human-readable description.
    pub message: String,
    /// Free-form context: offending token, canal name, raw block text.
    pub context: String,
}

impl NcError {
    pub fn new(
        kind: ErrorKind,
        line: i64,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        NcError {
            kind,
            line,
            message: message.into(),
            context: context.into(),
        }
    }

    /// Shortcut for the most common kind: a semantic program error.
    pub fn code(line: i64, message: impl Into<String>) -> Self {
        NcError::new(ErrorKind::CodeError, line, message, "")
    }

    /// Same as [`NcError::code`] with an offending-token context attached.
    pub fn code_in(line: i64, message: impl Into<String>, context: impl Into<String>) -> Self {
        NcError::new(ErrorKind::CodeError, line, message, context)
    }
}
