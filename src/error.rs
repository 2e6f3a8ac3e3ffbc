use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A log source that could not be opened or fully drained.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to read {path:?} after {lines} lines: {source}")]
    Read {
        path: PathBuf,
        lines: u64,
        source: io::Error,
    },

    #[error("failed to list log directory {path:?}: {source}")]
    ListDir { path: PathBuf, source: io::Error },
}

/// Failure while reading input: either the source itself or a cancelled run.
#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid date format pattern {pattern:?}")]
    InvalidPattern { pattern: String },

    #[error("line {line}: expected `<access|error>: <pattern>`, got {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("line {line}: unknown format kind {kind:?}")]
    UnknownKind { line: usize, kind: String },

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<FormatError>,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to render {document}: {message}")]
    Render { document: String, message: String },

    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// The run was cancelled, either by the user or by an expired deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run cancelled")]
pub struct Cancelled;
