//! Error types for argument parsing, command validation and execution.
//!
//! Errors fall into two groups. Fatal errors ([`LinkError`]) stop the command
//! before or during the run and are reported once by the binary. Per-line
//! errors ([`LineError`]) are logged by the executor and the offending line is
//! skipped.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A structurally invalid option token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// An option token of exactly `--`.
    #[error("Invalid argument '{0}'.")]
    BareOption(String),
    /// The same `--name` given twice.
    #[error("Invalid argument '{0}'.")]
    DuplicateOption(String),
    /// An option the command does not recognize.
    #[error("Invalid argument '{0}'.")]
    UnknownOption(String),
    /// A process argument that is not valid Unicode, shown lossily.
    #[error("Invalid argument '{0}'.")]
    NotUnicode(String),
}

/// Arguments parsed fine but do not fit the command's grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The syntax of the command is incorrect.")]
pub struct UsageError;

/// A pattern that failed to compile.
#[derive(Debug, Clone, Error)]
#[error("invalid pattern '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// A recoverable failure while handling a single input line.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{}' already exists", .0.display())]
    DestinationExists(PathBuf),
}

impl LineError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that terminate a command.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Arg(#[from] ArgError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("could not find '{}'", .0.display())]
    MissingPath(PathBuf),

    #[error("{0}")]
    OutOfRange(&'static str),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        LinkError::Io {
            context: context.into(),
            source,
        }
    }

    /// Argument and usage errors are followed by a pointer to `--h`.
    pub fn wants_help_hint(&self) -> bool {
        matches!(self, LinkError::Arg(_) | LinkError::Usage(_))
    }
}

/// Result alias for command construction and execution.
pub type Result<T> = std::result::Result<T, LinkError>;
