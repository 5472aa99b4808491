//! Error taxonomy for the compile loop.
//!
//! Parse and compile diagnostics come in lists and are projected in their
//! original order; fetch, decode and format failures are single errors
//! that terminate the run they belong to.

use thiserror::Error;

use crate::path::PkgPath;

/// One parse-time diagnostic. The message is the full text the parser
/// reported, position included, and is rendered verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One semantic/compile-time diagnostic, rendered verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A failed archive retrieval. Only the first failure of a batch is
/// ever reported, and it aborts the whole retry chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("cannot load package \"{path}\"")]
    Status { path: PkgPath, status: u16 },
    #[error("cannot load package \"{path}\": {reason}")]
    Transport { path: PkgPath, reason: String },
}

impl FetchError {
    #[must_use]
    pub fn path(&self) -> &PkgPath {
        match self {
            Self::Status { path, .. } | Self::Transport { path, .. } => path,
        }
    }
}

/// Malformed archive bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode archive \"{path}\": {reason}")]
pub struct DecodeError {
    pub path: PkgPath,
    pub reason: String,
}

impl DecodeError {
    pub fn new(path: PkgPath, reason: impl Into<String>) -> Self {
        Self {
            path,
            reason: reason.into(),
        }
    }
}

/// The formatter rejected its input. The source text is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FormatError {
    pub message: String,
}

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Internal defects of the loop itself, as opposed to diagnostics about
/// the user's program. A dependency missing from the cache after a batch
/// settled can only mean the loop's own bookkeeping is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("dependency \"{path}\" missing from cache after fetch")]
    MissingDependency { path: PkgPath },
}
