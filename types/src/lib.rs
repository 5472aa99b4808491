//! Core domain types for Crucible - no IO, no async.
//!
//! Everything the compile loop passes between crates lives here: package
//! paths, the output log and its projection rules, run modes and outcomes,
//! and the error taxonomy shared by the language, store, and engine crates.

mod errors;
mod output;
mod path;
mod run;

pub use errors::{
    CompileError, DecodeError, EngineError, FetchError, FormatError, SyntaxError,
};
pub use output::{OutputKind, OutputLine, OutputLog};
pub use path::{PkgPath, PkgPathError};
pub use run::{Generation, RunMode, RunOutcome, RunReport};
