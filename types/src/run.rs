//! Run modes, outcomes, and the per-run report.

use crate::output::OutputLine;

/// Monotonic run counter. A fetch batch whose run generation is no
/// longer current is discarded instead of retried.
pub type Generation = u64;

/// Distinguishes a silent dependency warm-up pass from a full run that
/// also emits and executes code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Warm the cache only; never emit or execute.
    LoadOnly,
    /// Compile, emit, and execute.
    Full,
}

impl RunMode {
    #[must_use]
    pub const fn is_load_only(self) -> bool {
        matches!(self, Self::LoadOnly)
    }
}

/// Terminal state of one `run` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Full run compiled and executed.
    Success,
    /// Load-only run satisfied all dependencies.
    Loaded,
    /// Parse failed; the log holds every syntax error in order.
    SyntaxErrors,
    /// Compile failed with no dependency pending; the log holds every
    /// compile error in order.
    CompileErrors,
    /// A fetch in the batch failed; the log holds exactly one line
    /// naming the failing package.
    FetchFailed,
    /// A fetched archive would not decode.
    DecodeFailed,
    /// A newer run started while this one awaited a fetch batch; its
    /// output is not authoritative and was discarded.
    Superseded,
}

impl RunOutcome {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Loaded)
    }
}

/// The value a `run` invocation returns to its caller: the outcome, the
/// final output log, and the generated source for the main unit when a
/// full run reached emission.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub generation: Generation,
    pub outcome: RunOutcome,
    pub lines: Vec<OutputLine>,
    pub generated: Option<String>,
}
