//! Language collaborator contracts for the compile loop.
//!
//! The engine treats the parser, compiler, archive codec, formatter and
//! host execution environment as opaque services behind the [`Language`]
//! and [`Host`] traits. The reference [`script`] language implements all
//! of them and is what the CLI and the integration tests run against.

use crucible_types::{CompileError, DecodeError, FormatError, PkgPath, SyntaxError};

pub mod script;

pub use script::{ScriptLanguage, ScriptRuntime};

/// Read side of the archive cache, as seen by a compile or decode pass.
///
/// `resolve` returns the cached archive for `path` if present. A miss is
/// recorded by the implementation so that one pass surfaces every
/// missing dependency at once; the caller proceeds speculatively past a
/// `None` instead of failing on the first unresolved import.
pub trait ImportResolver<A> {
    fn resolve(&mut self, path: &PkgPath) -> Option<A>;
}

/// Result of one compile pass.
///
/// An archive is always produced, even alongside errors: a partial
/// archive causes no harm in the cache and keeps the retry path simple.
#[derive(Debug, Clone)]
pub struct CompileOutput<A> {
    pub archive: A,
    pub errors: Vec<CompileError>,
}

/// A compiled-unit artifact: opaque to the engine except for its
/// recorded dependency list.
pub trait Archive {
    fn dependencies(&self) -> &[PkgPath];
}

/// The language services the orchestrator drives.
pub trait Language {
    type Ast;
    type Archive: Archive + Clone + Send + Sync + 'static;

    /// Parse one translation unit. On failure, every syntax error is
    /// returned in source order.
    fn parse(&self, unit: &str, source: &str) -> Result<Self::Ast, Vec<SyntaxError>>;

    /// Compile a parsed unit against the resolver. Missing imports are
    /// recorded by the resolver as a side effect of this call.
    fn compile(
        &self,
        unit: &str,
        ast: &Self::Ast,
        imports: &mut dyn ImportResolver<Self::Archive>,
    ) -> CompileOutput<Self::Archive>;

    /// Decode a fetched archive. Transitive references inside the
    /// archive resolve through the same resolver, so decode can surface
    /// further missing dependencies.
    fn decode(
        &self,
        path: &PkgPath,
        bytes: &[u8],
        imports: &mut dyn ImportResolver<Self::Archive>,
    ) -> Result<Self::Archive, DecodeError>;

    /// Serialize a whole program (dependencies first, main unit last)
    /// into one executable text blob.
    fn emit_program(&self, archives: &[Self::Archive]) -> String;

    /// Serialize one archive into human-readable generated source.
    fn emit_unit(&self, archive: &Self::Archive) -> String;

    /// Pure source-to-source formatter. Idempotent on its own output.
    fn format(&self, source: &str) -> Result<String, FormatError>;
}

/// Callbacks from the host execution environment back into the core:
/// stdout byte chunks and uncaught runtime faults.
pub trait ExecutionEvents {
    fn stdout(&mut self, chunk: &[u8]);
    fn fault(&mut self, message: &str);
}

/// Host execution environment. Executes an emitted program blob inside
/// a guarded region: faults are routed to [`ExecutionEvents::fault`]
/// and never unwind into the caller.
pub trait Host {
    fn execute(&self, program: &str, events: &mut dyn ExecutionEvents);
}
