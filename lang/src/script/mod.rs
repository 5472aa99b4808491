//! The reference "Script" language.
//!
//! A small line-oriented language, just enough to exercise the whole
//! loop end to end: imports that may be missing from the cache, compile
//! diagnostics, a JSON archive wire format, stdout-producing execution,
//! runtime faults, and a canonicalizing formatter.
//!
//! ```text
//! # greet the world
//! use fmt
//! put Hello,
//! say  playground
//! call fmt
//! ```

mod archive;
mod ast;
mod exec;
mod format;

pub use archive::{Op, ScriptArchive};
pub use ast::{ScriptAst, Stmt};
pub use exec::ScriptRuntime;

use crucible_types::{CompileError, DecodeError, FormatError, PkgPath, SyntaxError};

use crate::{CompileOutput, ImportResolver, Language};

/// Parser, compiler, codec and formatter for Script programs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptLanguage;

impl ScriptLanguage {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Language for ScriptLanguage {
    type Ast = ScriptAst;
    type Archive = ScriptArchive;

    fn parse(&self, unit: &str, source: &str) -> Result<ScriptAst, Vec<SyntaxError>> {
        ast::parse(unit, source)
    }

    fn compile(
        &self,
        unit: &str,
        ast: &ScriptAst,
        imports: &mut dyn ImportResolver<ScriptArchive>,
    ) -> CompileOutput<ScriptArchive> {
        let mut deps: Vec<PkgPath> = Vec::new();
        let mut ops: Vec<Op> = Vec::new();
        let mut errors: Vec<CompileError> = Vec::new();

        for line in &ast.lines {
            match &line.stmt {
                Stmt::Use(path) => {
                    if deps.contains(path) {
                        errors.push(CompileError::new(format!(
                            "{unit}:{}: duplicate import \"{path}\"",
                            line.number
                        )));
                        continue;
                    }
                    // Misses are recorded by the resolver; compilation
                    // proceeds speculatively so one pass surfaces every
                    // missing dependency.
                    let _ = imports.resolve(path);
                    deps.push(path.clone());
                }
                Stmt::Call(path) => {
                    if deps.contains(path) {
                        ops.push(Op::Call(path.clone()));
                    } else {
                        errors.push(CompileError::new(format!(
                            "{unit}:{}: package \"{path}\" not imported",
                            line.number
                        )));
                    }
                }
                Stmt::Say(text) => ops.push(Op::Say(text.clone())),
                Stmt::Put(text) => ops.push(Op::Put(text.clone())),
                Stmt::Panic(text) => ops.push(Op::Panic(text.clone())),
                Stmt::Comment(_) | Stmt::Blank => {}
            }
        }

        tracing::debug!(
            unit,
            deps = deps.len(),
            ops = ops.len(),
            errors = errors.len(),
            "compiled script unit"
        );

        CompileOutput {
            archive: ScriptArchive {
                name: unit.to_string(),
                deps,
                ops,
            },
            errors,
        }
    }

    fn decode(
        &self,
        path: &PkgPath,
        bytes: &[u8],
        imports: &mut dyn ImportResolver<ScriptArchive>,
    ) -> Result<ScriptArchive, DecodeError> {
        let archive: ScriptArchive = serde_json::from_slice(bytes)
            .map_err(|err| DecodeError::new(path.clone(), err.to_string()))?;
        if archive.name != path.as_str() {
            return Err(DecodeError::new(
                path.clone(),
                format!("archive names itself \"{}\"", archive.name),
            ));
        }
        // Resolve transitive references through the same cache so the
        // batch that follows also covers the archive's own imports.
        for dep in &archive.deps {
            let _ = imports.resolve(dep);
        }
        Ok(archive)
    }

    fn emit_program(&self, archives: &[ScriptArchive]) -> String {
        match serde_json::to_string(archives) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::error!(%err, "program image serialization failed");
                String::from("[]")
            }
        }
    }

    fn emit_unit(&self, archive: &ScriptArchive) -> String {
        archive.listing()
    }

    fn format(&self, source: &str) -> Result<String, FormatError> {
        format::format(source)
    }
}
