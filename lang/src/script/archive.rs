//! The Script archive: compiled form of one package, JSON on the wire.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crucible_types::PkgPath;

use crate::Archive;

/// One executable operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum Op {
    /// Write text plus newline to stdout.
    Say(String),
    /// Write text with no newline.
    Put(String),
    /// Run an imported package's body inline.
    Call(PkgPath),
    /// Raise a runtime fault.
    Panic(String),
}

/// Compiled form of one Script package. Both the `.a` payload served by
/// the remote store and each element of the emitted program image are
/// this structure serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptArchive {
    pub name: String,
    pub deps: Vec<PkgPath>,
    pub ops: Vec<Op>,
}

impl ScriptArchive {
    /// Human-readable generated-source listing for display.
    #[must_use]
    pub fn listing(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# package {}", self.name);
        if !self.deps.is_empty() {
            let deps: Vec<&str> = self.deps.iter().map(PkgPath::as_str).collect();
            let _ = writeln!(out, "# deps: {}", deps.join(", "));
        }
        for op in &self.ops {
            match op {
                Op::Say(text) => {
                    let _ = writeln!(out, "say {text}");
                }
                Op::Put(text) => {
                    let _ = writeln!(out, "put {text}");
                }
                Op::Call(path) => {
                    let _ = writeln!(out, "call {path}");
                }
                Op::Panic(text) => {
                    let _ = writeln!(out, "panic {text}");
                }
            }
        }
        out
    }
}

impl Archive for ScriptArchive {
    fn dependencies(&self) -> &[PkgPath] {
        &self.deps
    }
}
