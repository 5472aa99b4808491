//! Interpreter host for emitted Script program images.

use std::collections::HashMap;

use super::archive::{Op, ScriptArchive};
use crate::{ExecutionEvents, Host};

/// Guards against runaway `call` chains in hand-crafted archives.
const MAX_CALL_DEPTH: usize = 64;

/// Executes a program image (the JSON blob produced by
/// `ScriptLanguage::emit_program`). All stdout and every fault are
/// routed through [`ExecutionEvents`]; nothing unwinds into the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptRuntime;

impl ScriptRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Host for ScriptRuntime {
    fn execute(&self, program: &str, events: &mut dyn ExecutionEvents) {
        let archives: Vec<ScriptArchive> = match serde_json::from_str(program) {
            Ok(archives) => archives,
            Err(err) => {
                events.fault(&format!("malformed program image: {err}"));
                return;
            }
        };
        // The main unit is serialized last, after its dependencies.
        let Some(main) = archives.last() else {
            events.fault("empty program image");
            return;
        };
        let index: HashMap<&str, &ScriptArchive> =
            archives.iter().map(|a| (a.name.as_str(), a)).collect();
        run_archive(main, &index, events, 0);
    }
}

/// Returns false once a fault has stopped execution.
fn run_archive(
    archive: &ScriptArchive,
    index: &HashMap<&str, &ScriptArchive>,
    events: &mut dyn ExecutionEvents,
    depth: usize,
) -> bool {
    if depth > MAX_CALL_DEPTH {
        events.fault("call depth exceeded");
        return false;
    }
    for op in &archive.ops {
        match op {
            Op::Say(text) => {
                let mut line = text.clone();
                line.push('\n');
                events.stdout(line.as_bytes());
            }
            Op::Put(text) => events.stdout(text.as_bytes()),
            Op::Panic(message) => {
                events.fault(message);
                return false;
            }
            Op::Call(path) => match index.get(path.as_str()) {
                Some(dep) => {
                    if !run_archive(dep, index, events, depth + 1) {
                        return false;
                    }
                }
                None => {
                    // Unreachable for engine-built images; defends
                    // against hand-crafted blobs.
                    events.fault(&format!("call to unknown package \"{path}\""));
                    return false;
                }
            },
        }
    }
    true
}
