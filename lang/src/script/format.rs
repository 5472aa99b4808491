//! Canonicalizing formatter for Script source.
//!
//! Formatting parses first, so malformed source is rejected untouched;
//! the canonical form trims statements, collapses runs of blank lines,
//! and always ends with a single newline. The output is a fixed point:
//! formatting it again changes nothing.

use crucible_types::FormatError;

use super::ast::{self, Stmt};

pub(super) fn format(source: &str) -> Result<String, FormatError> {
    let ast = ast::parse("prog", source)
        .map_err(|errs| match errs.into_iter().next() {
            Some(first) => FormatError::new(first.message),
            None => FormatError::new("unparsable source"),
        })?;

    let mut out = String::new();
    let mut pending_blank = false;
    for line in &ast.lines {
        match &line.stmt {
            Stmt::Blank => {
                // Collapse runs; drop leading blanks entirely.
                if !out.is_empty() {
                    pending_blank = true;
                }
            }
            stmt => {
                if pending_blank {
                    out.push('\n');
                    pending_blank = false;
                }
                out.push_str(&print_stmt(stmt));
                out.push('\n');
            }
        }
    }
    Ok(out)
}

fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Use(path) => format!("use {path}"),
        Stmt::Call(path) => format!("call {path}"),
        Stmt::Say(text) => directive("say", text),
        Stmt::Put(text) => directive("put", text),
        Stmt::Panic(text) => directive("panic", text),
        Stmt::Comment(text) => {
            if text.is_empty() {
                "#".to_string()
            } else {
                format!("# {text}")
            }
        }
        Stmt::Blank => String::new(),
    }
}

fn directive(name: &str, operand: &str) -> String {
    if operand.is_empty() {
        name.to_string()
    } else {
        format!("{name} {operand}")
    }
}
