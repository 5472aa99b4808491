//! Line-oriented parser for Script source.

use crucible_types::{PkgPath, SyntaxError};

/// One statement, one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Use(PkgPath),
    Say(String),
    Put(String),
    Call(PkgPath),
    Panic(String),
    Comment(String),
    Blank,
}

/// A statement with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: u32,
    pub stmt: Stmt,
}

/// Parsed translation unit. Comments and blank lines are kept so the
/// formatter can reprint them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptAst {
    pub lines: Vec<Line>,
}

/// Parse a whole unit, collecting every syntax error before failing so
/// a single pass reports them all.
pub(super) fn parse(unit: &str, source: &str) -> Result<ScriptAst, Vec<SyntaxError>> {
    let mut lines = Vec::new();
    let mut errors = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let number = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
        match parse_line(unit, number, raw) {
            Ok(stmt) => lines.push(Line { number, stmt }),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(ScriptAst { lines })
    } else {
        Err(errors)
    }
}

fn parse_line(unit: &str, number: u32, raw: &str) -> Result<Stmt, SyntaxError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Stmt::Blank);
    }
    if let Some(comment) = trimmed.strip_prefix('#') {
        return Ok(Stmt::Comment(comment.trim().to_string()));
    }

    let (directive, operand) = match trimmed.split_once(char::is_whitespace) {
        Some((d, rest)) => (d, rest.trim()),
        None => (trimmed, ""),
    };

    match directive {
        "use" => parse_path(unit, number, "use", operand).map(Stmt::Use),
        "call" => parse_path(unit, number, "call", operand).map(Stmt::Call),
        "say" => Ok(Stmt::Say(operand.to_string())),
        "put" => Ok(Stmt::Put(operand.to_string())),
        "panic" => Ok(Stmt::Panic(operand.to_string())),
        other => Err(SyntaxError::new(format!(
            "{unit}:{number}: unknown directive `{other}`"
        ))),
    }
}

fn parse_path(unit: &str, number: u32, directive: &str, operand: &str) -> Result<PkgPath, SyntaxError> {
    if operand.is_empty() {
        return Err(SyntaxError::new(format!(
            "{unit}:{number}: `{directive}` requires a package path"
        )));
    }
    PkgPath::new(operand).map_err(|err| {
        SyntaxError::new(format!("{unit}:{number}: invalid package path: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::{Stmt, parse};
    use crucible_types::PkgPath;

    #[test]
    fn statements_parse_with_line_numbers() {
        let ast = parse("prog", "use fmt\nsay hello  world\nput x\npanic\n").unwrap();
        assert_eq!(ast.lines[0].number, 1);
        assert_eq!(
            ast.lines[0].stmt,
            Stmt::Use(PkgPath::new("fmt").unwrap())
        );
        assert_eq!(ast.lines[1].stmt, Stmt::Say("hello  world".to_string()));
        assert_eq!(ast.lines[2].stmt, Stmt::Put("x".to_string()));
        assert_eq!(ast.lines[3].stmt, Stmt::Panic(String::new()));
    }

    #[test]
    fn invalid_package_path_is_a_syntax_error() {
        let errs = parse("prog", "use a b\n").unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.starts_with("prog:1: invalid package path"));
    }

    #[test]
    fn error_messages_carry_unit_and_line() {
        let errs = parse("prog", "\n\nnope\n").unwrap_err();
        assert_eq!(errs[0].message, "prog:3: unknown directive `nope`");
    }
}
