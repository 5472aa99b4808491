//! Crucible CLI - file-backed front end for the compile loop.
//!
//! The binary plays the collaborator roles the core deliberately
//! excludes: it is the editor (source comes from a file, `fmt --write`
//! replaces it) and the output display (error lines go to stderr,
//! stdout lines to stdout).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use crucible_engine::Engine;
use crucible_lang::{Language, ScriptLanguage, ScriptRuntime};
use crucible_store::{ArchiveStore, FetchCoordinator};
use crucible_types::{FormatError, OutputKind, RunMode, RunReport};

#[derive(Parser)]
#[command(name = "crucible", version, about = "Compile and run a Script program, fetching missing dependencies on demand")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and execute a program.
    Run {
        /// Source file.
        file: PathBuf,
        /// Base URL of the remote archive store.
        #[arg(long, default_value = "http://localhost:8080/")]
        store: Url,
        /// Warm the dependency cache without executing.
        #[arg(long)]
        load_only: bool,
        /// Print the generated source for the main unit after the run.
        #[arg(long)]
        show_generated: bool,
    },
    /// Canonically format a source file.
    Fmt {
        /// Source file.
        file: PathBuf,
        /// Replace the file instead of printing to stdout.
        #[arg(long)]
        write: bool,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            file,
            store,
            load_only,
            show_generated,
        } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let store = ArchiveStore::new(store).context("cannot build store client")?;
            let engine = Engine::new(
                ScriptLanguage::new(),
                ScriptRuntime::new(),
                FetchCoordinator::new(store),
            );
            let mode = if load_only {
                RunMode::LoadOnly
            } else {
                RunMode::Full
            };
            let report = engine.run(&source, mode).await?;
            print_report(&report, show_generated);
            if report.outcome.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Fmt { file, write } => match format_file(&file, write)? {
            FmtOutcome::Formatted(formatted) => {
                if !write {
                    print!("{formatted}");
                }
                Ok(ExitCode::SUCCESS)
            }
            FmtOutcome::Rejected(err) => {
                eprintln!("{err}");
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

enum FmtOutcome {
    Formatted(String),
    Rejected(FormatError),
}

/// Canonically format one file. Rejection leaves the file untouched; a
/// clean format rewrites it only when `write` is set.
fn format_file(file: &Path, write: bool) -> Result<FmtOutcome> {
    let source =
        fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?;
    match ScriptLanguage::new().format(&source) {
        Ok(formatted) => {
            if write {
                fs::write(file, &formatted)
                    .with_context(|| format!("cannot write {}", file.display()))?;
            }
            Ok(FmtOutcome::Formatted(formatted))
        }
        Err(err) => Ok(FmtOutcome::Rejected(err)),
    }
}

fn print_report(report: &RunReport, show_generated: bool) {
    for line in &report.lines {
        match line.kind {
            OutputKind::Stdout => println!("{}", line.text),
            OutputKind::Error => eprintln!("{}", line.text),
        }
    }
    if show_generated {
        if let Some(generated) = &report.generated {
            print!("{generated}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{FmtOutcome, format_file};

    #[test]
    fn fmt_write_replaces_the_file_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.script");
        fs::write(&file, "  say   hi \n\n\nsay bye\n").unwrap();

        let outcome = format_file(&file, true).unwrap();
        assert!(matches!(outcome, FmtOutcome::Formatted(_)));
        assert_eq!(fs::read_to_string(&file).unwrap(), "say hi\n\nsay bye\n");
    }

    #[test]
    fn fmt_without_write_leaves_the_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.script");
        fs::write(&file, "  say hi\n").unwrap();

        match format_file(&file, false).unwrap() {
            FmtOutcome::Formatted(text) => assert_eq!(text, "say hi\n"),
            FmtOutcome::Rejected(_) => panic!("formatting should succeed"),
        }
        assert_eq!(fs::read_to_string(&file).unwrap(), "  say hi\n");
    }

    #[test]
    fn fmt_rejection_leaves_the_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.script");
        fs::write(&file, "bogus\nsay ok\n").unwrap();

        match format_file(&file, true).unwrap() {
            FmtOutcome::Rejected(err) => {
                assert_eq!(err.message, "prog:1: unknown directive `bogus`");
            }
            FmtOutcome::Formatted(_) => panic!("formatting should fail"),
        }
        assert_eq!(fs::read_to_string(&file).unwrap(), "bogus\nsay ok\n");
    }
}
