//! The compile attempt orchestrator.
//!
//! [`Engine::run`] drives the incremental loop: parse the source, compile
//! it against the archive cache, and when the import scan comes back with
//! missing dependencies, fetch them as one batch, merge, and try again.
//! The loop suspends only on fetch I/O; every retry re-enters the same
//! compile path with the same mode, and a run that has been superseded by
//! a newer one discards its continuation instead of retrying.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crucible_lang::{Archive, ExecutionEvents, Host, Language};
use crucible_store::{ArchiveCache, FetchCoordinator, ImportScan};
use crucible_types::{
    EngineError, FormatError, Generation, OutputLine, OutputLog, PkgPath, RunMode, RunOutcome,
    RunReport,
};

/// File name the parser reports positions against.
const SOURCE_UNIT: &str = "prog";
/// Cache key for the locally compiled unit.
const MAIN_PKG: &str = "main";

/// Output display collaborator: receives the full current line sequence
/// on every change. `()` is the no-op sink.
pub trait OutputSink {
    fn update(&mut self, lines: &[OutputLine]);
}

impl OutputSink for () {
    fn update(&mut self, _lines: &[OutputLine]) {}
}

/// The orchestrator. Owns the archive cache, the fetch coordinator, and
/// the run generation counter; generic over the language services and
/// the host execution environment.
///
/// All cache mutation happens on the task driving [`Engine::run`]; the
/// mutex is the guard a multi-threaded runtime requires, not a
/// coordination mechanism.
pub struct Engine<L: Language, H: Host> {
    language: L,
    host: H,
    fetcher: FetchCoordinator,
    cache: Mutex<ArchiveCache<L::Archive>>,
    generation: AtomicU64,
    main_path: PkgPath,
}

impl<L: Language, H: Host> Engine<L, H> {
    #[must_use]
    pub fn new(language: L, host: H, fetcher: FetchCoordinator) -> Self {
        Self {
            language,
            host,
            fetcher,
            cache: Mutex::new(ArchiveCache::new()),
            generation: AtomicU64::new(0),
            main_path: PkgPath::new(MAIN_PKG).expect("\"main\" is a valid package path"),
        }
    }

    /// Run without observing intermediate output.
    pub async fn run(&self, source: &str, mode: RunMode) -> Result<RunReport, EngineError> {
        self.run_observed(source, mode, &mut ()).await
    }

    /// One compile attempt chain. Returns when the run is terminal:
    /// satisfied, failed, or superseded by a newer run.
    pub async fn run_observed(
        &self,
        source: &str,
        mode: RunMode,
        sink: &mut (dyn OutputSink + Send),
    ) -> Result<RunReport, EngineError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, load_only = mode.is_load_only(), "run started");

        let mut log = OutputLog::new();
        sink.update(log.lines());

        let ast = match self.language.parse(SOURCE_UNIT, source) {
            Ok(ast) => ast,
            Err(errors) => {
                for err in &errors {
                    log.push_error(err.message.clone());
                }
                sink.update(log.lines());
                tracing::debug!(count = errors.len(), "run aborted on syntax errors");
                return Ok(report(generation, RunOutcome::SyntaxErrors, log, None));
            }
        };

        loop {
            // The pending import set is fresh for every attempt.
            let (output, missing) = {
                let mut cache = self.cache.lock().await;
                let mut scan = ImportScan::new(&cache);
                let output = self.language.compile(MAIN_PKG, &ast, &mut scan);
                let missing = scan.into_missing();
                // Stored even when errored: a partial archive causes no
                // harm and keeps the retry path simple.
                cache.insert(self.main_path.clone(), output.archive.clone());
                (output, missing)
            };

            if !output.errors.is_empty() && missing.is_empty() {
                // No dependency pending, so this is a genuine compile
                // failure rather than a missing-import symptom.
                for err in &output.errors {
                    log.push_error(err.message.clone());
                }
                sink.update(log.lines());
                tracing::debug!(count = output.errors.len(), "run aborted on compile errors");
                return Ok(report(generation, RunOutcome::CompileErrors, log, None));
            }

            if !missing.is_empty() {
                tracing::debug!(count = missing.len(), "attempt suspended on missing imports");
                let mut pending = missing;
                while !pending.is_empty() {
                    let batch = match self.fetcher.fetch_all(&pending).await {
                        Ok(batch) => batch,
                        Err(err) => {
                            // A stale run's failure must not clobber the
                            // newer run's output either.
                            if self.generation.load(Ordering::SeqCst) != generation {
                                tracing::debug!(generation, "discarding superseded fetch failure");
                                return Ok(report(
                                    generation,
                                    RunOutcome::Superseded,
                                    OutputLog::new(),
                                    None,
                                ));
                            }
                            log.push_error(err.to_string());
                            sink.update(log.lines());
                            return Ok(report(generation, RunOutcome::FetchFailed, log, None));
                        }
                    };
                    if self.generation.load(Ordering::SeqCst) != generation {
                        // A newer run owns the output now; this batch's
                        // continuation is discarded, never retried.
                        tracing::debug!(generation, "discarding superseded fetch batch");
                        return Ok(report(
                            generation,
                            RunOutcome::Superseded,
                            OutputLog::new(),
                            None,
                        ));
                    }

                    let mut cache = self.cache.lock().await;
                    let mut scan = ImportScan::new(&cache);
                    let mut decoded = Vec::with_capacity(batch.len());
                    for (pkg_path, bytes) in &batch {
                        match self.language.decode(pkg_path, bytes.as_slice(), &mut scan) {
                            Ok(archive) => decoded.push((pkg_path.clone(), archive)),
                            Err(err) => {
                                // Re-check: the batch passed the guard
                                // above, but awaiting the cache lock is
                                // another suspension point.
                                if self.generation.load(Ordering::SeqCst) != generation {
                                    return Ok(report(
                                        generation,
                                        RunOutcome::Superseded,
                                        OutputLog::new(),
                                        None,
                                    ));
                                }
                                log.push_error(err.to_string());
                                sink.update(log.lines());
                                return Ok(report(
                                    generation,
                                    RunOutcome::DecodeFailed,
                                    log,
                                    None,
                                ));
                            }
                        }
                    }
                    // Misses the decode scan found are transitive
                    // dependencies; fetch them before the retry.
                    let mut next = scan.into_missing();
                    for (pkg_path, archive) in decoded {
                        cache.insert(pkg_path, archive);
                    }
                    next.retain(|p| !cache.contains(p));
                    pending = next;
                }
                // Every pending path is cached; re-enter the compile
                // attempt with the same mode.
                continue;
            }

            // Attempt satisfied.
            if mode.is_load_only() {
                tracing::debug!(generation, "load-only pass satisfied");
                return Ok(report(generation, RunOutcome::Loaded, log, None));
            }

            let program_archives = {
                let cache = self.cache.lock().await;
                link(&cache, &output.archive, &self.main_path)?
            };
            let generated = self.language.emit_unit(&output.archive);
            let program = self.language.emit_program(&program_archives);

            // Output restarts clean at the execution boundary; from here
            // on the log is append-only.
            log.clear();
            sink.update(log.lines());
            {
                let mut events = ProjectionEvents {
                    log: &mut log,
                    sink,
                };
                self.host.execute(&program, &mut events);
            }
            tracing::debug!(generation, "run executed");
            return Ok(report(generation, RunOutcome::Success, log, Some(generated)));
        }
    }

    /// Pure source-to-source format. The caller owns applying the result
    /// to its editor; failure must leave the source untouched.
    pub fn format(&self, source: &str) -> Result<String, FormatError> {
        self.language.format(source)
    }
}

fn report(
    generation: Generation,
    outcome: RunOutcome,
    log: OutputLog,
    generated: Option<String>,
) -> RunReport {
    RunReport {
        generation,
        outcome,
        lines: log.into_lines(),
        generated,
    }
}

/// Program link order: dependencies before dependents, main unit last.
///
/// Walks the main archive's recorded dependency list transitively
/// through the cache. A miss here is a defect, not a retry trigger: by
/// construction the retry only happens after every pending path was
/// cached.
fn link<A: Archive + Clone>(
    cache: &ArchiveCache<A>,
    main: &A,
    main_path: &PkgPath,
) -> Result<Vec<A>, EngineError> {
    let mut seen: HashSet<PkgPath> = HashSet::new();
    seen.insert(main_path.clone());
    let mut ordered = Vec::new();
    for dep in main.dependencies() {
        visit(dep, cache, &mut seen, &mut ordered)?;
    }
    ordered.push(main.clone());
    Ok(ordered)
}

fn visit<A: Archive + Clone>(
    path: &PkgPath,
    cache: &ArchiveCache<A>,
    seen: &mut HashSet<PkgPath>,
    ordered: &mut Vec<A>,
) -> Result<(), EngineError> {
    if !seen.insert(path.clone()) {
        return Ok(());
    }
    let archive = cache
        .get(path)
        .ok_or_else(|| EngineError::MissingDependency { path: path.clone() })?;
    for dep in archive.dependencies() {
        visit(dep, cache, seen, ordered)?;
    }
    ordered.push(archive.clone());
    Ok(())
}

/// Routes execution callbacks into the output projection: stdout chunks
/// through the newline-splitting log, faults as one prefixed error line.
struct ProjectionEvents<'a> {
    log: &'a mut OutputLog,
    sink: &'a mut (dyn OutputSink + Send),
}

impl ExecutionEvents for ProjectionEvents<'_> {
    fn stdout(&mut self, chunk: &[u8]) {
        self.log.append_stdout(chunk);
        self.sink.update(self.log.lines());
    }

    fn fault(&mut self, message: &str) {
        self.log.push_error(format!("panic: {message}"));
        self.sink.update(self.log.lines());
    }
}
