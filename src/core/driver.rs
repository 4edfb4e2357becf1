//! Purpose: Orchestrate one harness run: load the solver, enumerate cases, submit in order.
//! Exports: `run`, `list`, `RunOptions`, `RunReport`, `RunState`, `FaultPolicy`.
//! Role: Case-discovery-and-dispatch loop shared by the CLI and tests.
//! Invariants: The solver is loaded before the case directory is read; load happens once.
//! Invariants: Cases are submitted strictly one after another in name order; never retried.
//! Invariants: Under `FaultPolicy::Abort` the first submit error ends the run.
use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::core::cases::{CaseSet, load_cases};
use crate::core::error::{Error, ErrorKind};
use crate::core::gateway::Solver;
use crate::core::report::Reporter;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunState {
    NotLoaded,
    Loaded,
    Processing(usize),
    Done,
    Aborted,
}

/// What a `BoundaryFault` from `submit` does to the rest of the run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FaultPolicy {
    #[default]
    Abort,
    /// Record the fault against the case and move on. Only meaningful when
    /// the solver can survive a faulting callee (see `isolate`).
    Continue,
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub cases_dir: PathBuf,
    pub filter: Option<String>,
    pub fault_policy: FaultPolicy,
}

impl RunOptions {
    pub fn new(cases_dir: impl Into<PathBuf>) -> Self {
        Self {
            cases_dir: cases_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunReport {
    pub total: usize,
    pub forwarded: usize,
    pub faulted: Vec<String>,
    pub state: RunState,
}

struct Run {
    state: RunState,
}

impl Run {
    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    fn abort(&mut self, err: Error) -> Error {
        self.transition(RunState::Aborted);
        err
    }
}

/// Runs every case under `options.cases_dir` through the solver produced by `load`.
///
/// `load` is called exactly once, before the case directory is read, so a
/// missing directory leaves a loaded but unused solver.
pub fn run<S, L, W>(
    options: &RunOptions,
    load: L,
    reporter: &mut Reporter<W>,
) -> Result<RunReport, Error>
where
    S: Solver,
    L: FnOnce() -> Result<(S, String), Error>,
    W: Write,
{
    let mut run = Run {
        state: RunState::NotLoaded,
    };

    let (solver, label) = load().map_err(|err| run.abort(err))?;
    run.transition(RunState::Loaded);
    reporter
        .banner(&label)
        .map_err(|err| run.abort(write_error(err)))?;

    let cases = select_cases(options).map_err(|err| run.abort(err))?;

    let mut forwarded = 0;
    let mut faulted = Vec::new();
    for (index, case) in cases.iter().enumerate() {
        run.transition(RunState::Processing(index));
        reporter
            .case_started(case)
            .map_err(|err| run.abort(write_error(err)))?;

        match solver.submit(case) {
            Ok(()) => forwarded += 1,
            Err(err)
                if options.fault_policy == FaultPolicy::Continue
                    && err.kind() == ErrorKind::BoundaryFault =>
            {
                warn!(case = case.name(), error = %err, "boundary fault; continuing with next case");
                forwarded += 1;
                reporter
                    .case_faulted(case, &err)
                    .map_err(|err| run.abort(write_error(err)))?;
                faulted.push(case.name().to_string());
            }
            Err(err) => return Err(run.abort(err)),
        }
    }

    if options.fault_policy == FaultPolicy::Continue {
        reporter
            .summary(forwarded, cases.len(), &faulted)
            .map_err(|err| run.abort(write_error(err)))?;
    }

    run.transition(RunState::Done);
    Ok(RunReport {
        total: cases.len(),
        forwarded,
        faulted,
        state: run.state,
    })
}

/// Prints the selected case names without loading any solver.
pub fn list<W: Write>(options: &RunOptions, reporter: &mut Reporter<W>) -> Result<usize, Error> {
    let cases = select_cases(options)?;
    for case in &cases {
        reporter.list_entry(case).map_err(write_error)?;
    }
    Ok(cases.len())
}

fn select_cases(options: &RunOptions) -> Result<CaseSet, Error> {
    let cases = load_cases(&options.cases_dir)?;
    Ok(match options.filter.as_deref() {
        Some(pattern) => cases.filter(pattern),
        None => cases,
    })
}

fn write_error(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write progress output")
        .with_source(err)
}

/// Error returned by the CLI when an isolated run recorded faults.
pub fn faulted_run_error(report: &RunReport) -> Option<Error> {
    if report.faulted.is_empty() {
        return None;
    }
    Some(
        Error::new(ErrorKind::BoundaryFault).with_message(format!(
            "{} of {} cases faulted: {}",
            report.faulted.len(),
            report.total,
            report.faulted.join(", ")
        )),
    )
}
