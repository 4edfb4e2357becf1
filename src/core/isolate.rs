//! Purpose: Submit each case from its own child process so a crashing callee ends only that case.
//! Exports: `ChildProcessSolver`, `SUBMIT_ONE_FLAG`.
//! Role: Per-case fault isolation; an alternative `Solver` to the in-process gateway.
//! Invariants: One child at a time; the driver waits for it before the next case.
//! Invariants: A child killed by a signal, or exiting with a status the harness never uses, is a `BoundaryFault`.
//! Invariants: A child exiting with one of the harness's own exit codes reports that error kind.
//! Invariants: The case path travels as one `--submit-one=<abs path>` argument.
//! Invariants: Children inherit stdout/stderr so solver output keeps its order.
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::core::cases::TestCase;
use crate::core::error::{Error, ErrorKind, from_exit_code};
use crate::core::gateway::{NativeSolver, Solver, anchor_path};

/// Hidden CLI flag that makes the harness binary submit one case file and exit.
pub const SUBMIT_ONE_FLAG: &str = "--submit-one";

#[derive(Debug)]
pub struct ChildProcessSolver {
    exe: PathBuf,
    library: PathBuf,
    symbol: String,
    // The parent's own handle: proves the library loads before any child runs
    // and stays held for the run like the in-process handle would.
    _parent: Option<NativeSolver>,
}

impl ChildProcessSolver {
    pub fn new(exe: impl Into<PathBuf>, library: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Self {
            exe: exe.into(),
            library: library.into(),
            symbol: symbol.into(),
            _parent: None,
        }
    }

    /// Re-runs the current executable per case against the already loaded library.
    pub fn isolating(parent: NativeSolver) -> Result<Self, Error> {
        let exe = std::env::current_exe().map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to resolve current executable for case isolation")
                .with_source(err)
        })?;
        Ok(Self {
            exe,
            library: parent.path().to_path_buf(),
            symbol: parent.symbol().to_string(),
            _parent: Some(parent),
        })
    }

    fn command(&self, case: &TestCase) -> Command {
        let mut command = Command::new(&self.exe);
        command
            .arg("--library")
            .arg(&self.library)
            .arg("--symbol")
            .arg(&self.symbol)
            .arg("--color")
            .arg("never")
            .arg(submit_one_arg(case))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }
}

impl Solver for ChildProcessSolver {
    fn submit(&self, case: &TestCase) -> Result<(), Error> {
        debug!(case = case.name(), exe = %self.exe.display(), "submitting case in child process");
        let status = self.command(case).status().map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to spawn isolated submission")
                .with_case(case.name())
                .with_path(&self.exe)
                .with_source(err)
        })?;
        if status.success() {
            return Ok(());
        }
        Err(status_error(status, case))
    }
}

/// `--submit-one=<path>` as a single argument, so a path starting with `-`
/// is never parsed as a flag by the child.
fn submit_one_arg(case: &TestCase) -> OsString {
    let mut arg = OsString::from(SUBMIT_ONE_FLAG);
    arg.push("=");
    arg.push(anchor_path(case.path()));
    arg
}

fn status_error(status: ExitStatus, case: &TestCase) -> Error {
    let detail = describe_status(status);
    let err = match status.code().and_then(from_exit_code) {
        Some(kind) if kind != ErrorKind::BoundaryFault => {
            Error::new(kind).with_message(format!("isolated harness process failed ({detail})"))
        }
        _ => Error::new(ErrorKind::BoundaryFault).with_message(format!("solver {detail}")),
    };
    err.with_case(case.name()).with_path(case.path())
}

fn describe_status(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }
    match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "terminated abnormally".to_string(),
    }
}
