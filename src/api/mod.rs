//! Purpose: Define the public Rust API boundary for the harness.
//! Exports: Case, solver and run types needed by the CLI and by embedders.
//! Role: Additive-only surface over `core`.
//! Invariants: Callers reach foreign calls only through `Solver` implementations.

pub use crate::core::cases::{CASE_SUFFIX, CaseSet, TestCase, load_case, load_cases};
pub use crate::core::driver::{
    FaultPolicy, RunOptions, RunReport, RunState, faulted_run_error, list, run,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::gateway::{
    DEFAULT_SYMBOL, NativeSolver, Solver, SubmitFn, default_library_path,
};
pub use crate::core::isolate::{ChildProcessSolver, SUBMIT_ONE_FLAG};
pub use crate::core::report::{AnsiColor, Reporter, paint};
