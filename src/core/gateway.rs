//! Purpose: Load the native solver library and forward case content across the C ABI.
//! Exports: `Solver`, `NativeSolver`, `SubmitFn`, `DEFAULT_SYMBOL`.
//! Role: The only module that touches `unsafe` foreign calls.
//! Invariants: The library is loaded once per `NativeSolver` and never reloaded.
//! Invariants: The bound symbol has the fixed signature `void (const char *)`.
//! Invariants: Content with an interior NUL never reaches the callee.
use std::ffi::{CString, OsStr};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, info};

use crate::core::cases::TestCase;
use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_SYMBOL: &str = "solve_process";

/// Signature of the exported entry point. The callee's real signature cannot
/// be inspected at load time; a mismatch is undefined behavior.
pub type SubmitFn = unsafe extern "C" fn(input: *const c_char);

/// Destination for case content. Submission is fire-and-forget: `Ok(())`
/// means the call returned, not that the case passed.
pub trait Solver {
    fn submit(&self, case: &TestCase) -> Result<(), Error>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn submit(&self, case: &TestCase) -> Result<(), Error> {
        (**self).submit(case)
    }
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn submit(&self, case: &TestCase) -> Result<(), Error> {
        (**self).submit(case)
    }
}

pub struct NativeSolver {
    submit: SubmitFn,
    path: PathBuf,
    symbol: String,
    // Must outlive `submit`; dropped last.
    _library: Library,
}

impl std::fmt::Debug for NativeSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeSolver")
            .field("path", &self.path)
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

impl NativeSolver {
    pub fn load(path: &Path, symbol: &str) -> Result<Self, Error> {
        let path = anchor_path(path);
        if !path.is_file() {
            return Err(Error::new(ErrorKind::LibraryLoad)
                .with_message("solver library not found")
                .with_path(&path));
        }

        // Runs the library's static initializers.
        let library = unsafe { Library::new(path.as_os_str()) }.map_err(|err| {
            Error::new(ErrorKind::LibraryLoad)
                .with_message("failed to open solver library")
                .with_path(&path)
                .with_source(err)
        })?;

        let submit = {
            let symbol_ref = unsafe { library.get::<SubmitFn>(symbol.as_bytes()) }.map_err(|err| {
                Error::new(ErrorKind::LibraryLoad)
                    .with_message(format!("solver library does not export `{symbol}`"))
                    .with_hint("Check the binding's export table, or pass --symbol <NAME>.")
                    .with_path(&path)
                    .with_source(err)
            })?;
            *symbol_ref
        };

        info!(library = %path.display(), symbol, "loaded solver library");
        Ok(Self {
            submit,
            path,
            symbol: symbol.to_string(),
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }
}

impl Solver for NativeSolver {
    fn submit(&self, case: &TestCase) -> Result<(), Error> {
        let input = CString::new(case.content()).map_err(|err| {
            Error::new(ErrorKind::BoundaryFault)
                .with_message(format!(
                    "case content has a NUL byte at offset {} and cannot cross the C boundary",
                    err.nul_position()
                ))
                .with_case(case.name())
                .with_path(case.path())
        })?;

        debug!(case = case.name(), bytes = case.content().len(), "submitting case");
        // `input` stays alive for the whole call; the callee must not keep the pointer.
        unsafe { (self.submit)(input.as_ptr()) };
        Ok(())
    }
}

/// Relative paths are joined onto the working directory so the platform
/// loader never searches its library path for a bare file name.
pub(crate) fn anchor_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Default build output of the solver's C binding for this platform.
pub fn default_library_path() -> PathBuf {
    PathBuf::from("build")
        .join("src")
        .join("bindings")
        .join(format!(
            "{}gradesolver_api{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_SUFFIX
        ))
}
