//! Purpose: `solver-harness` CLI entry point.
//! Role: Binary crate root; parses args, runs the case loop, emits progress on stdout.
//! Invariants: Progress lines and solver output share stdout; diagnostics go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

use solver_harness::api::{
    AnsiColor, ChildProcessSolver, DEFAULT_SYMBOL, Error, ErrorKind, FaultPolicy, NativeSolver,
    Reporter, RunOptions, Solver, default_library_path, faulted_run_error, list, load_case, paint,
    run, to_exit_code,
};

fn main() {
    init_tracing();
    let exit_code = match run_cli() {
        Ok(code) => code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

#[derive(Parser)]
#[command(
    name = "solver-harness",
    version,
    about = "Feed JSON test cases to a native solver library",
    long_about = None,
    after_help = r#"EXAMPLES
  $ solver-harness
  $ solver-harness --cases-dir tests/cases --library build/src/bindings/libgradesolver_api.so
  $ solver-harness --symbol solve_json_api --isolate
  $ solver-harness --list --filter grades

Each case file is passed verbatim to the library's exported function; the
library prints its own results."#
)]
struct Cli {
    #[arg(
        long,
        default_value = "tests/cases",
        help = "Directory of *.json case files",
        value_hint = ValueHint::DirPath
    )]
    cases_dir: PathBuf,
    #[arg(
        long,
        help = "Solver library path (default: build/src/bindings/<lib>gradesolver_api<ext>)",
        value_hint = ValueHint::FilePath
    )]
    library: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_SYMBOL, help = "Exported `void (const char *)` entry point")]
    symbol: String,
    #[arg(long, help = "Only run cases whose file name contains this text")]
    filter: Option<String>,
    #[arg(
        long,
        help = "Submit each case from a child process so a crashing solver ends only that case"
    )]
    isolate: bool,
    #[arg(long, conflicts_with = "isolate", help = "List the selected cases without loading the library")]
    list: bool,
    #[arg(long, default_value = "auto", help = "Colorize output")]
    color: ColorMode,
    #[arg(
        long = "submit-one",
        hide = true,
        value_name = "FILE",
        conflicts_with_all = ["list", "isolate"]
    )]
    submit_one: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn run_cli() -> Result<i32, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                return Ok(0);
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `solver-harness --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let library = cli.library.clone().unwrap_or_else(default_library_path);

    let result = if let Some(case_path) = &cli.submit_one {
        submit_one(&library, &cli.symbol, case_path)
    } else if cli.list {
        list_cases(&cli)
    } else {
        run_cases(&cli, &library)
    };

    result
        .map_err(add_library_hint)
        .map_err(|err| add_directory_hint(err, &cli.cases_dir))
        .map_err(|err| add_fault_hint(err, cli.isolate))
        .map_err(add_io_hint)
        .map_err(|err| (err, color_mode))
}

fn run_cases(cli: &Cli, library: &Path) -> Result<i32, Error> {
    let policy = if cli.isolate {
        FaultPolicy::Continue
    } else {
        FaultPolicy::Abort
    };
    let options = RunOptions::new(&cli.cases_dir)
        .with_filter(cli.filter.clone())
        .with_fault_policy(policy);

    let stdout = io::stdout();
    let use_color = cli.color.use_color(stdout.is_terminal());
    let mut reporter = Reporter::new(stdout.lock(), use_color);

    let symbol = cli.symbol.as_str();
    let isolate = cli.isolate;
    let report = run(
        &options,
        || -> Result<(Box<dyn Solver>, String), Error> {
            let native = NativeSolver::load(library, symbol)?;
            let name = native.file_name().to_string_lossy().into_owned();
            if isolate {
                let solver = ChildProcessSolver::isolating(native)?;
                Ok((Box::new(solver), format!("{name} (isolated)")))
            } else {
                Ok((Box::new(native), name))
            }
        },
        &mut reporter,
    )?;

    match faulted_run_error(&report) {
        Some(err) => Err(err),
        None => Ok(0),
    }
}

fn list_cases(cli: &Cli) -> Result<i32, Error> {
    let options = RunOptions::new(&cli.cases_dir).with_filter(cli.filter.clone());
    let stdout = io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), false);
    list(&options, &mut reporter)?;
    Ok(0)
}

// Child side of `--isolate`: one load, one submission.
fn submit_one(library: &Path, symbol: &str, case_path: &Path) -> Result<i32, Error> {
    let native = NativeSolver::load(library, symbol)?;
    let case = load_case(case_path)?;
    native.submit(&case)?;
    Ok(0)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

fn add_library_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::LibraryLoad || err.hint().is_some() {
        return err;
    }
    err.with_hint("The solver library may not be built yet. Build it first (e.g. run `make`), or pass --library <PATH>.")
}

fn add_directory_hint(err: Error, cases_dir: &Path) -> Error {
    if err.kind() != ErrorKind::DirectoryNotFound || err.hint().is_some() {
        return err;
    }
    err.with_hint(format!(
        "Create {} with *.json cases, or pass --cases-dir <DIR>.",
        cases_dir.display()
    ))
}

fn add_fault_hint(err: Error, isolated: bool) -> Error {
    if err.kind() != ErrorKind::BoundaryFault || err.hint().is_some() || isolated {
        return err;
    }
    err.with_hint("Re-run with --isolate to keep going past a faulting case.")
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path and its permissions.")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::LibraryLoad => "failed to load solver library".to_string(),
        ErrorKind::DirectoryNotFound => "case directory not found".to_string(),
        ErrorKind::BoundaryFault => "solver call failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(case) = err.case() {
        inner.insert("case".to_string(), json!(case));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        paint("error:", AnsiColor::Red, use_color),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            paint("hint:", AnsiColor::Yellow, use_color)
        ));
    }
    if let Some(case) = err.case() {
        lines.push(format!(
            "{} {case}",
            paint("case:", AnsiColor::Yellow, use_color)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            paint("path:", AnsiColor::Yellow, use_color),
            path.display()
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            paint("caused by:", AnsiColor::Yellow, use_color)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
