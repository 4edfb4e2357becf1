//! Purpose: Compile the C echo solver fixture into shared libraries for tests.
//! Role: Cargo build-script; drives the `cc`-selected compiler and exports fixture paths.
//! Invariants: Fixture paths reach the crate only through `cargo:rustc-env`.
//! Invariants: A missing or failing C compiler downgrades to a warning; the harness still builds.
//! Invariants: Uses only Cargo-provided env vars (e.g. `CARGO_MANIFEST_DIR`, `OUT_DIR`).
use std::env;
use std::path::{Path, PathBuf};

fn main() {
    let target = env::var("TARGET").unwrap_or_default();
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let source = manifest_dir.join("c").join("echo_solver.c");

    println!("cargo:rerun-if-changed=c/echo_solver.c");

    if target.contains("windows-msvc") {
        println!("cargo:warning=echo solver fixture is not built for {target}; FFI tests will skip");
        return;
    }

    let suffix = dylib_suffix(&target);
    let fixtures = [
        ("SOLVER_HARNESS_ECHO_SOLVER", "echo_solver", None),
        (
            "SOLVER_HARNESS_ALT_SYMBOL_SOLVER",
            "echo_solver_alt",
            Some("ECHO_SOLVER_ALT_SYMBOL"),
        ),
    ];

    for (env_name, stem, define) in fixtures {
        let output = out_dir.join(format!("lib{stem}.{suffix}"));
        match compile_shared(&source, &output, &target, define) {
            Ok(()) => println!("cargo:rustc-env={env_name}={}", output.display()),
            Err(err) => println!("cargo:warning=failed to build {stem} fixture: {err}"),
        }
    }
}

fn compile_shared(
    source: &Path,
    output: &Path,
    target: &str,
    define: Option<&str>,
) -> Result<(), String> {
    let compiler = cc::Build::new()
        .cargo_metadata(false)
        .warnings(false)
        .try_get_compiler()
        .map_err(|err| err.to_string())?;

    let mut command = compiler.to_command();
    if target.contains("apple") {
        command.arg("-dynamiclib");
    } else {
        command.arg("-shared").arg("-fPIC");
    }
    if let Some(define) = define {
        command.arg(format!("-D{define}"));
    }
    command.arg("-o").arg(output).arg(source);

    let status = command.status().map_err(|err| err.to_string())?;
    if !status.success() {
        return Err(format!("compiler exited with {status}"));
    }
    Ok(())
}

fn dylib_suffix(target: &str) -> &'static str {
    if target.contains("apple") {
        "dylib"
    } else if target.contains("windows") {
        "dll"
    } else {
        "so"
    }
}
