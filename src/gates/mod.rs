//! The oracles, one module per fixture category, over a shared
//! compile-then-execute skeleton.

pub mod deterministic;
pub mod golden;
pub mod invariant;
pub mod stress;
pub mod typecheck;

use std::path::{Path, PathBuf};

use crate::error::{describe_exit, Failure, Stage};
use crate::normalize::tokenize_int_lines;
use crate::process::{invoke, ProcessResult};
use crate::{path_arg, ResolvedConfig};

pub const SOURCE_FILE: &str = "prog.coh";
pub const TEST_INFO_FILE: &str = "test_info.json";
pub const COMPILER_GOLDEN_FILE: &str = "compiler_out.txt";
pub const PROGRAM_GOLDEN_FILE: &str = "prog_out.txt";
pub const INVARIANT_FILE: &str = "invariant.json";
/// Name of the executable the compiler writes into its output directory.
pub const EXECUTABLE: &str = "out";

/// `compiler --input-file <src> --output-dir <out_dir>`.
pub fn compile(cfg: &ResolvedConfig, src: &Path, out_dir: &Path) -> Result<ProcessResult, Failure> {
    let argv = [
        path_arg(&cfg.compiler),
        "--input-file".to_string(),
        path_arg(src),
        "--output-dir".to_string(),
        path_arg(out_dir),
    ];
    run_stage(cfg, &argv, Stage::Compile)
}

/// `compiler --input-file <src> --only-typecheck`.
pub fn type_check_only(cfg: &ResolvedConfig, src: &Path) -> Result<ProcessResult, Failure> {
    let argv = [
        path_arg(&cfg.compiler),
        "--input-file".to_string(),
        path_arg(src),
        "--only-typecheck".to_string(),
    ];
    run_stage(cfg, &argv, Stage::Typecheck)
}

/// The compiled program's path, once it is known to exist.
pub fn executable(out_dir: &Path) -> Result<PathBuf, Failure> {
    let exe = out_dir.join(EXECUTABLE);
    if !exe.is_file() {
        return Err(Failure::MissingExecutable(exe));
    }
    Ok(exe)
}

/// Run the compiled program with no arguments.
pub fn execute(cfg: &ResolvedConfig, exe: &Path) -> Result<ProcessResult, Failure> {
    run_stage(cfg, &[path_arg(exe)], Stage::Execute)
}

/// Compile `src`, requiring success, then run the program and parse its stdout
/// as one integer per line.
pub fn compile_and_run(
    cfg: &ResolvedConfig,
    src: &Path,
    out_dir: &Path,
) -> Result<Vec<i64>, Failure> {
    let c = compile(cfg, src, out_dir)?;
    require_compiled(&c)?;
    let exe = executable(out_dir)?;
    let r = execute(cfg, &exe)?;
    Ok(tokenize_int_lines(&r.stdout)?)
}

pub fn require_compiled(c: &ProcessResult) -> Result<(), Failure> {
    if c.exit_code != Some(0) {
        return Err(Failure::CompileRejected {
            code: describe_exit(c.exit_code),
            stdout: c.stdout.clone(),
            stderr: c.stderr.clone(),
        });
    }
    Ok(())
}

fn run_stage(cfg: &ResolvedConfig, argv: &[String], stage: Stage) -> Result<ProcessResult, Failure> {
    let r = invoke(argv, None, cfg.timeout)?;
    if r.timed_out {
        return Err(Failure::Timeout {
            stage,
            after: cfg.timeout.unwrap_or_default(),
        });
    }
    Ok(r)
}
