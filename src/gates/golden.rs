use std::path::Path;

use crate::diff::unified_diff;
use crate::discover::TestCase;
use crate::error::{Failure, Stage};
use crate::expect::GoldenPair;
use crate::gates::{
    compile, execute, executable, COMPILER_GOLDEN_FILE, PROGRAM_GOLDEN_FILE, SOURCE_FILE,
};
use crate::normalize::normalize_newlines;
use crate::ResolvedConfig;

/// Judge one golden-text fixture.
///
/// The compiler's combined output is always compared. A nonzero compiler
/// exit ends the case there: the golden file already recorded the rejection.
/// Otherwise the program's combined output is compared too.
pub fn check(
    cfg: &ResolvedConfig,
    case: &TestCase,
    golden: &GoldenPair,
    scratch: &Path,
) -> Result<(), Failure> {
    let c = compile(cfg, &case.file(SOURCE_FILE), scratch)?;
    compare(Stage::Compile, &golden.compiler_out, &c.combined(), COMPILER_GOLDEN_FILE)?;

    if c.exit_code != Some(0) {
        tracing::debug!(case = %case.id, code = ?c.exit_code, "compiler rejected input as recorded");
        return Ok(());
    }

    let exe = executable(scratch)?;
    let r = execute(cfg, &exe)?;
    compare(Stage::Execute, &golden.prog_out, &r.combined(), PROGRAM_GOLDEN_FILE)
}

fn compare(stage: Stage, golden: &str, actual: &str, golden_name: &str) -> Result<(), Failure> {
    let golden = normalize_newlines(golden);
    let actual = normalize_newlines(actual);
    match unified_diff(&golden, &actual, golden_name, &format!("actual {stage} output")) {
        None => Ok(()),
        Some(diff) => Err(Failure::TextMismatch { stage, diff }),
    }
}
