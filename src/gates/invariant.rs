use std::path::Path;

use crate::discover::TestCase;
use crate::error::Failure;
use crate::expect::Invariant;
use crate::gates::{compile_and_run, SOURCE_FILE};
use crate::ResolvedConfig;

/// Judge one concurrent-program fixture by an order-independent property of
/// its output. Compilation and execution must both succeed.
pub fn check(
    cfg: &ResolvedConfig,
    case: &TestCase,
    invariant: &Invariant,
    scratch: &Path,
) -> Result<(), Failure> {
    let output = compile_and_run(cfg, &case.file(SOURCE_FILE), scratch)?;
    tracing::debug!(case = %case.id, values = output.len(), %invariant, "checking invariant");
    invariant
        .check(&output)
        .map_err(|detail| Failure::InvariantViolated {
            invariant: invariant.clone(),
            detail,
        })
}
