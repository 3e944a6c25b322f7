use std::path::Path;
use std::time::Duration;

use crate::discover::TestCase;
use crate::error::{describe_exit, Failure, Stage};
use crate::path_arg;
use crate::process::invoke;

/// Hand one fixture directory to the external stress runner: `runner <dir>`.
///
/// The runner owns everything about the case; only its exit code is judged,
/// and its stderr is passed through untouched when it fails.
pub fn check(runner: &Path, case: &TestCase, timeout: Option<Duration>) -> Result<(), Failure> {
    let argv = [path_arg(runner), path_arg(&case.path)];
    let r = invoke(&argv, None, timeout)?;
    if r.timed_out {
        return Err(Failure::Timeout {
            stage: Stage::Runner,
            after: timeout.unwrap_or_default(),
        });
    }
    if r.exit_code != Some(0) {
        return Err(Failure::RunnerFailed {
            code: describe_exit(r.exit_code),
            stderr: r.stderr,
        });
    }
    Ok(())
}
