use std::path::Path;

use crate::discover::TestCase;
use crate::error::Failure;
use crate::expect::TestInfo;
use crate::gates::{compile, execute, executable, require_compiled, SOURCE_FILE};
use crate::normalize::tokenize_int_lines;
use crate::ResolvedConfig;

/// Judge one `test_info.json` fixture.
///
/// A fixture that must not compile passes as soon as the compiler exits
/// nonzero; its program output is never looked at. Otherwise the program's
/// stdout must equal `info.output`, order included; a compiling fixture
/// without `output` is a bad fixture and is never compiled.
pub fn check(
    cfg: &ResolvedConfig,
    case: &TestCase,
    info: &TestInfo,
    scratch: &Path,
) -> Result<(), Failure> {
    if !info.compiles {
        let c = compile(cfg, &case.file(SOURCE_FILE), scratch)?;
        return match c.exit_code {
            Some(0) => Err(Failure::CompileAccepted),
            _ => Ok(()),
        };
    }
    let expected = info.expected_output()?;

    let c = compile(cfg, &case.file(SOURCE_FILE), scratch)?;
    require_compiled(&c)?;

    let exe = executable(scratch)?;
    let r = execute(cfg, &exe)?;
    let actual = tokenize_int_lines(&r.stdout)?;

    if actual != expected {
        return Err(Failure::OutputMismatch {
            expected: expected.to_vec(),
            actual,
        });
    }
    Ok(())
}
