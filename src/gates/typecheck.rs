use crate::discover::TestCase;
use crate::error::{describe_exit, Failure};
use crate::expect::CorpusLabel;
use crate::gates::type_check_only;
use crate::ResolvedConfig;

/// Type check one corpus file and compare the verdict with the corpus label.
/// Nothing is compiled to an executable and no output is compared.
pub fn check(cfg: &ResolvedConfig, case: &TestCase, label: CorpusLabel) -> Result<(), Failure> {
    let r = type_check_only(cfg, &case.path)?;
    let accepted = r.exit_code == Some(0);
    let (ok, expectation) = match label {
        CorpusLabel::Accept => (accepted, "type check"),
        CorpusLabel::Reject => (!accepted, "be rejected by the type checker"),
    };
    if ok {
        return Ok(());
    }
    Err(Failure::TypecheckMismatch {
        expectation,
        code: describe_exit(r.exit_code),
        stdout: r.stdout,
        stderr: r.stderr,
    })
}
