#![cfg(unix)]

mod common;

use coherence_gate::error::Stage;
use coherence_gate::{run_suite, Failure, SuiteKind, SuiteOptions};

use common::{write, Env};

fn golden_case(env: &Env, name: &str, prog: &str, compiler_out: &str, prog_out: &str) {
    let dir = env.suite_dir(&env.cfg.fixtures.golden).join(name);
    write(&dir.join("prog.coh"), prog);
    write(&dir.join("compiler_out.txt"), compiler_out);
    write(&dir.join("prog_out.txt"), prog_out);
}

fn only_failure(env: &Env) -> Option<String> {
    let report = run_suite(SuiteKind::Golden, &env.cfg, &SuiteOptions::default()).unwrap();
    assert_eq!(report.case_count(), 1);
    report.results[0].failure.clone()
}

#[test]
fn matching_goldens_pass() {
    let env = Env::new();
    golden_case(
        &env,
        "hello",
        "echo 1\necho warn >&2\n",
        "compiled\n",
        "1\nwarn\n",
    );
    assert_eq!(only_failure(&env), None);
}

#[test]
fn crlf_goldens_compare_equal() {
    let env = Env::new();
    golden_case(&env, "windows", "echo 5\n", "compiled\r\n", "5\r\n");
    assert_eq!(only_failure(&env), None);
}

#[test]
fn rejected_program_stops_after_compiler_output() {
    let env = Env::new();
    // The program golden is never consulted once the compiler rejects.
    golden_case(
        &env,
        "rejected",
        "#reject\n",
        "error: program rejected\n",
        "this is never compared\n",
    );
    assert_eq!(only_failure(&env), None);
}

#[test]
fn compiler_mismatch_carries_unified_diff() {
    let env = Env::new();
    golden_case(
        &env,
        "diag",
        "#reject\n",
        "error: lock `a` not held\n",
        "",
    );
    let msg = only_failure(&env).expect("case should fail");
    assert!(msg.contains("compiler output differs from golden file"), "{msg}");
    assert!(msg.contains("--- compiler_out.txt"), "{msg}");
    assert!(msg.contains("+++ actual compiler output"), "{msg}");
    assert!(msg.contains("-error: lock `a` not held"), "{msg}");
    assert!(msg.contains("+error: program rejected"), "{msg}");
}

#[test]
fn program_mismatch_carries_unified_diff() {
    let env = Env::new();
    golden_case(&env, "prog", "echo 1\necho 3\n", "compiled\n", "1\n2\n");
    let msg = only_failure(&env).expect("case should fail");
    assert!(msg.contains("program output differs from golden file"), "{msg}");
    assert!(msg.contains("-2\n+3\n"), "{msg}");
}

#[test]
fn check_reports_stage_of_mismatch() {
    let env = Env::new();
    golden_case(&env, "stage", "echo 1\n", "compiled\n", "2\n");
    let case = coherence_gate::discover::TestCase {
        id: "stage".into(),
        path: env.suite_dir(&env.cfg.fixtures.golden).join("stage"),
    };
    let golden = coherence_gate::expect::load_golden(
        &case.file("compiler_out.txt"),
        &case.file("prog_out.txt"),
    )
    .unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let err = coherence_gate::gates::golden::check(&env.cfg, &case, &golden, scratch.path())
        .unwrap_err();
    assert!(matches!(
        err,
        Failure::TextMismatch {
            stage: Stage::Execute,
            ..
        }
    ));
}
