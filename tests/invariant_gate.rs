#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use coherence_gate::discover::TestCase;
use coherence_gate::error::Stage;
use coherence_gate::expect::Invariant;
use coherence_gate::gates::invariant;
use coherence_gate::{run_suite, Failure, SuiteKind, SuiteOptions};

use common::{print_ints, write, Env};

fn nd_case(env: &Env, name: &str, prog: &str, invariant_json: &str) -> TestCase {
    let dir = env.suite_dir(&env.cfg.fixtures.non_deterministic).join(name);
    write(&dir.join("prog.coh"), prog);
    write(&dir.join("invariant.json"), invariant_json);
    TestCase {
        id: name.to_string(),
        path: dir,
    }
}

fn judge(env: &Env, case: &TestCase, inv: &Invariant) -> Result<(), Failure> {
    let scratch = tempfile::tempdir().unwrap();
    invariant::check(&env.cfg, case, inv, scratch.path())
}

#[test]
fn fan_in_fan_out_is_a_permutation_of_ten_thousand() {
    let env = Env::new();
    // Completion order is scrambled; only the set of values matters.
    let c = nd_case(
        &env,
        "fan_in_fan_out",
        "i=9999\nwhile [ $i -ge 0 ]; do echo $i; i=$((i-1)); done\n",
        r#"{"invariant": "permutation_of_range", "n": 10000}"#,
    );
    judge(&env, &c, &Invariant::PermutationOfRange { n: 10000, start: 0 }).unwrap();
}

#[test]
fn ping_pong_counts_each_sign() {
    let env = Env::new();
    let c = nd_case(
        &env,
        "ping_pong_storm",
        "i=0\nwhile [ $i -lt 10000 ]; do echo -1; echo 1; i=$((i+1)); done\n",
        r#"{"invariant": "signed_count_pair", "n": 10000}"#,
    );
    judge(&env, &c, &Invariant::SignedCountPair { n: 10000 }).unwrap();
}

#[test]
fn dining_philosophers_sorted_output() {
    let env = Env::new();
    let c = nd_case(
        &env,
        "dining_philosophers",
        &print_ints(&[3, 5, 1, 4, 2]),
        r#"{"invariant": "permutation_of_range", "start": 1, "n": 5}"#,
    );
    judge(&env, &c, &Invariant::PermutationOfRange { n: 5, start: 1 }).unwrap();
    judge(
        &env,
        &c,
        &Invariant::SortedEquals {
            values: vec![1, 2, 3, 4, 5],
        },
    )
    .unwrap();
}

#[test]
fn lost_update_violates_permutation() {
    let env = Env::new();
    let c = nd_case(
        &env,
        "linked_list_concurrent_adding",
        &print_ints(&[0, 1, 1, 3]),
        r#"{"invariant": "permutation_of_range", "n": 4}"#,
    );
    match judge(&env, &c, &Invariant::PermutationOfRange { n: 4, start: 0 }).unwrap_err() {
        Failure::InvariantViolated { detail, .. } => {
            assert_eq!(detail, "sorted output differs at position 2: expected 2, got 1")
        }
        other => panic!("unexpected failure: {other}"),
    }
}

#[test]
fn compile_failure_is_never_acceptable() {
    let env = Env::new();
    let c = nd_case(&env, "broken", "#reject\n", r#"{"invariant": "signed_count_pair", "n": 1}"#);
    assert!(matches!(
        judge(&env, &c, &Invariant::SignedCountPair { n: 1 }),
        Err(Failure::CompileRejected { .. })
    ));
}

#[test]
fn deadlocked_program_times_out() {
    let mut env = Env::new();
    env.cfg.timeout = Some(Duration::from_millis(500));
    let c = nd_case(
        &env,
        "deadlock",
        "echo 0\nsleep 30\n",
        r#"{"invariant": "permutation_of_range", "n": 1}"#,
    );
    let start = Instant::now();
    let err = judge(&env, &c, &Invariant::PermutationOfRange { n: 1, start: 0 }).unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(20));
    assert!(matches!(
        err,
        Failure::Timeout {
            stage: Stage::Execute,
            ..
        }
    ));
}

#[test]
fn suite_reads_declared_invariants() {
    let env = Env::new();
    nd_case(
        &env,
        "large_locking",
        "i=0\nwhile [ $i -lt 1000 ]; do echo $i; i=$((i+1)); done\n",
        r#"{"invariant": "permutation_of_range", "n": 1000}"#,
    );
    nd_case(
        &env,
        "ping_pong_short",
        &print_ints(&[1, -1, 1]),
        r#"{"invariant": "signed_count_pair", "n": 2}"#,
    );
    nd_case(&env, "unknown_shape", "echo 1\n", r#"{"invariant": "median", "n": 2}"#);

    let report = run_suite(SuiteKind::NonDeterministic, &env.cfg, &SuiteOptions::default()).unwrap();
    assert_eq!(report.case_count(), 3);
    assert_eq!(report.pass_count(), 1);
    let failures = report.failures();
    assert_eq!(failures[0].id, "ping_pong_short");
    assert!(failures[0].message.contains("signed-count-pair(2)"), "{}", failures[0].message);
    assert_eq!(failures[1].id, "unknown_shape");
    assert!(failures[1].message.starts_with("bad fixture"));
}
