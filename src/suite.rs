//! Run every case of a fixture category and collect the verdicts.

use std::path::PathBuf;
use std::thread;

use regex::Regex;
use serde::Serialize;
use tempfile::TempDir;

use crate::discover::{discover, discover_sources, Discovery, Incomplete, TestCase};
use crate::error::{Failure, GateError};
use crate::expect::{self, CorpusLabel, Expectation};
use crate::gates::{self, COMPILER_GOLDEN_FILE, INVARIANT_FILE, PROGRAM_GOLDEN_FILE, SOURCE_FILE, TEST_INFO_FILE};
use crate::ResolvedConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SuiteKind {
    Deterministic,
    Golden,
    NonDeterministic,
    WellTyped,
    IllTyped,
    LockFilling,
}

impl SuiteKind {
    pub const ALL: [SuiteKind; 6] = [
        SuiteKind::Deterministic,
        SuiteKind::Golden,
        SuiteKind::NonDeterministic,
        SuiteKind::WellTyped,
        SuiteKind::IllTyped,
        SuiteKind::LockFilling,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SuiteKind::Deterministic => "deterministic",
            SuiteKind::Golden => "golden",
            SuiteKind::NonDeterministic => "non_deterministic",
            SuiteKind::WellTyped => "well_typed",
            SuiteKind::IllTyped => "ill_typed",
            SuiteKind::LockFilling => "lock_filling",
        }
    }

    /// Only the lock-filling suite talks to the stress runner.
    pub fn needs_runner(self) -> bool {
        self == SuiteKind::LockFilling
    }

    fn fixture_dir(self, cfg: &ResolvedConfig) -> PathBuf {
        let f = &cfg.fixtures;
        f.resolve(match self {
            SuiteKind::Deterministic => &f.deterministic,
            SuiteKind::Golden => &f.golden,
            SuiteKind::NonDeterministic => &f.non_deterministic,
            SuiteKind::WellTyped => &f.well_typed,
            SuiteKind::IllTyped => &f.ill_typed,
            SuiteKind::LockFilling => &f.lock_filling,
        })
    }

    fn required_files(self) -> &'static [&'static str] {
        match self {
            SuiteKind::Deterministic => &[SOURCE_FILE, TEST_INFO_FILE],
            SuiteKind::Golden => &[SOURCE_FILE, COMPILER_GOLDEN_FILE, PROGRAM_GOLDEN_FILE],
            SuiteKind::NonDeterministic => &[SOURCE_FILE, INVARIANT_FILE],
            SuiteKind::WellTyped | SuiteKind::IllTyped | SuiteKind::LockFilling => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuiteOptions {
    /// Only run cases whose id matches.
    pub filter: Option<Regex>,
    /// Worker threads; `0` and `1` both mean sequential.
    pub jobs: usize,
    /// Leave each case's scratch directory behind for inspection.
    pub keep_scratch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseFailure {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseResult {
    pub id: String,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub suite: &'static str,
    pub results: Vec<CaseResult>,
    /// Fixture directories skipped for missing files. Informational only.
    pub incomplete: Vec<String>,
}

impl SuiteReport {
    pub fn case_count(&self) -> usize {
        self.results.len()
    }

    pub fn pass_count(&self) -> usize {
        self.results.iter().filter(|r| r.failure.is_none()).count()
    }

    pub fn failures(&self) -> Vec<CaseFailure> {
        self.results
            .iter()
            .filter_map(|r| {
                r.failure.as_ref().map(|m| CaseFailure {
                    id: r.id.clone(),
                    message: m.clone(),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.failure.is_none())
    }
}

/// Discover and judge every case of `kind`.
///
/// Returns `Err` only for whole-run problems: configuration the suite needs
/// but lacks, or a fixture root that can not be listed. Every per-case problem
/// becomes a failed `CaseResult`.
pub fn run_suite(
    kind: SuiteKind,
    cfg: &ResolvedConfig,
    opts: &SuiteOptions,
) -> Result<SuiteReport, GateError> {
    if kind.needs_runner() {
        cfg.runner()?;
    }

    let dir = kind.fixture_dir(cfg);
    let Discovery { cases, incomplete } = match kind {
        SuiteKind::WellTyped | SuiteKind::IllTyped => Discovery {
            cases: discover_sources(&dir, "coh")?,
            incomplete: Vec::new(),
        },
        _ => discover(&dir, kind.required_files())?,
    };

    let cases: Vec<TestCase> = cases
        .into_iter()
        .filter(|c| opts.filter.as_ref().map_or(true, |re| re.is_match(&c.id)))
        .collect();

    tracing::info!(suite = kind.name(), dir = %dir.display(), cases = cases.len(), "running suite");

    let results = run_cases(kind, cfg, opts, &cases);

    Ok(SuiteReport {
        suite: kind.name(),
        results,
        incomplete: incomplete.into_iter().map(describe_incomplete).collect(),
    })
}

fn describe_incomplete(i: Incomplete) -> String {
    format!("{} (missing {})", i.id, i.missing.join(", "))
}

fn run_cases(
    kind: SuiteKind,
    cfg: &ResolvedConfig,
    opts: &SuiteOptions,
    cases: &[TestCase],
) -> Vec<CaseResult> {
    let jobs = opts.jobs.max(1).min(cases.len().max(1));
    if jobs == 1 {
        return cases.iter().map(|c| run_case(kind, cfg, opts, c)).collect();
    }

    // Worker `w` takes cases w, w + jobs, w + 2*jobs, ...; results are put back
    // in discovery order afterwards.
    let mut indexed: Vec<(usize, CaseResult)> = thread::scope(|s| {
        let handles: Vec<_> = (0..jobs)
            .map(|w| {
                s.spawn(move || {
                    cases
                        .iter()
                        .enumerate()
                        .skip(w)
                        .step_by(jobs)
                        .map(|(i, c)| (i, run_case(kind, cfg, opts, c)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(v) => v,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, r)| r).collect()
}

fn run_case(kind: SuiteKind, cfg: &ResolvedConfig, opts: &SuiteOptions, case: &TestCase) -> CaseResult {
    let outcome = judge(kind, cfg, opts, case);
    match &outcome {
        Ok(()) => tracing::info!(suite = kind.name(), case = %case.id, "PASS"),
        Err(e) => tracing::warn!(suite = kind.name(), case = %case.id, error = %e, "FAIL"),
    }
    CaseResult {
        id: case.id.clone(),
        failure: outcome.err().map(|e| e.to_string()),
    }
}

fn judge(kind: SuiteKind, cfg: &ResolvedConfig, opts: &SuiteOptions, case: &TestCase) -> Result<(), Failure> {
    if kind == SuiteKind::LockFilling {
        return gates::stress::check(cfg.runner()?, case, cfg.timeout);
    }

    match load_expectation(kind, case)? {
        Expectation::Structured(info) => {
            let dir = scratch_dir(case, opts)?;
            gates::deterministic::check(cfg, case, &info, dir.path())
        }
        Expectation::Golden(golden) => {
            let dir = scratch_dir(case, opts)?;
            gates::golden::check(cfg, case, &golden, dir.path())
        }
        Expectation::Invariant(inv) => {
            let dir = scratch_dir(case, opts)?;
            gates::invariant::check(cfg, case, &inv, dir.path())
        }
        Expectation::Label(label) => gates::typecheck::check(cfg, case, label),
    }
}

/// A fresh directory for one case's compiler artifacts, removed on drop
/// unless `keep_scratch` is set.
fn scratch_dir(case: &TestCase, opts: &SuiteOptions) -> Result<TempDir, GateError> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("cohgate-{}-", case.id))
        .keep(opts.keep_scratch)
        .tempdir()
        .map_err(|source| GateError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
    if opts.keep_scratch {
        tracing::info!(case = %case.id, scratch = %dir.path().display(), "keeping scratch directory");
    }
    Ok(dir)
}

/// Read the one expectation shape `kind` uses for `case`.
pub fn load_expectation(kind: SuiteKind, case: &TestCase) -> Result<Expectation, Failure> {
    Ok(match kind {
        SuiteKind::Deterministic => {
            Expectation::Structured(expect::load_test_info(&case.file(TEST_INFO_FILE))?)
        }
        SuiteKind::Golden => Expectation::Golden(expect::load_golden(
            &case.file(COMPILER_GOLDEN_FILE),
            &case.file(PROGRAM_GOLDEN_FILE),
        )?),
        SuiteKind::NonDeterministic => {
            Expectation::Invariant(expect::load_invariant(&case.file(INVARIANT_FILE))?)
        }
        SuiteKind::WellTyped => Expectation::Label(CorpusLabel::Accept),
        SuiteKind::IllTyped => Expectation::Label(CorpusLabel::Reject),
        SuiteKind::LockFilling => {
            return Err(Failure::BadFixture(
                "lock-filling cases carry no expectation of their own".to_string(),
            ))
        }
    })
}
