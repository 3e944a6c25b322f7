use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::expect::Invariant;

/// Errors that end the whole gate run before (or instead of) judging cases.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("missing configuration value `{name}` (set it in the config file, on the command line, or via {env})")]
    MissingConfig { name: &'static str, env: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lost track of running {program:?}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A program output line that is not a single base-10 integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line_no}: expected one integer, got {line:?}")]
pub struct ParseError {
    pub line_no: usize,
    pub line: String,
}

/// The stage of a case that a process belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Typecheck,
    Execute,
    Runner,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Compile => "compiler",
            Stage::Typecheck => "type checker",
            Stage::Execute => "program",
            Stage::Runner => "stress runner",
        })
    }
}

/// Why a single case failed. Always recoverable: the suite records it and moves on.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("expected to compile, but compiler exited with {code}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}")]
    CompileRejected {
        code: String,
        stdout: String,
        stderr: String,
    },

    #[error("expected not to compile, but compiler exited with 0")]
    CompileAccepted,

    #[error("expected executable not found: {0:?}")]
    MissingExecutable(PathBuf),

    #[error("outputs do not match\nexpected: {expected:?}\nactual:   {actual:?}")]
    OutputMismatch { expected: Vec<i64>, actual: Vec<i64> },

    #[error("program violated its output contract: {0}")]
    MalformedOutput(#[from] ParseError),

    #[error("{stage} output differs from golden file\n{diff}")]
    TextMismatch { stage: Stage, diff: String },

    #[error("invariant {invariant} violated: {detail}")]
    InvariantViolated { invariant: Invariant, detail: String },

    #[error("{stage} did not finish within {}s and was killed", .after.as_secs_f64())]
    Timeout { stage: Stage, after: Duration },

    #[error("runner exited with {code}\nstderr:\n{stderr}")]
    RunnerFailed { code: String, stderr: String },

    #[error("expected program to {expectation}, but type checker exited with {code}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}")]
    TypecheckMismatch {
        expectation: &'static str,
        code: String,
        stdout: String,
        stderr: String,
    },

    #[error("bad fixture: {0}")]
    BadFixture(String),

    #[error(transparent)]
    Gate(#[from] GateError),
}

/// Render an optional exit code the way failures print it.
pub fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
