pub mod cli;
pub mod diff;
pub mod discover;
pub mod error;
pub mod expect;
pub mod gates;
pub mod normalize;
pub mod process;
pub mod suite;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use crate::error::{Failure, GateError, ParseError};
pub use crate::process::{invoke, ProcessResult};
pub use crate::suite::{run_suite, CaseFailure, CaseResult, SuiteKind, SuiteOptions, SuiteReport};

/// Environment variable the compiler path falls back to.
pub const COMPILER_ENV: &str = "COH_COMPILER";
/// Environment variable the stress-runner path falls back to.
pub const RUNNER_ENV: &str = "LOCK_TEST_RUNNER";

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// The on-disk gate configuration (`coh_gate.toml`). Every field is optional
/// here; `resolve` decides what is actually required.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub compiler: ToolCfg,
    #[serde(default)]
    pub runner: ToolCfg,
    #[serde(default)]
    pub limits: LimitsCfg,
    #[serde(default)]
    pub fixtures: FixturesCfg,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolCfg {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LimitsCfg {
    /// Deadline for every spawned process. `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LimitsCfg {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Where each suite's fixtures live. Relative entries are joined onto `root`.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct FixturesCfg {
    pub root: PathBuf,
    pub deterministic: PathBuf,
    pub golden: PathBuf,
    pub non_deterministic: PathBuf,
    pub well_typed: PathBuf,
    pub ill_typed: PathBuf,
    pub lock_filling: PathBuf,
}

impl Default for FixturesCfg {
    fn default() -> Self {
        Self {
            root: PathBuf::from("tests"),
            deterministic: PathBuf::from("e2e_tests/deterministic_tests"),
            golden: PathBuf::from("e2e_tests/golden_tests"),
            non_deterministic: PathBuf::from("e2e_tests/non_deterministic_tests"),
            well_typed: PathBuf::from("type_checking_tests/well_typed_programs"),
            ill_typed: PathBuf::from("type_checking_tests/ill_typed_programs"),
            lock_filling: PathBuf::from("lock_filling_tests/lock_test_data"),
        }
    }
}

impl FixturesCfg {
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let s = fs::read_to_string(path).with_context(|| format!("read config {path:?}"))?;
    let cfg: Config = toml::from_str(&s).with_context(|| format!("parse TOML {path:?}"))?;
    Ok(cfg)
}

/// Everything a suite needs, with required values known to be present.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub compiler: PathBuf,
    pub runner: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub fixtures: FixturesCfg,
}

impl ResolvedConfig {
    pub fn runner(&self) -> Result<&Path, GateError> {
        self.runner.as_deref().ok_or(GateError::MissingConfig {
            name: "runner.path",
            env: RUNNER_ENV,
        })
    }
}

impl Config {
    /// Fill unset tool paths from `COH_COMPILER` / `LOCK_TEST_RUNNER`.
    pub fn with_env_fallbacks(mut self) -> Self {
        self.apply_fallbacks(|k| std::env::var_os(k).map(PathBuf::from));
        self
    }

    fn apply_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<PathBuf>) {
        if self.compiler.path.is_none() {
            self.compiler.path = lookup(COMPILER_ENV).filter(|p| !p.as_os_str().is_empty());
        }
        if self.runner.path.is_none() {
            self.runner.path = lookup(RUNNER_ENV).filter(|p| !p.as_os_str().is_empty());
        }
    }

    /// Check required values before any case runs. The runner is only
    /// required when `require_runner` is set.
    pub fn resolve(&self, require_runner: bool) -> Result<ResolvedConfig, GateError> {
        let compiler = self.compiler.path.clone().ok_or(GateError::MissingConfig {
            name: "compiler.path",
            env: COMPILER_ENV,
        })?;
        if require_runner && self.runner.path.is_none() {
            return Err(GateError::MissingConfig {
                name: "runner.path",
                env: RUNNER_ENV,
            });
        }
        Ok(ResolvedConfig {
            compiler,
            runner: self.runner.path.clone(),
            timeout: match self.limits.timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            fixtures: self.fixtures.clone(),
        })
    }
}

pub fn path_arg(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}
