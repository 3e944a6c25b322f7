use std::path::PathBuf;

use clap::Parser;

use crate::suite::SuiteKind;
use crate::Config;

pub const DEFAULT_CONFIG: &str = "coh_gate.toml";

#[derive(Parser, Debug)]
#[command(name = "cohgate")]
#[command(about = "Conformance gate for the Coherence compiler and the programs it builds")]
pub struct Cli {
    /// Gate configuration file [default: coh_gate.toml, if present].
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Suite to run; repeat for several. Runs all suites when omitted.
    #[arg(long = "suite", value_enum)]
    pub suites: Vec<SuiteKind>,

    /// Only run cases whose id matches this regex.
    #[arg(long)]
    pub filter: Option<String>,

    /// Number of cases to run at once within a suite.
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Print a JSON summary instead of the per-case transcript.
    #[arg(long)]
    pub json: bool,

    /// Leave per-case scratch directories behind.
    #[arg(long)]
    pub keep_scratch: bool,

    /// Compiler executable (overrides config and COH_COMPILER).
    #[arg(long)]
    pub compiler: Option<PathBuf>,

    /// Stress-runner executable (overrides config and LOCK_TEST_RUNNER).
    #[arg(long)]
    pub runner: Option<PathBuf>,

    /// Per-process deadline in seconds; 0 disables it.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Base directory for the fixture paths in the config.
    #[arg(long)]
    pub fixtures_root: Option<PathBuf>,
}

impl Cli {
    /// Fold command-line overrides into a loaded config.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(p) = &self.compiler {
            cfg.compiler.path = Some(p.clone());
        }
        if let Some(p) = &self.runner {
            cfg.runner.path = Some(p.clone());
        }
        if let Some(secs) = self.timeout_secs {
            cfg.limits.timeout_secs = secs;
        }
        if let Some(root) = &self.fixtures_root {
            cfg.fixtures.root = root.clone();
        }
    }

    /// The config file to load: the explicit one, else the default when it exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(p) => Some(p.clone()),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG);
                p.is_file().then_some(p)
            }
        }
    }

    pub fn selected_suites(&self) -> Vec<SuiteKind> {
        if self.suites.is_empty() {
            SuiteKind::ALL.to_vec()
        } else {
            self.suites.clone()
        }
    }
}
