use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;
use serde::Serialize;

use coherence_gate::cli::gate_cli::Cli;
use coherence_gate::{load_config, run_suite, CaseFailure, Config, SuiteOptions, SuiteReport};

#[derive(Debug, Serialize)]
struct SuiteSummary {
    suite: &'static str,
    case_count: usize,
    pass_count: usize,
    failures: Vec<CaseFailure>,
    incomplete: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GateSummary {
    status: &'static str,
    suites: Vec<SuiteSummary>,
}

fn main() {
    if let Err(e) = tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish(),
    ) {
        eprintln!("warning: tracing already initialised: {e}");
    }

    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            2
        }
    };
    std::process::exit(code);
}

/// `Ok(true)` when every selected suite passed. `Err` is a configuration or
/// environment problem that stopped the run.
fn run(cli: &Cli) -> Result<bool> {
    let mut cfg = match cli.config_path() {
        Some(p) => load_config(&p)?,
        None => Config::default(),
    };
    cli.apply_overrides(&mut cfg);
    let cfg = cfg.with_env_fallbacks();

    let suites = cli.selected_suites();
    let resolved = cfg.resolve(suites.iter().any(|s| s.needs_runner()))?;

    let filter = cli
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("bad --filter regex")?;
    let opts = SuiteOptions {
        filter,
        jobs: cli.jobs,
        keep_scratch: cli.keep_scratch,
    };

    let mut reports = Vec::with_capacity(suites.len());
    for kind in suites {
        let report = run_suite(kind, &resolved, &opts)
            .with_context(|| format!("suite {}", kind.name()))?;
        if !cli.json {
            print_transcript(&report);
        }
        reports.push(report);
    }

    let passed: usize = reports.iter().map(SuiteReport::pass_count).sum();
    let total: usize = reports.iter().map(SuiteReport::case_count).sum();
    let ok = reports.iter().all(SuiteReport::all_passed);

    if cli.json {
        let summary = GateSummary {
            status: if ok { "pass" } else { "fail" },
            suites: reports.iter().map(summarize_suite).collect(),
        };
        let json = serde_json::to_string_pretty(&summary).context("serialize summary")?;
        println!("{json}");
    } else {
        println!();
        println!("GATE_SUMMARY passed={} failed={}", passed, total - passed);
    }
    Ok(ok)
}

fn print_transcript(report: &SuiteReport) {
    for note in &report.incomplete {
        println!("SKIP {}/{note}", report.suite);
    }
    for r in &report.results {
        println!();
        println!("=== {}/{} ===", report.suite, r.id);
        match &r.failure {
            None => println!("PASS"),
            Some(msg) => println!("FAIL: {msg}"),
        }
    }
}

fn summarize_suite(report: &SuiteReport) -> SuiteSummary {
    SuiteSummary {
        suite: report.suite,
        case_count: report.case_count(),
        pass_count: report.pass_count(),
        failures: report.failures(),
        incomplete: report.incomplete.clone(),
    }
}
