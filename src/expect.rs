//! Expected outcomes, as authored in fixture files.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Failure;

/// `test_info.json` for the structured deterministic protocol.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestInfo {
    pub compiles: bool,
    /// Required when `compiles` is true; ignored otherwise.
    #[serde(default)]
    pub output: Option<Vec<i64>>,
}

impl TestInfo {
    /// The ordered values a compiling program must print.
    pub fn expected_output(&self) -> Result<&[i64], Failure> {
        self.output.as_deref().ok_or_else(|| {
            Failure::BadFixture("`compiles` is true but `output` is missing".to_string())
        })
    }
}

/// Expected compiler and program text for the golden protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenPair {
    pub compiler_out: String,
    pub prog_out: String,
}

/// The label a type-acceptance corpus puts on every file in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusLabel {
    Accept,
    Reject,
}

/// An order-independent property of a concurrent program's output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "invariant", rename_all = "snake_case")]
pub enum Invariant {
    /// Sorted output is exactly `start, start + 1, ..., start + n - 1`.
    PermutationOfRange {
        n: u64,
        #[serde(default)]
        start: i64,
    },
    /// Output holds `1` exactly `n` times and `-1` exactly `n` times. Other
    /// values are ignored.
    SignedCountPair { n: u64 },
    /// Sorted output equals the sorted `values`.
    SortedEquals { values: Vec<i64> },
}

/// Which of the expectation shapes a case carries. A suite only ever sees one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    Structured(TestInfo),
    Golden(GoldenPair),
    Label(CorpusLabel),
    Invariant(Invariant),
}

pub fn load_test_info(path: &Path) -> Result<TestInfo, Failure> {
    let bytes = read(path)?;
    let info: TestInfo = serde_json::from_slice(&bytes)
        .map_err(|e| Failure::BadFixture(format!("parse {}: {e}", path.display())))?;
    if info.compiles {
        info.expected_output()?;
    }
    Ok(info)
}

pub fn load_invariant(path: &Path) -> Result<Invariant, Failure> {
    let bytes = read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Failure::BadFixture(format!("parse {}: {e}", path.display())))
}

pub fn load_golden(compiler_out: &Path, prog_out: &Path) -> Result<GoldenPair, Failure> {
    Ok(GoldenPair {
        compiler_out: read_text(compiler_out)?,
        prog_out: read_text(prog_out)?,
    })
}

fn read(path: &Path) -> Result<Vec<u8>, Failure> {
    fs::read(path).map_err(|e| Failure::BadFixture(format!("read {}: {e}", path.display())))
}

fn read_text(path: &Path) -> Result<String, Failure> {
    let bytes = read(path)?;
    String::from_utf8(bytes)
        .map_err(|_| Failure::BadFixture(format!("{} is not UTF-8", path.display())))
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invariant::PermutationOfRange { n, start: 0 } => {
                write!(f, "permutation-of-range({n})")
            }
            Invariant::PermutationOfRange { n, start } => {
                write!(f, "permutation-of-range({n}, start={start})")
            }
            Invariant::SignedCountPair { n } => write!(f, "signed-count-pair({n})"),
            Invariant::SortedEquals { values } => write!(f, "sorted-equals({} values)", values.len()),
        }
    }
}

impl Invariant {
    /// Check `output` against the invariant. `Err` carries a short explanation
    /// naming the first thing that went wrong.
    pub fn check(&self, output: &[i64]) -> Result<(), String> {
        match self {
            Invariant::PermutationOfRange { n, start } => {
                let last = i64::try_from(n.saturating_sub(1))
                    .ok()
                    .and_then(|span| start.checked_add(span))
                    .ok_or_else(|| format!("range of {n} values from {start} overflows i64"))?;
                let mut sorted = output.to_vec();
                sorted.sort_unstable();
                check_sorted_against(&sorted, *start..=last, *n as usize)
            }
            Invariant::SignedCountPair { n } => {
                let counts = tally(output);
                let plus = counts.get(&1).copied().unwrap_or(0);
                let minus = counts.get(&-1).copied().unwrap_or(0);
                if plus != *n || minus != *n {
                    return Err(format!(
                        "expected {n} x 1 and {n} x -1, got {plus} x 1 and {minus} x -1"
                    ));
                }
                Ok(())
            }
            Invariant::SortedEquals { values } => {
                let mut want = values.clone();
                want.sort_unstable();
                let mut sorted = output.to_vec();
                sorted.sort_unstable();
                check_sorted_against(&sorted, want.iter().copied(), want.len())
            }
        }
    }
}

fn check_sorted_against(
    sorted: &[i64],
    expected: impl Iterator<Item = i64>,
    expected_len: usize,
) -> Result<(), String> {
    for (idx, (got, want)) in sorted.iter().zip(expected).enumerate() {
        if *got != want {
            return Err(format!(
                "sorted output differs at position {idx}: expected {want}, got {got}"
            ));
        }
    }
    if sorted.len() != expected_len {
        return Err(format!(
            "expected {expected_len} values, got {}",
            sorted.len()
        ));
    }
    Ok(())
}

fn tally(output: &[i64]) -> BTreeMap<i64, u64> {
    let mut counts = BTreeMap::new();
    for v in output {
        *counts.entry(*v).or_insert(0) += 1;
    }
    counts
}
