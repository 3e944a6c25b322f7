use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GateError;

/// One fixture: a directory (or, for type-acceptance corpora, a single file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Directory or file name; doubles as the reported test id.
    pub id: String,
    pub path: PathBuf,
}

impl TestCase {
    /// Path of a file inside a directory fixture.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

/// A directory that holds some, but not all, of the required files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incomplete {
    pub id: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub cases: Vec<TestCase>,
    pub incomplete: Vec<Incomplete>,
}

/// List the direct child directories of `root` that contain every file in
/// `required`, sorted by name.
///
/// Directories with none of the required files are ignored outright; ones
/// with only some are reported in `incomplete`. A missing `root` discovers
/// nothing.
pub fn discover(root: &Path, required: &[&str]) -> Result<Discovery, GateError> {
    let mut out = Discovery::default();
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "fixture root does not exist");
        return Ok(out);
    }

    for (id, path) in sorted_children(root)? {
        if !path.is_dir() {
            continue;
        }
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !path.join(name).is_file())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            out.cases.push(TestCase { id, path });
        } else if missing.len() < required.len() {
            tracing::warn!(fixture = %id, ?missing, "skipping incomplete fixture");
            out.incomplete.push(Incomplete { id, missing });
        }
    }
    Ok(out)
}

/// List the regular files directly under `dir` with the given extension,
/// sorted by name.
pub fn discover_sources(dir: &Path, extension: &str) -> Result<Vec<TestCase>, GateError> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "corpus directory does not exist");
        return Ok(Vec::new());
    }
    Ok(sorted_children(dir)?
        .into_iter()
        .filter(|(_, p)| p.is_file() && p.extension().is_some_and(|e| e == extension))
        .map(|(id, path)| TestCase { id, path })
        .collect())
}

fn sorted_children(dir: &Path) -> Result<Vec<(String, PathBuf)>, GateError> {
    let io = |source| GateError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut out = Vec::new();
    for ent in fs::read_dir(dir).map_err(io)? {
        let ent = ent.map_err(io)?;
        let name = ent.file_name().to_string_lossy().into_owned();
        out.push((name, ent.path()));
    }
    out.sort();
    Ok(out)
}
