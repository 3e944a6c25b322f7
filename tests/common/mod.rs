#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use coherence_gate::{FixturesCfg, ResolvedConfig};
use tempfile::TempDir;

/// Stands in for the real compiler. Programs are shell snippets; the
/// "compiled" executable is the snippet behind a shebang. Markers in the
/// source steer its behaviour:
///   #reject       exit 1 with a diagnostic (also under --only-typecheck)
///   #noexe        report success without writing an executable
///   #hang-compile sleep before compiling
///   #hang-check   sleep under --only-typecheck
pub const FAKE_COMPILER: &str = r#"#!/bin/sh
src=""
out=""
tc=0
while [ $# -gt 0 ]; do
  case "$1" in
    --input-file) src="$2"; shift 2 ;;
    --output-dir) out="$2"; shift 2 ;;
    --only-typecheck) tc=1; shift ;;
    *) echo "unknown argument: $1" >&2; exit 64 ;;
  esac
done
[ -n "$src" ] || { echo "missing --input-file" >&2; exit 64; }
if grep -q '^#reject' "$src"; then
  echo "error: program rejected" >&2
  exit 1
fi
if [ "$tc" = 1 ]; then
  if grep -q '^#hang-check' "$src"; then
    sleep 30
  fi
  exit 0
fi
[ -n "$out" ] || { echo "missing --output-dir" >&2; exit 64; }
if grep -q '^#hang-compile' "$src"; then
  sleep 30
fi
echo "compiled"
if grep -q '^#noexe' "$src"; then
  exit 0
fi
{ echo '#!/bin/sh'; cat "$src"; } > "$out/out"
chmod 755 "$out/out"
"#;

/// Stands in for the stress runner: fails when the case holds a `fail` file
/// and hangs when it holds a `hang` file.
pub const FAKE_RUNNER: &str = r#"#!/bin/sh
[ -d "$1" ] || { echo "not a directory: $1" >&2; exit 2; }
if [ -f "$1/hang" ]; then
  sleep 30
fi
if [ -f "$1/fail" ]; then
  echo "------Test case-------" >&2
  cat "$1/fail" >&2
  exit 1
fi
exit 0
"#;

pub struct Env {
    pub tools: TempDir,
    pub fixtures: TempDir,
    pub cfg: ResolvedConfig,
}

impl Env {
    pub fn new() -> Self {
        let tools = tempfile::tempdir().unwrap();
        let fixtures = tempfile::tempdir().unwrap();
        let compiler = install_script(tools.path(), "coherencec", FAKE_COMPILER);
        let runner = install_script(tools.path(), "lock_test_runner", FAKE_RUNNER);
        let cfg = ResolvedConfig {
            compiler,
            runner: Some(runner),
            timeout: Some(Duration::from_secs(60)),
            fixtures: FixturesCfg {
                root: fixtures.path().to_path_buf(),
                ..FixturesCfg::default()
            },
        };
        Env {
            tools,
            fixtures,
            cfg,
        }
    }

    /// Absolute directory of a suite under the fixture root.
    pub fn suite_dir(&self, rel: &Path) -> PathBuf {
        self.cfg.fixtures.resolve(rel)
    }
}

/// Place an executable script without holding a write handle to it in this
/// (multi-threaded) process, which would make exec fail with ETXTBSY.
pub fn install_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let staged = dir.join(format!("{name}.src"));
    fs::write(&staged, body).unwrap();
    let dest = dir.join(name);
    let st = Command::new("cp").arg(&staged).arg(&dest).status().unwrap();
    assert!(st.success(), "cp failed");
    fs::set_permissions(&dest, fs::Permissions::from_mode(0o755)).unwrap();
    dest
}

pub fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Shell body printing each value on its own line.
pub fn print_ints(values: &[i64]) -> String {
    values.iter().map(|v| format!("echo {v}\n")).collect()
}
