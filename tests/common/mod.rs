//! Shared fixtures: a stand-in simulator written in POSIX sh.

#![allow(dead_code)]

use std::{fs, path::PathBuf};

use slimwrap::WrapperConfig;
use tempfile::TempDir;

/// Behaves like `slim` for the flags the wrapper uses. The script under test
/// selects what happens through marker words:
/// INVALID fails the check, ECHO copies the parameter file to the output file,
/// SEED writes the seed as a result, ARGV prints the arguments it received,
/// FAIL exits 2 with "boom", SLEEP hangs.
pub const FAKE_SLIM: &str = r#"
all="$*"
check=0
seed=""
while [ $# -gt 1 ]; do
  case "$1" in
    -c) check=1; shift ;;
    -s) seed="$2"; shift 2 ;;
    -d) case "$2" in SLIMWRAP_*) eval "$2" ;; esac; shift 2 ;;
    *) shift ;;
  esac
done
script="$1"
if grep -q INVALID "$script"; then echo "syntax error in model" >&2; exit 1; fi
if [ "$check" -eq 1 ]; then exit 0; fi
if grep -q SLEEP "$script"; then sleep 5; fi
if grep -q ECHO "$script"; then cp "$SLIMWRAP_INPUT" "$SLIMWRAP_OUTPUT"; fi
if grep -q SEED "$script"; then printf 'seed integer %s\n' "$seed" > "$SLIMWRAP_OUTPUT"; fi
if grep -q COPY "$script"; then cp "$SLIMWRAP_INPUT" "$SLIMWRAP_COPY"; fi
if grep -q ARGV "$script"; then printf '%s\n' "$all"; fi
if grep -q FAIL "$script"; then echo boom >&2; exit 2; fi
echo "ran with seed $seed"
"#;

pub struct Fixture {
    /// Holds the fake simulator.
    pub bin: TempDir,
    /// Scratch space for exchange files.
    pub scratch: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let bin = tempfile::tempdir().unwrap();
        fs::write(bin.path().join("fake-slim.sh"), FAKE_SLIM).unwrap();
        Self {
            bin,
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    pub fn fake_slim(&self) -> PathBuf {
        self.bin.path().join("fake-slim.sh")
    }

    /// Runs the fake through `sh` so no exec permission is needed.
    pub fn config(&self) -> WrapperConfig {
        WrapperConfig {
            executable: "sh".into(),
            leading_args: vec![self.fake_slim().to_string_lossy().into_owned()],
            temp_dir: Some(self.scratch.path().to_path_buf()),
            ..WrapperConfig::default()
        }
    }

    /// Files in the scratch dir other than model scripts.
    pub fn leftovers(&self) -> Vec<PathBuf> {
        fs::read_dir(self.scratch.path())
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                !p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("slimwrap-model-"))
            })
            .collect()
    }
}
