//! Wrapper configuration: defaults, `.slimwraprc`, then `SLIMWRAP_*` environment.

use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;
use tracing::debug;

use crate::error::{Result, WrapError};

/// Settings shared by every launch of a model. Passed explicitly; there is no
/// process-wide default.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapperConfig {
    /// Simulator executable.
    pub executable: String,
    /// Arguments placed right after the executable, before seed and definitions.
    pub leading_args: Vec<String>,
    pub define_flag: String,
    pub seed_flag: String,
    /// Flag that makes the simulator only check a script.
    pub check_flag: String,
    /// Where temp files are created; the system temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
    /// Leave exchange files on disk after each run for debugging.
    pub keep_temp_files: bool,
    pub timeout: Option<Duration>,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            executable: "slim".into(),
            leading_args: Vec::new(),
            define_flag: "-d".into(),
            seed_flag: "-s".into(),
            check_flag: "-c".into(),
            temp_dir: None,
            keep_temp_files: false,
            timeout: None,
        }
    }
}

impl WrapperConfig {
    /// Defaults overlaid with the rc file, then with the environment.
    pub fn load() -> Result<Self> {
        let path = default_config_path();
        let mut map = read_rc(&path);
        for (k, v) in env::vars() {
            if k.starts_with("SLIMWRAP_") {
                map.insert(k, v);
            }
        }
        Self::from_map(&map)
    }

    /// Builds a config from `SLIMWRAP_*` keys. Unknown keys are ignored; a
    /// malformed timeout is an error.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let mut cfg = Self::default();
        let get = |k: &str| map.get(k).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(v) = get("SLIMWRAP_EXECUTABLE") {
            cfg.executable = v.to_string();
        }
        if let Some(v) = get("SLIMWRAP_LEADING_ARGS") {
            cfg.leading_args = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = get("SLIMWRAP_DEFINE_FLAG") {
            cfg.define_flag = v.to_string();
        }
        if let Some(v) = get("SLIMWRAP_SEED_FLAG") {
            cfg.seed_flag = v.to_string();
        }
        if let Some(v) = get("SLIMWRAP_CHECK_FLAG") {
            cfg.check_flag = v.to_string();
        }
        if let Some(v) = get("SLIMWRAP_TEMP_DIR") {
            cfg.temp_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SLIMWRAP_KEEP_TEMP_FILES") {
            cfg.keep_temp_files = v.eq_ignore_ascii_case("true") || v == "1";
        }
        if let Some(v) = get("SLIMWRAP_TIMEOUT") {
            let timeout = parse_timeout(v).map_err(|reason| WrapError::Config {
                key: "SLIMWRAP_TIMEOUT".into(),
                reason,
            })?;
            cfg.timeout = Some(timeout);
        }
        Ok(cfg)
    }
}

/// Seconds as a positive, finite number, e.g. `2.5`.
pub fn parse_timeout(raw: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("'{raw}' must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("'{raw}': {e}"))
}

fn read_rc(path: &Path) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Ok(file) = fs::File::open(path) else {
        return map;
    };
    debug!(path = %path.display(), "reading config");
    for line in BufReader::new(file).lines().map_while(|line| line.ok()) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}

pub fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("slimwrap").join(".slimwraprc")
}
