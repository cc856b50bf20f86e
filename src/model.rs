//! A simulation script plus the machinery to launch it with parameters.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use rand::Rng;
use serde::Serialize;
use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

use crate::codec;
use crate::config::WrapperConfig;
use crate::eidos;
use crate::error::{Result, Stage, WrapError};
use crate::invocation::Invocation;
use crate::params::{ParameterSet, ResultSet};
use crate::runner::{self, ProcessOutput};
use crate::template::Template;

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Random in `[1, 2^32)` when unset.
    pub seed: Option<u64>,
    pub constants: ParameterSet,
    /// Treat a non-zero exit as an error.
    pub check: bool,
    /// Extra injected code, rendered against this run's exchange files.
    pub templates: Vec<Template>,
    /// Passed to the simulator after the seed.
    pub extra_args: Vec<String>,
    /// Overrides [`WrapperConfig::timeout`].
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: None,
            constants: ParameterSet::new(),
            check: true,
            templates: Vec::new(),
            extra_args: Vec::new(),
            timeout: None,
        }
    }
}

impl RunOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_constants(mut self, constants: ParameterSet) -> Self {
        self.constants = constants;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub seed: u64,
    #[serde(flatten)]
    pub output: ProcessOutput,
    /// `None` when the simulation wrote nothing to its output file.
    pub results: Option<ResultSet>,
    /// Set only when temp files are kept.
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
}

pub struct Model {
    config: WrapperConfig,
    script: TempPath,
    last_seed: Option<u64>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("script", &self.script.to_path_buf())
            .field("executable", &self.config.executable)
            .finish()
    }
}

pub fn random_seed() -> u64 {
    rand::thread_rng().gen_range(1..1u64 << 32)
}

fn path_arg(path: &Path) -> Result<String> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        WrapError::io(
            Stage::Run,
            format!("path {} is not valid UTF-8", path.display()),
            std::io::ErrorKind::InvalidInput.into(),
        )
    })
}

fn temp_file(config: &WrapperConfig, prefix: &str, stage: Stage) -> Result<TempPath> {
    let mut builder = Builder::new();
    builder.prefix(prefix);
    let file = match config.temp_dir.as_deref() {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    };
    file.map(|f| f.into_temp_path())
        .map_err(|e| WrapError::io(stage, "creating temp file", e))
}

impl Model {
    /// Copies `code` into a temp script and checks it with the simulator.
    pub async fn from_code(code: &str, config: WrapperConfig) -> Result<Self> {
        let script = temp_file(&config, "slimwrap-model-", Stage::Encode)?;
        fs::write(&script, code)
            .map_err(|e| WrapError::io(Stage::Encode, format!("writing {}", script.display()), e))?;
        let model = Self {
            config,
            script,
            last_seed: None,
        };
        model.check().await?;
        Ok(model)
    }

    pub async fn from_source(path: &Path, config: WrapperConfig) -> Result<Self> {
        let code = fs::read_to_string(path)
            .map_err(|e| WrapError::io(Stage::Encode, format!("reading {}", path.display()), e))?;
        Self::from_code(&code, config).await
    }

    /// Runs the simulator in check mode; a failure carries its stderr.
    pub async fn check(&self) -> Result<()> {
        let argv = Invocation::new(self.config.executable.as_str())
            .args(self.config.leading_args.iter().cloned())
            .arg(self.config.check_flag.as_str())
            .trailing(path_arg(&self.script)?)
            .into_args();
        let output = runner::launch(&argv, self.config.timeout).await?;
        if output.success() {
            Ok(())
        } else {
            Err(WrapError::InvalidModel {
                path: self.script.to_path_buf(),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.script
    }

    pub fn source(&self) -> Result<String> {
        fs::read_to_string(&self.script)
            .map_err(|e| WrapError::io(Stage::Run, format!("reading {}", self.script.display()), e))
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.config
    }

    pub fn last_seed(&self) -> Option<u64> {
        self.last_seed
    }

    /// Encodes constants, launches the simulator and decodes what it wrote.
    ///
    /// The simulator sees `SLIMWRAP_INPUT` and `SLIMWRAP_OUTPUT`, a
    /// `SLIM_WRAP_PARAMS` Dictionary of all constants, and one definition per
    /// constant. Exchange files are removed afterwards unless the config keeps
    /// them; when a run fails with kept files their paths are logged.
    pub async fn run(&mut self, options: &RunOptions) -> Result<RunOutcome> {
        let seed = options.seed.unwrap_or_else(random_seed);
        self.last_seed = Some(seed);

        let input = codec::encode(&options.constants, self.config.temp_dir.as_deref())?;
        let output = temp_file(&self.config, "slimwrap-results-", Stage::Run)?;

        let result = self.execute(seed, options, &input, &output).await;
        let (input_path, output_path) = self.release(input, output);
        let (process, results) = match result {
            Ok(done) => done,
            Err(e) => {
                if input_path.is_some() || output_path.is_some() {
                    warn!(
                        input = ?input_path,
                        output = ?output_path,
                        error = %e,
                        "run failed; exchange files kept"
                    );
                }
                return Err(e);
            }
        };

        Ok(RunOutcome {
            seed,
            output: process,
            results,
            input_path,
            output_path,
        })
    }

    async fn execute(
        &self,
        seed: u64,
        options: &RunOptions,
        input: &Path,
        output: &Path,
    ) -> Result<(ProcessOutput, Option<ResultSet>)> {
        let mut injected = Vec::with_capacity(3 + options.templates.len() + options.constants.len());
        for template in [Template::input_definition(), Template::output_definition()]
            .iter()
            .chain(&options.templates)
        {
            injected.push(template.render(Some(input), Some(output))?);
        }
        if !options.constants.is_empty() {
            injected.push(eidos::dictionary(&options.constants));
        }
        injected.extend(options.constants.iter().map(|(k, v)| eidos::define(k, v)));

        let argv = Invocation::new(self.config.executable.as_str())
            .args(self.config.leading_args.iter().cloned())
            .arg(self.config.seed_flag.as_str())
            .arg(seed.to_string())
            .args(options.extra_args.iter().cloned())
            .inject_all(&self.config.define_flag, injected)
            .trailing(path_arg(&self.script)?)
            .into_args();

        let timeout = options.timeout.or(self.config.timeout);
        let process = runner::launch(&argv, timeout).await?;
        let process = if options.check {
            runner::check(&argv, process)?
        } else {
            process
        };

        let written = fs::metadata(output)
            .map(|m| m.len() > 0)
            .map_err(|e| WrapError::io(Stage::Decode, format!("inspecting {}", output.display()), e))?;
        let results = if written {
            Some(codec::decode(output)?)
        } else {
            debug!(path = %output.display(), "no results written");
            None
        };
        Ok((process, results))
    }

    /// Deletes or keeps the exchange files. Failures are only logged.
    fn release(&self, input: TempPath, output: TempPath) -> (Option<PathBuf>, Option<PathBuf>) {
        let release_one = |path: TempPath| -> Option<PathBuf> {
            if self.config.keep_temp_files {
                match path.keep() {
                    Ok(p) => Some(p),
                    Err(e) => {
                        warn!(error = %e, "could not keep temporary file");
                        None
                    }
                }
            } else {
                let shown = path.display().to_string();
                if let Err(e) = path.close() {
                    warn!(path = %shown, error = %e, "could not delete temporary file");
                }
                None
            }
        };
        (release_one(input), release_one(output))
    }
}
