mod cli;

use std::{
    fs,
    io::{self, Write},
};

use anyhow::{anyhow, bail, Context, Result};
use cli::{Command, LauncherArgs, RunArgs};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value as Json;
use slimwrap::{
    codec,
    sublaunch::{gather, sublaunch},
    Model, ParameterSet, RunOptions, RunOutcome, Value, WrapperConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(io::stderr))
        .init();

    match args.command {
        Command::Check { script, launcher } => {
            Model::from_source(&script, load_config(&launcher)?).await?;
            println!("{}: {}", "ok".green(), script.display());
            Ok(())
        }
        Command::Run(run) => run_replicates(run).await,
        Command::Encode { params, out } => {
            let text = fs::read_to_string(&params)
                .with_context(|| format!("reading {}", params.display()))?;
            let json: Json = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", params.display()))?;
            let encoded = codec::to_string(&ParameterSet::from_json(&json)?);
            match out {
                Some(path) => fs::write(&path, encoded)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => io::stdout().write_all(encoded.as_bytes())?,
            }
            Ok(())
        }
        Command::Decode { file } => {
            let set = codec::decode(&file)?;
            println!("{}", serde_json::to_string_pretty(&set.to_json())?);
            Ok(())
        }
    }
}

/// Config file and environment first, then command-line overrides.
fn load_config(args: &LauncherArgs) -> Result<WrapperConfig> {
    let mut cfg = WrapperConfig::load()?;
    if let Some(exe) = &args.executable {
        cfg.executable = exe.clone();
    }
    if let Some(timeout) = args.timeout {
        cfg.timeout = Some(timeout);
    }
    if args.keep_temp {
        cfg.keep_temp_files = true;
    }
    if let Some(dir) = &args.temp_dir {
        cfg.temp_dir = Some(dir.clone());
    }
    Ok(cfg)
}

/// `NAME=VALUE`, where VALUE is JSON or else taken as a plain string.
fn parse_define(raw: &str) -> Result<(String, Value)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    let json = serde_json::from_str::<Json>(value.trim())
        .unwrap_or_else(|_| Json::String(value.to_string()));
    Ok((name.to_string(), Value::from_json(name, &json)?))
}

fn constants(run: &RunArgs) -> Result<ParameterSet> {
    let mut set = match &run.params {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let json: Json = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            ParameterSet::from_json(&json)?
        }
        None => ParameterSet::new(),
    };
    for raw in &run.defines {
        let (name, value) = parse_define(raw)?;
        set.insert(name, value)?;
    }
    Ok(set)
}

async fn run_replicates(run: RunArgs) -> Result<()> {
    if run.replicates == 0 {
        bail!("--replicates must be at least 1");
    }
    let options = RunOptions {
        seed: run.seed,
        constants: constants(&run)?,
        check: !run.no_check,
        ..Default::default()
    };
    let mut model = Model::from_source(&run.script, load_config(&run.launcher)?).await?;
    let outcomes = sublaunch(&mut model, &options, run.replicates).await?;

    if run.json {
        let reports: Vec<ReplicateReport> = outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| ReplicateReport {
                replicate: i + 1,
                outcome,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let color = io::stdout().is_terminal();
    for (i, o) in outcomes.iter().enumerate() {
        let code = o.output.code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        let header = format!("replicate {} seed {} exit {}", i + 1, o.seed, code);
        if !color {
            println!("{header}");
        } else if o.output.success() {
            println!("{}", header.green());
        } else {
            println!("{}", header.red());
        }
        if run.collect.is_empty() {
            if let Some(results) = &o.results {
                println!("{}", results.to_json());
            }
        }
        if let Some(p) = &o.input_path {
            println!("  input:  {}", p.display());
        }
        if let Some(p) = &o.output_path {
            println!("  output: {}", p.display());
        }
    }
    for name in &run.collect {
        let values: Vec<Json> = gather(&outcomes, name).into_iter().map(Value::to_json).collect();
        let label = if color { name.cyan().to_string() } else { name.clone() };
        println!("{label}: {}", Json::Array(values));
    }
    Ok(())
}

/// One entry of `run --json` output.
#[derive(Serialize)]
struct ReplicateReport<'a> {
    replicate: usize,
    #[serde(flatten)]
    outcome: &'a RunOutcome,
}
