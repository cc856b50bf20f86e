use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use slimwrap::config::parse_timeout;

#[derive(Parser, Debug, Clone)]
#[command(name = "slimwrap", about = "Sublaunch SLiM simulations with parameters and parsed results", version)]
pub struct Cli {
    /// Log debug details (argument lists, temp files) to stderr.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check a model script without running it.
    Check {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        #[command(flatten)]
        launcher: LauncherArgs,
    },

    /// Run a model one or more times.
    Run(RunArgs),

    /// Write a JSON parameter object in the tagged data format.
    Encode {
        #[arg(value_name = "PARAMS_JSON")]
        params: PathBuf,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print a tagged data file as JSON.
    Decode {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Overrides for the wrapper configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct LauncherArgs {
    /// Simulator executable (default: SLIMWRAP_EXECUTABLE or `slim`).
    #[arg(long)]
    pub executable: Option<String>,

    /// Kill the simulator after this many seconds.
    #[arg(long, value_name = "SECONDS", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Keep parameter and result files for debugging.
    #[arg(long = "keep-temp")]
    pub keep_temp: bool,

    /// Directory for temporary files.
    #[arg(long = "temp-dir")]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Seed of the first replicate; later replicates add their index.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Number of replicates.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub replicates: usize,

    /// Define a constant; the value is parsed as JSON, falling back to a string.
    /// Can be used multiple times: -D mu=1e-7 -D m='[[1,2],[3,4]]'
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", action = clap::ArgAction::Append)]
    pub defines: Vec<String>,

    /// JSON object of constants; -D entries take precedence.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Do not fail when the simulator exits non-zero.
    #[arg(long = "no-check")]
    pub no_check: bool,

    /// Print a value from each replicate's results.
    #[arg(long, value_name = "NAME", action = clap::ArgAction::Append)]
    pub collect: Vec<String>,

    /// Print outcomes as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub launcher: LauncherArgs,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run() {
        let cli = <Cli as Parser>::try_parse_from([
            "slimwrap", "run", "model.slim", "-n", "3", "-s", "5", "-D", "mu=1e-7", "-D", "N=500",
            "--timeout", "1.5", "--json",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.replicates, 3);
        assert_eq!(args.seed, Some(5));
        assert_eq!(args.defines, ["mu=1e-7", "N=500"]);
        assert_eq!(args.launcher.timeout, Some(Duration::from_millis(1500)));
        assert!(args.json);
    }

    #[test]
    fn non_positive_timeout_is_rejected() {
        for bad in ["0", "-1", "NaN", "inf", "soon"] {
            let parsed =
                <Cli as Parser>::try_parse_from(["slimwrap", "check", "m.slim", "--timeout", bad]);
            assert!(parsed.is_err(), "{bad}");
        }
    }

    #[test]
    fn negative_seed_is_rejected() {
        assert!(<Cli as Parser>::try_parse_from(["slimwrap", "run", "m.slim", "-s", "-1"]).is_err());
        assert!(<Cli as Parser>::try_parse_from(["slimwrap", "run", "m.slim", "-s", "a"]).is_err());
    }
}
