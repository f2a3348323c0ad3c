use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use gradvar::{
    params::read_params_record, run_experiment, run_sweep, HyperParams, RunOptions, SweepConfig,
    EXP_NAME,
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every combination of a hyperparameter grid
    Sweep {
        /// Grid in YAML or JSON; the built-in gradient-variance grid if omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Outputs are written under <BASE_DIR>/data
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,

        /// Validate and list the combinations without training
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Run a single experiment from a params.json record
    Run {
        /// Hyperparameter record
        #[arg(long)]
        params: PathBuf,

        /// Outputs are written under <BASE_DIR>/data
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,

        /// Subdirectory of the run
        #[arg(long)]
        run_name: Option<String>,
    },
}

fn dry_run(sweep: &SweepConfig) -> Result<()> {
    let mut n_invalid = 0;
    for (i, params) in sweep.expand().iter().enumerate() {
        match HyperParams::from_param_set(params) {
            Ok(hp) => info!("run_{}: algo = {}, seed = {}", i, hp.algo, hp.seed),
            Err(e) => {
                warn!("run_{}: {}", i, e);
                n_invalid += 1;
            }
        }
    }
    if n_invalid > 0 {
        bail!("{} of {} combinations are invalid", n_invalid, sweep.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Sweep {
            config,
            base_dir,
            dry_run: dry,
        } => {
            let sweep = match config {
                Some(path) => SweepConfig::load(path)?,
                None => SweepConfig::default(),
            };
            if dry {
                return dry_run(&sweep);
            }
            let options = RunOptions::default().base_dir(base_dir);
            let summary = run_sweep(run_experiment, &sweep, EXP_NAME, &options);
            if !summary.failed.is_empty() {
                bail!("{} of {} runs failed", summary.failed.len(), summary.n_runs());
            }
        }
        Command::Run {
            params,
            base_dir,
            run_name,
        } => {
            let params = read_params_record(params)?;
            let mut options = RunOptions::default().base_dir(base_dir);
            if let Some(name) = run_name {
                options = options.run_name(name);
            }
            let dir = run_experiment(&params, &options)?;
            info!("Finished: {:?}", dir);
        }
    }
    Ok(())
}
