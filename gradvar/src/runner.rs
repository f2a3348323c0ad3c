//! Runs a single experiment from a hyperparameter set.
use crate::{
    components::Components,
    hyperparams::{EnvRef, HyperParams},
    params::{write_params_record, ParamSet, PARAMS_JSON},
};
use anyhow::Result;
use gradvar_core::{
    logger::{ExperimentLogger, LoggerConfig, OutputFormat, SnapshotMode},
    MetaEnv,
};
use gradvar_maml::env::{PointEnvRandDirec, PointEnvRandGoal};
use log::info;
use std::path::{Path, PathBuf};

/// Name of the experiment, used as the directory under `data/`.
pub const EXP_NAME: &str = "gradient_variance_v2";

/// Gap of `itr_<n>.json` snapshots.
pub const SNAPSHOT_GAP: usize = 50;

/// Where and how a run writes its outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Base directory; outputs go to `<base_dir>/data/<exp_name>`.
    pub base_dir: PathBuf,

    /// Name of the experiment.
    pub exp_name: String,

    /// Subdirectory of the run, if any.
    pub run_name: Option<String>,

    /// Output formats of the logger.
    pub formats: Vec<OutputFormat>,

    /// Snapshot policy.
    pub snapshot_mode: SnapshotMode,

    /// Number of gap snapshots to keep.
    pub max_gap_snapshots: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            exp_name: EXP_NAME.to_string(),
            run_name: None,
            formats: vec![OutputFormat::Stdout, OutputFormat::Log, OutputFormat::Csv],
            snapshot_mode: SnapshotMode::LastGap(SNAPSHOT_GAP),
            max_gap_snapshots: None,
        }
    }
}

impl RunOptions {
    /// Sets the base directory.
    pub fn base_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.base_dir = v.into();
        self
    }

    /// Sets the name of the experiment.
    pub fn exp_name(mut self, v: impl Into<String>) -> Self {
        self.exp_name = v.into();
        self
    }

    /// Sets the name of the run.
    pub fn run_name(mut self, v: impl Into<String>) -> Self {
        self.run_name = Some(v.into());
        self
    }

    /// Sets the output formats.
    pub fn formats(mut self, v: Vec<OutputFormat>) -> Self {
        self.formats = v;
        self
    }

    /// Sets the snapshot policy.
    pub fn snapshot_mode(mut self, v: SnapshotMode) -> Self {
        self.snapshot_mode = v;
        self
    }

    /// Keeps only the `v` most recent gap snapshots.
    pub fn max_gap_snapshots(mut self, v: usize) -> Self {
        self.max_gap_snapshots = Some(v);
        self
    }

    /// Directory of the run.
    pub fn experiment_dir(&self) -> PathBuf {
        experiment_dir(&self.base_dir, &self.exp_name, self.run_name.as_deref())
    }

    fn logger_config(&self) -> LoggerConfig {
        let config = LoggerConfig::new(self.experiment_dir())
            .formats(self.formats.clone())
            .snapshot_mode(self.snapshot_mode);
        match self.max_gap_snapshots {
            Some(n) => config.max_gap_snapshots(n),
            None => config,
        }
    }
}

/// `<base_dir>/data/<exp_name>[/<run_name>]`.
pub fn experiment_dir(base_dir: &Path, exp_name: &str, run_name: Option<&str>) -> PathBuf {
    let dir = base_dir.join("data").join(exp_name);
    match run_name {
        Some(name) => dir.join(name),
        None => dir,
    }
}

fn train<E: MetaEnv + 'static>(
    hp: &HyperParams,
    env: E,
    logger: &mut ExperimentLogger,
) -> Result<()> {
    let mut trainer = Components::build(hp, env)?.into_trainer()?;
    trainer.train(logger)
}

/// Runs one experiment and returns its directory.
///
/// The hyperparameters are validated before anything is written, so an
/// invalid set leaves no directory behind. The set is recorded verbatim in
/// `params.json`.
pub fn run_experiment(params: &ParamSet, options: &RunOptions) -> Result<PathBuf> {
    let hp = HyperParams::from_param_set(params)?;

    let mut logger = ExperimentLogger::new(options.logger_config())?;
    let dir = logger.dir().to_path_buf();
    write_params_record(params, dir.join(PARAMS_JSON))?;
    info!(
        "Run {} with seed {} on {}",
        hp.algo,
        hp.seed,
        hp.env.path()
    );

    match hp.env {
        EnvRef::PointRandDirec => train(&hp, PointEnvRandDirec::new(), &mut logger)?,
        EnvRef::PointRandGoal => train(&hp, PointEnvRandGoal::new(), &mut logger)?,
    }
    Ok(dir)
}
