//! Hyperparameter grids and a local sweep executor.
use crate::{
    hyperparams::EnvRef,
    params::{NamedRef, ParamSet, ParamValue},
    runner::RunOptions,
};
use anyhow::Result;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// A grid of hyperparameter values.
///
/// Each key maps to the list of values it takes in the sweep. The grid
/// expands to the cross product of all lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweepConfig {
    grid: BTreeMap<String, Vec<ParamValue>>,
}

impl Default for SweepConfig {
    /// The gradient-variance sweep over seeds and algorithm branches.
    fn default() -> Self {
        let int = ParamValue::Int;
        let float = ParamValue::Float;
        Self::empty()
            .set("seed", vec![int(35), int(76), int(34), int(92)])
            .set("algo", vec!["VPG_DICE".into(), "VPG".into()])
            .set("sampling_rounds", vec![int(10)])
            .set("env", vec![EnvRef::PointRandDirec.named_ref().into()])
            .set("rollouts_per_meta_task", vec![int(40)])
            .set("max_path_length", vec![int(100)])
            .set("parallel", vec![true.into()])
            .set("discount", vec![float(0.99)])
            .set("normalize_adv", vec![true.into()])
            .set("positive_adv", vec![false.into()])
            .set("hidden_sizes", vec![ParamValue::Tuple(vec![int(64), int(64)])])
            .set("learn_std", vec![true.into()])
            .set("hidden_nonlinearity", vec![NamedRef::function("tanh").into()])
            .set("output_nonlinearity", vec![ParamValue::None])
            .set("inner_lr", vec![float(0.1)])
            .set("learning_rate", vec![float(1e-3)])
            .set("n_itr", vec![int(301)])
            .set("meta_batch_size", vec![int(20)])
            .set("num_inner_grad_steps", vec![int(1)])
            .set("scope", vec![ParamValue::None])
    }
}

impl SweepConfig {
    /// A grid without keys.
    pub fn empty() -> Self {
        Self {
            grid: BTreeMap::new(),
        }
    }

    /// Sets the values of `key`, replacing previous ones.
    pub fn set(mut self, key: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.grid.insert(key.into(), values);
        self
    }

    /// Values of `key`.
    pub fn get(&self, key: &str) -> Option<&[ParamValue]> {
        self.grid.get(key).map(|vs| vs.as_slice())
    }

    /// Number of combinations.
    pub fn len(&self) -> usize {
        self.grid.values().map(|vs| vs.len()).product()
    }

    /// Returns `true` if the grid has no combination.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The cross product of the grid.
    ///
    /// Keys are iterated in sorted order and values in declared order, so
    /// the last key in sorted order varies fastest.
    pub fn expand(&self) -> Vec<ParamSet> {
        if self.grid.is_empty() {
            return vec![ParamSet::new()];
        }
        let keys: Vec<&String> = self.grid.keys().collect();
        self.grid
            .values()
            .map(|vs| vs.iter())
            .multi_cartesian_product()
            .map(|values| {
                keys.iter()
                    .map(|k| k.to_string())
                    .zip(values.into_iter().cloned())
                    .collect::<ParamSet>()
            })
            .collect()
    }

    /// Loads a grid from a JSON file (`.json`) or a YAML file (otherwise).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rdr = BufReader::new(File::open(path)?);
        let grid = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_reader(rdr)?,
            _ => serde_yaml::from_reader(rdr)?,
        };
        Ok(grid)
    }

    /// Saves the grid as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Outcome of a sweep.
#[derive(Debug, Default)]
pub struct SweepSummary {
    /// Directories of the runs that finished.
    pub succeeded: Vec<PathBuf>,

    /// Index and error message of the runs that failed.
    pub failed: Vec<(usize, String)>,
}

impl SweepSummary {
    /// Number of runs.
    pub fn n_runs(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Runs every combination of `sweep` with `run_fn`, one after another.
///
/// Run `i` writes to `<base_dir>/data/<exp_name>/run_<i>`. A failed run is
/// logged and the sweep continues with the next combination.
pub fn run_sweep<F>(
    mut run_fn: F,
    sweep: &SweepConfig,
    exp_name: &str,
    options: &RunOptions,
) -> SweepSummary
where
    F: FnMut(&ParamSet, &RunOptions) -> Result<PathBuf>,
{
    let combinations = sweep.expand();
    let n = combinations.len();
    let mut summary = SweepSummary::default();
    info!("Sweep {}: {} runs", exp_name, n);

    for (i, params) in combinations.iter().enumerate() {
        let options = options
            .clone()
            .exp_name(exp_name)
            .run_name(format!("run_{}", i));
        info!("Run {}/{} in {:?}", i + 1, n, options.experiment_dir());
        match run_fn(params, &options) {
            Ok(dir) => summary.succeeded.push(dir),
            Err(e) => {
                warn!("Run {} failed: {:#}", i, e);
                summary.failed.push((i, format!("{:#}", e)));
            }
        }
    }

    info!(
        "Sweep {} finished: {} succeeded, {} failed",
        exp_name,
        summary.succeeded.len(),
        summary.failed.len()
    );
    summary
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::bail;
    use tempdir::TempDir;

    #[test]
    fn test_default_grid() {
        let sweep = SweepConfig::default();
        assert_eq!(sweep.len(), 8);
        let runs = sweep.expand();
        assert_eq!(runs.len(), 8);
        assert!(runs.iter().all(|p| p.len() == 20));

        // "seed" is the last key in sorted order
        assert_eq!(runs[0]["algo"], "VPG_DICE".into());
        assert_eq!(runs[0]["seed"], ParamValue::Int(35));
        assert_eq!(runs[1]["seed"], ParamValue::Int(76));
        assert_eq!(runs[4]["algo"], "VPG".into());
        assert_eq!(runs[7]["seed"], ParamValue::Int(92));
    }

    #[test]
    fn test_empty_values() {
        let sweep = SweepConfig::empty()
            .set("seed", vec![ParamValue::Int(1)])
            .set("algo", vec![]);
        assert!(sweep.is_empty());
        assert!(sweep.expand().is_empty());
        assert_eq!(SweepConfig::empty().expand(), vec![ParamSet::new()]);
    }

    #[test]
    fn test_load_yaml_and_json() -> Result<()> {
        let dir = TempDir::new("sweep")?;
        let sweep = SweepConfig::empty()
            .set("seed", vec![ParamValue::Int(1), ParamValue::Int(2)])
            .set("hidden_nonlinearity", vec![NamedRef::function("relu").into()]);
        let path = dir.path().join("sweep.yaml");
        sweep.save(&path)?;
        assert_eq!(SweepConfig::load(&path)?, sweep);

        let path = dir.path().join("sweep.json");
        std::fs::write(&path, r#"{"algo": ["DICE", "VPG"], "scope": [null]}"#)?;
        let sweep = SweepConfig::load(&path)?;
        assert_eq!(sweep.get("algo").unwrap().len(), 2);
        assert_eq!(sweep.get("scope").unwrap(), &[ParamValue::None]);
        Ok(())
    }

    #[test]
    fn test_run_sweep_continues_after_failure() {
        let sweep = SweepConfig::empty().set(
            "seed",
            vec![ParamValue::Int(0), ParamValue::Int(1), ParamValue::Int(2)],
        );
        let mut names = vec![];
        let summary = run_sweep(
            |params, options| {
                names.push(options.run_name.clone());
                if params["seed"] == ParamValue::Int(1) {
                    bail!("diverged");
                }
                Ok(options.experiment_dir())
            },
            &sweep,
            "test_sweep",
            &RunOptions::default().base_dir("/tmp"),
        );

        assert_eq!(summary.n_runs(), 3);
        assert_eq!(summary.failed, vec![(1, "diverged".to_string())]);
        assert_eq!(
            summary.succeeded[1],
            PathBuf::from("/tmp/data/test_sweep/run_2")
        );
        assert_eq!(names[0].as_deref(), Some("run_0"));
    }
}
