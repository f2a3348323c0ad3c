//! Configuration of [`MamlSampler`](super::MamlSampler).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`MamlSampler`](super::MamlSampler).
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct MamlSamplerConfig {
    /// The number of rollouts collected for each task.
    pub rollouts_per_meta_task: usize,

    /// The number of tasks in the meta-batch.
    pub meta_batch_size: usize,

    /// Maximum length of a rollout.
    pub max_path_length: usize,

    /// If `true`, rollouts run on worker threads.
    pub parallel: bool,

    /// The number of environment copies per task.
    ///
    /// Defaults to `rollouts_per_meta_task`, one environment per rollout.
    pub envs_per_task: Option<usize>,
}

impl Default for MamlSamplerConfig {
    fn default() -> Self {
        Self {
            rollouts_per_meta_task: 1,
            meta_batch_size: 1,
            max_path_length: 100,
            parallel: false,
            envs_per_task: None,
        }
    }
}

impl MamlSamplerConfig {
    /// Sets the number of rollouts per task.
    pub fn rollouts_per_meta_task(mut self, v: usize) -> Self {
        self.rollouts_per_meta_task = v;
        self
    }

    /// Sets the size of the meta-batch.
    pub fn meta_batch_size(mut self, v: usize) -> Self {
        self.meta_batch_size = v;
        self
    }

    /// Sets the maximum length of a rollout.
    pub fn max_path_length(mut self, v: usize) -> Self {
        self.max_path_length = v;
        self
    }

    /// Enables worker threads.
    pub fn parallel(mut self, v: bool) -> Self {
        self.parallel = v;
        self
    }

    /// Sets the number of environment copies per task.
    pub fn envs_per_task(mut self, v: usize) -> Self {
        self.envs_per_task = Some(v);
        self
    }

    /// Constructs [`MamlSamplerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`MamlSamplerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
