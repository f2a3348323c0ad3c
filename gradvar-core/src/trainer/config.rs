//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The number of outer iterations.
    pub n_itr: usize,

    /// Index of the first iteration, used when resuming from a snapshot.
    pub start_itr: usize,

    /// The number of inner adaptation steps.
    pub num_inner_grad_steps: usize,

    /// The number of repeated sampling rounds per iteration.
    pub sampling_rounds: usize,

    /// Seed of task sampling and exploration noise.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_itr: 1000,
            start_itr: 0,
            num_inner_grad_steps: 1,
            sampling_rounds: 1,
            seed: 0,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of outer iterations.
    pub fn n_itr(mut self, v: usize) -> Self {
        self.n_itr = v;
        self
    }

    /// Sets the index of the first iteration.
    pub fn start_itr(mut self, v: usize) -> Self {
        self.start_itr = v;
        self
    }

    /// Sets the number of inner adaptation steps.
    pub fn num_inner_grad_steps(mut self, v: usize) -> Self {
        self.num_inner_grad_steps = v;
        self
    }

    /// Sets the number of sampling rounds per iteration.
    pub fn sampling_rounds(mut self, v: usize) -> Self {
        self.sampling_rounds = v;
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trainer_config() -> Result<()> {
        let config = TrainerConfig::default()
            .n_itr(301)
            .sampling_rounds(10)
            .num_inner_grad_steps(1)
            .seed(35);

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer_config.yaml");
        config.save(&path)?;
        let config_ = TrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
