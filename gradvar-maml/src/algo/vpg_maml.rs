use super::{
    base::{vpg_gradient, MamlBase},
    InnerType,
};
use anyhow::Result;
use gradvar_core::{record::Record, MetaAlgo, MetaPolicy, SamplesData};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`VpgMaml`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct VpgMamlConfig {
    /// Number of tasks in the meta-batch.
    pub meta_batch_size: usize,

    /// Step size of inner adaptation.
    pub inner_lr: f64,

    /// Learning rate of the meta-optimizer.
    pub learning_rate: f64,

    /// Number of inner adaptation steps.
    pub num_inner_grad_steps: usize,

    /// Objective of the inner step.
    pub inner_type: InnerType,
}

impl Default for VpgMamlConfig {
    fn default() -> Self {
        Self {
            meta_batch_size: 20,
            inner_lr: 0.1,
            learning_rate: 1e-3,
            num_inner_grad_steps: 1,
            inner_type: InnerType::LikelihoodRatio,
        }
    }
}

impl VpgMamlConfig {
    /// Sets the size of the meta-batch.
    pub fn meta_batch_size(mut self, v: usize) -> Self {
        self.meta_batch_size = v;
        self
    }

    /// Sets the inner step size.
    pub fn inner_lr(mut self, v: f64) -> Self {
        self.inner_lr = v;
        self
    }

    /// Sets the learning rate of the meta-optimizer.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.learning_rate = v;
        self
    }

    /// Sets the number of inner adaptation steps.
    pub fn num_inner_grad_steps(mut self, v: usize) -> Self {
        self.num_inner_grad_steps = v;
        self
    }

    /// Sets the objective of the inner step.
    pub fn inner_type(mut self, v: InnerType) -> Self {
        self.inner_type = v;
        self
    }

    /// Constructs [`VpgMamlConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`VpgMamlConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// MAML with likelihood-ratio objectives on advantages in both steps.
///
/// The inner step uses `inner_type`; the outer step always uses the
/// likelihood ratio to the behaviour policy of the post-update samples.
pub struct VpgMaml {
    config: VpgMamlConfig,
    base: MamlBase,
}

impl VpgMaml {
    /// Constructs the algorithm.
    pub fn new(config: VpgMamlConfig) -> Self {
        let base = MamlBase::new(
            config.meta_batch_size,
            config.inner_lr,
            config.learning_rate,
            config.num_inner_grad_steps,
        );
        Self { config, base }
    }

    /// Configuration of the algorithm.
    pub fn config(&self) -> &VpgMamlConfig {
        &self.config
    }
}

impl<P: MetaPolicy> MetaAlgo<P> for VpgMaml {
    fn num_inner_grad_steps(&self) -> usize {
        self.base.num_inner_grad_steps
    }

    fn inner_gradient(
        &self,
        policy: &P,
        task: usize,
        samples: &SamplesData,
    ) -> Result<Array1<f64>> {
        vpg_gradient(policy, task, samples, self.config.inner_type)
    }

    fn adapt(&mut self, policy: &mut P, samples: &[SamplesData]) -> Result<Record> {
        let inner_type = self.config.inner_type;
        self.base
            .adapt(policy, samples, |p, t, s| vpg_gradient(p, t, s, inner_type))
    }

    fn meta_gradient(&self, policy: &P, samples: &[SamplesData]) -> Result<Array1<f64>> {
        self.base.meta_gradient(policy, samples, |p, t, s| {
            vpg_gradient(p, t, s, InnerType::LikelihoodRatio)
        })
    }

    fn optimize_policy(&mut self, policy: &mut P, meta_gradient: &Array1<f64>) -> Result<Record> {
        self.base.optimize(policy, meta_gradient)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_inner_type_in_yaml() -> Result<()> {
        let config: VpgMamlConfig = serde_yaml::from_str(
            "meta_batch_size: 20\ninner_lr: 0.1\nlearning_rate: 0.001\nnum_inner_grad_steps: 1\ninner_type: Dice\n",
        )?;
        assert_eq!(config, VpgMamlConfig::default().inner_type(InnerType::Dice));
        Ok(())
    }
}
