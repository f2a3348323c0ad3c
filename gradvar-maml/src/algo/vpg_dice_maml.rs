use super::{
    base::{dice_gradient, vpg_gradient, MamlBase},
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

/// Configuration of [`VpgDiceMaml`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct VpgDiceMamlConfig {
    /// Number of tasks in the meta-batch.
    pub meta_batch_size: usize,

    /// Step size of inner adaptation.
    pub inner_lr: f64,

    /// Learning rate of the meta-optimizer.
    pub learning_rate: f64,

    /// Number of inner adaptation steps.
    pub num_inner_grad_steps: usize,

    /// Discount factor of the outer DICE objective.
    pub discount: f64,
}

impl Default for VpgDiceMamlConfig {
    fn default() -> Self {
        Self {
            meta_batch_size: 20,
            inner_lr: 0.1,
            learning_rate: 1e-3,
            num_inner_grad_steps: 1,
            discount: 0.99,
        }
    }
}

impl VpgDiceMamlConfig {
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

    /// Sets the discount factor.
    pub fn discount(mut self, v: f64) -> Self {
        self.discount = v;
        self
    }

    /// Constructs [`VpgDiceMamlConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`VpgDiceMamlConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// MAML with a likelihood-ratio inner step on advantages and the DICE
/// objective in the outer step.
///
/// The samples need both advantages and adjusted rewards, as produced by
/// [`DiceMamlSampleProcessor`](crate::sample_processor::DiceMamlSampleProcessor)
/// with a return baseline.
pub struct VpgDiceMaml {
    config: VpgDiceMamlConfig,
    base: MamlBase,
}

impl VpgDiceMaml {
    /// Constructs the algorithm.
    pub fn new(config: VpgDiceMamlConfig) -> Self {
        let base = MamlBase::new(
            config.meta_batch_size,
            config.inner_lr,
            config.learning_rate,
            config.num_inner_grad_steps,
        );
        Self { config, base }
    }

    /// Configuration of the algorithm.
    pub fn config(&self) -> &VpgDiceMamlConfig {
        &self.config
    }
}

impl<P: MetaPolicy> MetaAlgo<P> for VpgDiceMaml {
    fn num_inner_grad_steps(&self) -> usize {
        self.base.num_inner_grad_steps
    }

    fn inner_gradient(
        &self,
        policy: &P,
        task: usize,
        samples: &SamplesData,
    ) -> Result<Array1<f64>> {
        vpg_gradient(policy, task, samples, InnerType::LikelihoodRatio)
    }

    fn adapt(&mut self, policy: &mut P, samples: &[SamplesData]) -> Result<Record> {
        self.base.adapt(policy, samples, |p, t, s| {
            vpg_gradient(p, t, s, InnerType::LikelihoodRatio)
        })
    }

    fn meta_gradient(&self, policy: &P, samples: &[SamplesData]) -> Result<Array1<f64>> {
        let discount = self.config.discount;
        self.base
            .meta_gradient(policy, samples, |p, t, s| dice_gradient(p, t, s, discount))
    }

    fn optimize_policy(&mut self, policy: &mut P, meta_gradient: &Array1<f64>) -> Result<Record> {
        self.base.optimize(policy, meta_gradient)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_vpg_dice_maml_config() -> Result<()> {
        let config = VpgDiceMamlConfig::default().inner_lr(0.05).meta_batch_size(4);
        let dir = TempDir::new("vpg_dice_maml_config")?;
        let path = dir.path().join("vpg_dice_maml_config.yaml");
        config.save(&path)?;
        assert_eq!(config, VpgDiceMamlConfig::load(&path)?);
        Ok(())
    }
}
