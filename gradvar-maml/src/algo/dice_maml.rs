use super::{
    base::{dice_gradient, MamlBase},
    objective::dice_objective,
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

/// Configuration of [`DiceMaml`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DiceMamlConfig {
    /// Number of tasks in the meta-batch.
    pub meta_batch_size: usize,

    /// Step size of inner adaptation.
    pub inner_lr: f64,

    /// Learning rate of the meta-optimizer.
    pub learning_rate: f64,

    /// Number of inner adaptation steps.
    pub num_inner_grad_steps: usize,

    /// Discount factor of the DICE objective.
    pub discount: f64,
}

impl Default for DiceMamlConfig {
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

impl DiceMamlConfig {
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

    /// Constructs [`DiceMamlConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DiceMamlConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// MAML with the DICE objective in both the inner and the outer step.
pub struct DiceMaml {
    config: DiceMamlConfig,
    base: MamlBase,
}

impl DiceMaml {
    /// Constructs the algorithm.
    pub fn new(config: DiceMamlConfig) -> Self {
        let base = MamlBase::new(
            config.meta_batch_size,
            config.inner_lr,
            config.learning_rate,
            config.num_inner_grad_steps,
        );
        Self { config, base }
    }

    /// Configuration of the algorithm.
    pub fn config(&self) -> &DiceMamlConfig {
        &self.config
    }
}

impl<P: MetaPolicy> MetaAlgo<P> for DiceMaml {
    fn num_inner_grad_steps(&self) -> usize {
        self.base.num_inner_grad_steps
    }

    fn inner_gradient(
        &self,
        policy: &P,
        task: usize,
        samples: &SamplesData,
    ) -> Result<Array1<f64>> {
        dice_gradient(policy, task, samples, self.config.discount)
    }

    fn adapt(&mut self, policy: &mut P, samples: &[SamplesData]) -> Result<Record> {
        let discount = self.config.discount;
        let mut objective = 0.0;
        for (task, s) in samples.iter().enumerate() {
            let params = policy.adapted_params(task)?;
            let ll = policy.log_likelihood(&params, &s.observations, &s.actions)?;
            objective += dice_objective(s, &ll, discount)?;
        }
        let record = self
            .base
            .adapt(policy, samples, |p, t, s| dice_gradient(p, t, s, discount))?;
        Ok(record.merge(Record::from_scalar(
            "InnerObjective",
            objective / samples.len().max(1) as f64,
        )))
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
