use super::{standard_normal, Mlp, Nonlinearity};
use anyhow::Result;
use gradvar_core::{error::GradVarError, AgentInfo, MetaPolicy};
use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

const LOG_2PI: f64 = 1.837_877_066_409_345_3;

/// Configuration of [`MetaGaussianMlpPolicy`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct MetaGaussianMlpPolicyConfig {
    /// Name of the policy.
    pub name: String,

    /// Dimension of observations.
    pub obs_dim: usize,

    /// Dimension of actions.
    pub action_dim: usize,

    /// Number of tasks in the meta-batch.
    pub meta_batch_size: usize,

    /// Sizes of the hidden layers.
    pub hidden_sizes: Vec<usize>,

    /// If `true`, the log standard deviation is trained.
    pub learn_std: bool,

    /// Initial standard deviation.
    pub init_std: f64,

    /// Activation of the hidden layers, identity if `None`.
    pub hidden_nonlinearity: Option<Nonlinearity>,

    /// Activation of the output layer, identity if `None`.
    pub output_nonlinearity: Option<Nonlinearity>,
}

impl Default for MetaGaussianMlpPolicyConfig {
    fn default() -> Self {
        Self {
            name: "meta-policy".to_string(),
            obs_dim: 1,
            action_dim: 1,
            meta_batch_size: 1,
            hidden_sizes: vec![32, 32],
            learn_std: true,
            init_std: 1.0,
            hidden_nonlinearity: Some(Nonlinearity::Tanh),
            output_nonlinearity: None,
        }
    }
}

impl MetaGaussianMlpPolicyConfig {
    /// Sets dimensions of observations and actions.
    pub fn dims(mut self, obs_dim: usize, action_dim: usize) -> Self {
        self.obs_dim = obs_dim;
        self.action_dim = action_dim;
        self
    }

    /// Sets the size of the meta-batch.
    pub fn meta_batch_size(mut self, v: usize) -> Self {
        self.meta_batch_size = v;
        self
    }

    /// Sets the sizes of the hidden layers.
    pub fn hidden_sizes(mut self, v: Vec<usize>) -> Self {
        self.hidden_sizes = v;
        self
    }

    /// Sets if the standard deviation is trained.
    pub fn learn_std(mut self, v: bool) -> Self {
        self.learn_std = v;
        self
    }

    /// Sets the initial standard deviation.
    pub fn init_std(mut self, v: f64) -> Self {
        self.init_std = v;
        self
    }

    /// Sets the activations.
    pub fn nonlinearities(
        mut self,
        hidden: Option<Nonlinearity>,
        output: Option<Nonlinearity>,
    ) -> Self {
        self.hidden_nonlinearity = hidden;
        self.output_nonlinearity = output;
        self
    }

    /// Constructs [`MetaGaussianMlpPolicyConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`MetaGaussianMlpPolicyConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Gaussian policy with a state-independent, diagonal covariance and an MLP
/// mean.
///
/// Parameters are the MLP parameters followed by the log standard deviation
/// of each action dimension.
pub struct MetaGaussianMlpPolicy {
    config: MetaGaussianMlpPolicyConfig,
    mlp: Mlp,
    params: Array1<f64>,
    adapted: Vec<Array1<f64>>,
}

impl MetaGaussianMlpPolicy {
    /// Builds the policy with parameters initialized from `seed`.
    pub fn build(config: MetaGaussianMlpPolicyConfig, seed: u64) -> Result<Self> {
        if config.init_std <= 0.0 {
            return Err(GradVarError::InvalidConfig(format!(
                "init_std must be positive, got {}",
                config.init_std
            ))
            .into());
        }
        if config.meta_batch_size == 0 {
            return Err(GradVarError::InvalidConfig("meta_batch_size must be positive".into()).into());
        }

        let mlp = Mlp::new(
            config.obs_dim,
            &config.hidden_sizes,
            config.action_dim,
            config.hidden_nonlinearity,
            config.output_nonlinearity,
        );
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut params = mlp.init(&mut rng).to_vec();
        params.extend(std::iter::repeat(config.init_std.ln()).take(config.action_dim));
        let params = Array1::from(params);
        debug!(
            "Built {} with {} parameters (obs_dim = {}, action_dim = {})",
            config.name,
            params.len(),
            config.obs_dim,
            config.action_dim
        );

        Ok(Self {
            adapted: vec![params.clone(); config.meta_batch_size],
            mlp,
            params,
            config,
        })
    }

    /// Configuration of the policy.
    pub fn config(&self) -> &MetaGaussianMlpPolicyConfig {
        &self.config
    }

    fn check_params(&self, params: &Array1<f64>) -> Result<()> {
        if params.len() != self.params.len() {
            return Err(GradVarError::ShapeMismatch {
                context: "MetaGaussianMlpPolicy parameters".to_string(),
                expected: vec![self.params.len()],
                actual: vec![params.len()],
            }
            .into());
        }
        Ok(())
    }

    fn log_std<'a>(&self, params: &'a Array1<f64>) -> ArrayView1<'a, f64> {
        params.slice(s![self.mlp.num_params()..])
    }

    /// Mean actions for a batch of observations.
    pub fn means(&self, params: &Array1<f64>, obs: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_params(params)?;
        self.mlp.forward(params.view(), obs)
    }
}

impl MetaPolicy for MetaGaussianMlpPolicy {
    fn meta_batch_size(&self) -> usize {
        self.config.meta_batch_size
    }

    fn num_params(&self) -> usize {
        self.params.len()
    }

    fn flat_params(&self) -> Array1<f64> {
        self.params.clone()
    }

    fn set_flat_params(&mut self, params: &Array1<f64>) -> Result<()> {
        self.check_params(params)?;
        self.params.assign(params);
        Ok(())
    }

    fn adapted_params(&self, task: usize) -> Result<Array1<f64>> {
        self.adapted
            .get(task)
            .cloned()
            .ok_or_else(|| GradVarError::TaskIndex(task, self.adapted.len()).into())
    }

    fn set_adapted_params(&mut self, task: usize, params: Array1<f64>) -> Result<()> {
        self.check_params(&params)?;
        let n = self.adapted.len();
        let slot = self
            .adapted
            .get_mut(task)
            .ok_or(GradVarError::TaskIndex(task, n))?;
        *slot = params;
        Ok(())
    }

    fn switch_to_pre_update(&mut self) {
        for p in self.adapted.iter_mut() {
            p.assign(&self.params);
        }
    }

    fn get_action(
        &self,
        obs: &Array1<f64>,
        task: usize,
        rng: &mut SmallRng,
    ) -> Result<(Array1<f64>, AgentInfo)> {
        let params = self
            .adapted
            .get(task)
            .ok_or(GradVarError::TaskIndex(task, self.adapted.len()))?;
        let x = obs.clone().insert_axis(Axis(0));
        let mean = self.mlp.forward(params.view(), &x)?.row(0).to_owned();
        let log_std = self.log_std(params).to_owned();
        let action = ndarray::Zip::from(&mean)
            .and(&log_std)
            .map_collect(|m, s| m + s.exp() * standard_normal(rng));
        Ok((action, AgentInfo { mean, log_std }))
    }

    fn log_likelihood(
        &self,
        params: &Array1<f64>,
        obs: &Array2<f64>,
        actions: &Array2<f64>,
    ) -> Result<Array1<f64>> {
        let means = self.means(params, obs)?;
        let log_std = self.log_std(params);
        let inv_var = log_std.mapv(|s| (-2.0 * s).exp());
        let z = (actions - &means).mapv(|d| d * d) * &inv_var;
        let ll = z.sum_axis(Axis(1)) * -0.5
            - log_std.sum()
            - 0.5 * LOG_2PI * self.config.action_dim as f64;
        Ok(ll)
    }

    fn log_likelihood_gradient(
        &self,
        params: &Array1<f64>,
        obs: &Array2<f64>,
        actions: &Array2<f64>,
        weights: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        self.check_params(params)?;
        if weights.len() != obs.nrows() || actions.nrows() != obs.nrows() {
            return Err(GradVarError::ShapeMismatch {
                context: "log_likelihood_gradient".to_string(),
                expected: vec![obs.nrows()],
                actual: vec![actions.nrows(), weights.len()],
            }
            .into());
        }

        let (means, cache) = self.mlp.forward_cached(params.view(), obs)?;
        let log_std = self.log_std(params);
        let inv_var = log_std.mapv(|s| (-2.0 * s).exp());
        let w = weights.view().insert_axis(Axis(1));

        // d log N / d mean = (a - mean) / var
        let diff = actions - &means;
        let d_mean = &diff * &inv_var * &w;
        let mut grad = self.mlp.backward(params.view(), &cache, d_mean)?.to_vec();

        if self.config.learn_std {
            // d log N / d log_std = (a - mean)^2 / var - 1
            let d_log_std = ((&diff * &diff * &inv_var - 1.0) * &w).sum_axis(Axis(0));
            grad.extend(d_log_std.iter());
        } else {
            grad.extend(std::iter::repeat(0.0).take(self.config.action_dim));
        }
        Ok(Array1::from(grad))
    }

    fn snapshot(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "config": self.config,
            "params": self.params.to_vec(),
        }))
    }
}
