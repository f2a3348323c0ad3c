use super::clip;
use anyhow::Result;
use gradvar_core::{record::Record, MetaEnv, Path, Step};
use ndarray::Array1;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Configuration of [`NormalizedEnv`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct NormalizedEnvConfig {
    /// Multiplier of rewards.
    pub scale_reward: f64,

    /// Normalizes observations with running statistics if `true`.
    pub normalize_obs: bool,

    /// Normalizes rewards with running statistics if `true`.
    pub normalize_reward: bool,

    /// Update rate of the running statistics of observations.
    pub obs_alpha: f64,

    /// Update rate of the running statistics of rewards.
    pub reward_alpha: f64,
}

impl Default for NormalizedEnvConfig {
    fn default() -> Self {
        Self {
            scale_reward: 1.0,
            normalize_obs: false,
            normalize_reward: false,
            obs_alpha: 0.001,
            reward_alpha: 0.001,
        }
    }
}

impl NormalizedEnvConfig {
    /// Sets the reward multiplier.
    pub fn scale_reward(mut self, v: f64) -> Self {
        self.scale_reward = v;
        self
    }

    /// Enables or disables normalization of observations.
    pub fn normalize_obs(mut self, v: bool) -> Self {
        self.normalize_obs = v;
        self
    }

    /// Enables or disables normalization of rewards.
    pub fn normalize_reward(mut self, v: bool) -> Self {
        self.normalize_reward = v;
        self
    }
}

/// Wrapper rescaling actions from `[-1, 1]` to the bounds of the wrapped
/// environment, with optional running normalization of observations and
/// rewards.
#[derive(Clone, Debug)]
pub struct NormalizedEnv<E: MetaEnv> {
    env: E,
    config: NormalizedEnvConfig,
    obs_mean: Array1<f64>,
    obs_var: Array1<f64>,
    reward_mean: f64,
    reward_var: f64,
}

impl<E: MetaEnv> NormalizedEnv<E> {
    /// Wraps an environment.
    pub fn new(env: E, config: NormalizedEnvConfig) -> Self {
        let d = env.obs_dim();
        Self {
            env,
            config,
            obs_mean: Array1::zeros(d),
            obs_var: Array1::ones(d),
            reward_mean: 0.0,
            reward_var: 1.0,
        }
    }

    /// The wrapped environment.
    pub fn inner(&self) -> &E {
        &self.env
    }

    fn apply_normalize_obs(&mut self, obs: Array1<f64>) -> Array1<f64> {
        let a = self.config.obs_alpha;
        self.obs_mean = &self.obs_mean * (1.0 - a) + &(&obs * a);
        let d = &obs - &self.obs_mean;
        self.obs_var = &self.obs_var * (1.0 - a) + &(&d * &d * a);
        (&obs - &self.obs_mean) / &(self.obs_var.mapv(f64::sqrt) + 1e-8)
    }

    fn apply_normalize_reward(&mut self, reward: f64) -> f64 {
        let a = self.config.reward_alpha;
        self.reward_mean = (1.0 - a) * self.reward_mean + a * reward;
        self.reward_var = (1.0 - a) * self.reward_var + a * (reward - self.reward_mean).powi(2);
        reward / (self.reward_var.sqrt() + 1e-8)
    }

    /// Maps an action in `[-1, 1]` to the bounds of the wrapped environment.
    pub fn scale_action(&self, act: &Array1<f64>) -> Array1<f64> {
        let (lb, ub) = self.env.action_bounds();
        let scaled = &lb + &((act + 1.0) * 0.5 * (&ub - &lb));
        clip(&scaled, &lb, &ub)
    }
}

impl<E: MetaEnv> MetaEnv for NormalizedEnv<E> {
    type Task = E::Task;

    fn obs_dim(&self) -> usize {
        self.env.obs_dim()
    }

    fn act_dim(&self) -> usize {
        self.env.act_dim()
    }

    fn action_bounds(&self) -> (Array1<f64>, Array1<f64>) {
        let d = self.env.act_dim();
        (Array1::from_elem(d, -1.0), Array1::from_elem(d, 1.0))
    }

    fn sample_tasks(&mut self, n: usize, rng: &mut SmallRng) -> Vec<E::Task> {
        self.env.sample_tasks(n, rng)
    }

    fn set_task(&mut self, task: E::Task) {
        self.env.set_task(task)
    }

    fn get_task(&self) -> E::Task {
        self.env.get_task()
    }

    fn reset(&mut self) -> Result<Array1<f64>> {
        let obs = self.env.reset()?;
        if self.config.normalize_obs {
            Ok(self.apply_normalize_obs(obs))
        } else {
            Ok(obs)
        }
    }

    fn step(&mut self, act: &Array1<f64>) -> Result<Step> {
        let scaled = self.scale_action(act);
        let Step { obs, reward, done } = self.env.step(&scaled)?;
        let obs = if self.config.normalize_obs {
            self.apply_normalize_obs(obs)
        } else {
            obs
        };
        let reward = if self.config.normalize_reward {
            self.apply_normalize_reward(reward)
        } else {
            reward
        };
        Ok(Step::new(obs, reward * self.config.scale_reward, done))
    }

    fn log_diagnostics(&self, paths: &[Path], prefix: &str) -> Record {
        self.env.log_diagnostics(paths, prefix)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::env::PointEnvRandDirec;
    use ndarray::array;

    #[test]
    fn test_scale_action() {
        let env = NormalizedEnv::new(PointEnvRandDirec::new(), NormalizedEnvConfig::default());
        assert_eq!(env.scale_action(&array![-1.0, 1.0]), array![-0.5, 0.5]);
        assert_eq!(env.scale_action(&array![0.0, 3.0]), array![0.0, 0.5]);
        assert_eq!(env.action_bounds().1, array![1.0, 1.0]);
    }

    #[test]
    fn test_scale_reward() -> Result<()> {
        let config = NormalizedEnvConfig::default().scale_reward(2.0);
        let mut env = NormalizedEnv::new(PointEnvRandDirec::new(), config);
        let mut raw = PointEnvRandDirec::new();
        env.reset()?;
        raw.reset()?;
        let r = env.step(&array![1.0, 0.0])?.reward;
        let r_raw = raw.step(&array![0.5, 0.0])?.reward;
        assert!((r - 2.0 * r_raw).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_normalize_obs_is_finite() -> Result<()> {
        let config = NormalizedEnvConfig::default().normalize_obs(true);
        let mut env = NormalizedEnv::new(PointEnvRandDirec::new(), config);
        env.reset()?;
        for _ in 0..10 {
            let step = env.step(&array![1.0, -1.0])?;
            assert!(step.obs.iter().all(|v| v.is_finite()));
        }
        Ok(())
    }
}
