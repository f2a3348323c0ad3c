//! Rollouts and processed samples.
use crate::error::GradVarError;
use anyhow::Result;
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, Axis};

/// Distribution parameters of the policy at the time an action was sampled.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentInfo {
    /// Mean of the Gaussian.
    pub mean: Array1<f64>,

    /// Logarithm of the standard deviation of the Gaussian.
    pub log_std: Array1<f64>,
}

/// A single rollout.
///
/// Row `t` of every matrix corresponds to time step `t`.
#[derive(Clone, Debug)]
pub struct Path {
    /// Observations, `T x obs_dim`.
    pub observations: Array2<f64>,

    /// Actions, `T x act_dim`.
    pub actions: Array2<f64>,

    /// Rewards, `T`.
    pub rewards: Array1<f64>,

    /// Means of the policy, `T x act_dim`.
    pub means: Array2<f64>,

    /// Log standard deviations of the policy, `T x act_dim`.
    pub log_stds: Array2<f64>,
}

impl Path {
    /// Builds a path from per-step vectors.
    pub fn from_steps(
        observations: &[Array1<f64>],
        actions: &[Array1<f64>],
        rewards: Vec<f64>,
        agent_infos: &[AgentInfo],
    ) -> Result<Self> {
        let t = rewards.len();
        if observations.len() != t || actions.len() != t || agent_infos.len() != t {
            return Err(GradVarError::ShapeMismatch {
                context: "Path::from_steps".to_string(),
                expected: vec![t],
                actual: vec![observations.len(), actions.len(), agent_infos.len()],
            }
            .into());
        }
        let means: Vec<Array1<f64>> = agent_infos.iter().map(|i| i.mean.clone()).collect();
        let log_stds: Vec<Array1<f64>> = agent_infos.iter().map(|i| i.log_std.clone()).collect();
        Ok(Self {
            observations: stack_rows(observations)?,
            actions: stack_rows(actions)?,
            rewards: Array1::from(rewards),
            means: stack_rows(&means)?,
            log_stds: stack_rows(&log_stds)?,
        })
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if the path has no step.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Undiscounted sum of rewards.
    pub fn total_reward(&self) -> f64 {
        self.rewards.sum()
    }
}

fn stack_rows(rows: &[Array1<f64>]) -> Result<Array2<f64>> {
    let dim = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut data = Vec::with_capacity(rows.len() * dim);
    for r in rows.iter() {
        if r.len() != dim {
            return Err(GradVarError::ShapeMismatch {
                context: "stack_rows".to_string(),
                expected: vec![dim],
                actual: vec![r.len()],
            }
            .into());
        }
        data.extend(r.iter());
    }
    Ok(Array2::from_shape_vec((rows.len(), dim), data)?)
}

/// Samples of one task after processing, flattened over paths.
#[derive(Clone, Debug)]
pub struct SamplesData {
    /// Observations, `N x obs_dim`.
    pub observations: Array2<f64>,

    /// Actions, `N x act_dim`.
    pub actions: Array2<f64>,

    /// Rewards, `N`.
    pub rewards: Array1<f64>,

    /// Discounted returns, `N`.
    pub returns: Array1<f64>,

    /// Advantage estimates, `N`.
    pub advantages: Array1<f64>,

    /// Baseline-adjusted rewards used by DICE objectives, `N`.
    pub adjusted_rewards: Option<Array1<f64>>,

    /// Means of the behaviour policy, `N x act_dim`.
    pub means: Array2<f64>,

    /// Log standard deviations of the behaviour policy, `N x act_dim`.
    pub log_stds: Array2<f64>,

    /// Lengths of the paths concatenated in this batch.
    pub path_lengths: Vec<usize>,
}

impl SamplesData {
    /// Concatenates paths. Returns and advantages are filled with zeros.
    pub fn from_paths(paths: &[Path]) -> Result<Self> {
        fn cat2(xs: Vec<ndarray::ArrayView2<f64>>) -> Result<Array2<f64>> {
            Ok(concatenate(Axis(0), &xs)?)
        }
        fn cat1(xs: Vec<ArrayView1<f64>>) -> Result<Array1<f64>> {
            Ok(concatenate(Axis(0), &xs)?)
        }
        if paths.is_empty() {
            return Err(GradVarError::InvalidConfig("no path to process".to_string()).into());
        }

        let rewards = cat1(paths.iter().map(|p| p.rewards.view()).collect())?;
        let n = rewards.len();
        Ok(Self {
            observations: cat2(paths.iter().map(|p| p.observations.view()).collect())?,
            actions: cat2(paths.iter().map(|p| p.actions.view()).collect())?,
            rewards,
            returns: Array1::zeros(n),
            advantages: Array1::zeros(n),
            adjusted_rewards: None,
            means: cat2(paths.iter().map(|p| p.means.view()).collect())?,
            log_stds: cat2(paths.iter().map(|p| p.log_stds.view()).collect())?,
            path_lengths: paths.iter().map(|p| p.len()).collect(),
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if there is no sample.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Number of paths.
    pub fn n_paths(&self) -> usize {
        self.path_lengths.len()
    }

    /// Half-open index ranges of the paths in the flattened arrays.
    pub fn path_ranges(&self) -> Vec<(usize, usize)> {
        let mut start = 0;
        self.path_lengths
            .iter()
            .map(|l| {
                let r = (start, start + l);
                start += l;
                r
            })
            .collect()
    }

    /// View of a flattened per-step array restricted to path `i`.
    pub fn path_slice<'a>(&self, xs: &'a Array1<f64>, i: usize) -> ArrayView1<'a, f64> {
        let (a, b) = self.path_ranges()[i];
        xs.slice(s![a..b])
    }
}
