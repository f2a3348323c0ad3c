//! Environment.
use super::Path;
use crate::record::Record;
use anyhow::Result;
use ndarray::Array1;
use rand::rngs::SmallRng;
use std::fmt::Debug;

/// Result of an environment step.
#[derive(Clone, Debug)]
pub struct Step {
    /// Observation after the step.
    pub obs: Array1<f64>,

    /// Reward of the step.
    pub reward: f64,

    /// `true` if the episode ended.
    pub done: bool,
}

impl Step {
    /// Constructs a [`Step`].
    pub fn new(obs: Array1<f64>, reward: f64, done: bool) -> Self {
        Self { obs, reward, done }
    }
}

/// An environment with a distribution over tasks.
///
/// The sampler keeps one clone of the environment per slot, so
/// implementations must be cheap to clone and movable to worker threads.
pub trait MetaEnv: Clone + Send {
    /// A task of the environment, e.g. a goal or a direction.
    type Task: Clone + Debug + Send + Sync;

    /// Dimension of the observation.
    fn obs_dim(&self) -> usize;

    /// Dimension of the action.
    fn act_dim(&self) -> usize;

    /// Lower and upper bounds of actions.
    fn action_bounds(&self) -> (Array1<f64>, Array1<f64>);

    /// Samples `n` tasks.
    fn sample_tasks(&mut self, n: usize, rng: &mut SmallRng) -> Vec<Self::Task>;

    /// Sets the task used in subsequent episodes.
    fn set_task(&mut self, task: Self::Task);

    /// Returns the current task.
    fn get_task(&self) -> Self::Task;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Array1<f64>>;

    /// Performs an environment step.
    fn step(&mut self, act: &Array1<f64>) -> Result<Step>;

    /// Diagnostic values computed from the given paths.
    #[allow(unused_variables)]
    fn log_diagnostics(&self, paths: &[Path], prefix: &str) -> Record {
        Record::empty()
    }
}
