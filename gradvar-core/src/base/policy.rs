//! Meta-policy.
use super::AgentInfo;
use anyhow::Result;
use ndarray::{Array1, Array2};
use rand::rngs::SmallRng;

/// A stochastic policy used in gradient-based meta-learning.
///
/// Parameters are exposed as flat vectors. The policy holds the pre-update
/// parameters `θ` and, for each task `i` of the meta-batch, adapted
/// parameters `θ_i` used to act in that task. After
/// [`MetaPolicy::switch_to_pre_update`] every `θ_i` equals `θ`.
///
/// Gradients are computed through [`MetaPolicy::log_likelihood_gradient`],
/// which lets objectives stay agnostic to the network behind the policy.
pub trait MetaPolicy: Sync {
    /// Number of tasks in the meta-batch.
    fn meta_batch_size(&self) -> usize;

    /// Number of scalar parameters.
    fn num_params(&self) -> usize;

    /// Pre-update parameters.
    fn flat_params(&self) -> Array1<f64>;

    /// Sets pre-update parameters. Adapted parameters are not touched.
    fn set_flat_params(&mut self, params: &Array1<f64>) -> Result<()>;

    /// Parameters used to act in the given task.
    fn adapted_params(&self, task: usize) -> Result<Array1<f64>>;

    /// Sets the parameters used to act in the given task.
    fn set_adapted_params(&mut self, task: usize, params: Array1<f64>) -> Result<()>;

    /// Resets the parameters of all tasks to the pre-update parameters.
    fn switch_to_pre_update(&mut self);

    /// Samples an action in the given task.
    fn get_action(
        &self,
        obs: &Array1<f64>,
        task: usize,
        rng: &mut SmallRng,
    ) -> Result<(Array1<f64>, AgentInfo)>;

    /// Log-likelihoods `log π(a_n | s_n)` under parameters `params`.
    fn log_likelihood(
        &self,
        params: &Array1<f64>,
        obs: &Array2<f64>,
        actions: &Array2<f64>,
    ) -> Result<Array1<f64>>;

    /// `Σ_n w_n ∇ log π(a_n | s_n)` evaluated at `params`.
    fn log_likelihood_gradient(
        &self,
        params: &Array1<f64>,
        obs: &Array2<f64>,
        actions: &Array2<f64>,
        weights: &Array1<f64>,
    ) -> Result<Array1<f64>>;

    /// A serializable snapshot of the pre-update parameters.
    fn snapshot(&self) -> Result<serde_json::Value>;
}
