//! Meta-learning algorithm.
use super::{MetaPolicy, SamplesData};
use crate::record::Record;
use anyhow::Result;
use ndarray::Array1;

/// Gradient-based meta-learning algorithm.
///
/// All objectives are maximized: gradients point in the direction of
/// increasing return.
pub trait MetaAlgo<P: MetaPolicy> {
    /// Number of inner adaptation steps.
    fn num_inner_grad_steps(&self) -> usize;

    /// Gradient of the inner objective of `task` at its adapted parameters.
    fn inner_gradient(&self, policy: &P, task: usize, samples: &SamplesData)
        -> Result<Array1<f64>>;

    /// Performs one inner adaptation step for every task of the meta-batch.
    fn adapt(&mut self, policy: &mut P, samples: &[SamplesData]) -> Result<Record>;

    /// Meta-gradient of the outer objective, averaged over tasks.
    fn meta_gradient(&self, policy: &P, samples: &[SamplesData]) -> Result<Array1<f64>>;

    /// Updates the pre-update parameters with a meta-gradient.
    fn optimize_policy(&mut self, policy: &mut P, meta_gradient: &Array1<f64>) -> Result<Record>;
}
