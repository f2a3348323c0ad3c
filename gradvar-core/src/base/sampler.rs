//! Sampler of meta-batches.
use super::{MetaPolicy, Path};
use anyhow::Result;
use rand::rngs::SmallRng;

/// Collects rollouts for every task of the meta-batch.
pub trait MetaSampler<P: MetaPolicy> {
    /// Samples a new set of tasks, one per slot of the meta-batch.
    fn update_tasks(&mut self, rng: &mut SmallRng);

    /// Collects rollouts with the adapted parameters of each task.
    ///
    /// The `i`-th element of the returned vector holds the paths of task `i`.
    /// Exploration noise is derived from `seed`, so the same seed and policy
    /// give the same paths.
    fn obtain_samples(&mut self, policy: &P, seed: u64) -> Result<Vec<Vec<Path>>>;
}
