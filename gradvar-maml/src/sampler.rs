//! Sampler collecting rollouts of a meta-batch.
mod config;
pub use config::MamlSamplerConfig;

use anyhow::Result;
use crossbeam_channel::unbounded;
use gradvar_core::{error::GradVarError, util::derive_seed, MetaEnv, MetaPolicy, MetaSampler, Path};
use log::{debug, warn};
use rand::{rngs::SmallRng, SeedableRng};

/// Collects `rollouts_per_meta_task` rollouts for each task of the meta-batch.
///
/// Each task owns `envs_per_task` copies of the environment. Rollout `r` of
/// task `t` runs on copy `r % envs_per_task` with exploration noise seeded
/// by `(seed, t, r)`. As the assignment does not depend on scheduling, the
/// parallel and sequential modes give the same paths.
pub struct MamlSampler<E: MetaEnv> {
    config: MamlSamplerConfig,
    envs: Vec<Vec<E>>,
    tasks: Vec<E::Task>,
}

impl<E: MetaEnv> MamlSampler<E> {
    /// Constructs a sampler, cloning `env` for every slot.
    pub fn new(env: E, config: MamlSamplerConfig) -> Result<Self> {
        if config.rollouts_per_meta_task == 0 || config.meta_batch_size == 0 {
            return Err(GradVarError::InvalidConfig(
                "rollouts_per_meta_task and meta_batch_size must be positive".to_string(),
            )
            .into());
        }
        if config.max_path_length == 0 {
            return Err(
                GradVarError::InvalidConfig("max_path_length must be positive".to_string()).into(),
            );
        }
        let envs_per_task = match config.envs_per_task {
            Some(0) => {
                return Err(GradVarError::InvalidConfig(
                    "envs_per_task must be positive".to_string(),
                )
                .into())
            }
            Some(n) if n > config.rollouts_per_meta_task => {
                warn!(
                    "envs_per_task ({}) exceeds rollouts_per_meta_task ({}), clipped",
                    n, config.rollouts_per_meta_task
                );
                config.rollouts_per_meta_task
            }
            Some(n) => n,
            None => config.rollouts_per_meta_task,
        };

        let task = env.get_task();
        let envs = (0..config.meta_batch_size)
            .map(|_| (0..envs_per_task).map(|_| env.clone()).collect())
            .collect();
        let tasks = vec![task; config.meta_batch_size];
        Ok(Self {
            config,
            envs,
            tasks,
        })
    }

    /// Configuration of the sampler.
    pub fn config(&self) -> &MamlSamplerConfig {
        &self.config
    }

    /// Current tasks of the meta-batch.
    pub fn tasks(&self) -> &[E::Task] {
        &self.tasks
    }

    /// The number of environment copies per task.
    pub fn envs_per_task(&self) -> usize {
        self.envs.first().map(|e| e.len()).unwrap_or(0)
    }
}

/// Runs the rollouts assigned to one environment copy.
#[allow(clippy::too_many_arguments)]
fn run_slot<E: MetaEnv, P: MetaPolicy>(
    env: &mut E,
    policy: &P,
    task: usize,
    slot: usize,
    config: &MamlSamplerConfig,
    n_slots: usize,
    seed: u64,
    mut send: impl FnMut(usize, usize, Result<Path>) -> bool,
) {
    for r in (slot..config.rollouts_per_meta_task).step_by(n_slots) {
        let rollout_seed = derive_seed(seed, &[task as u64, r as u64]);
        let res = rollout(env, policy, task, config.max_path_length, rollout_seed);
        if !send(task, r, res) {
            return;
        }
    }
}

/// Runs a single episode of at most `max_path_length` steps.
pub fn rollout<E: MetaEnv, P: MetaPolicy>(
    env: &mut E,
    policy: &P,
    task: usize,
    max_path_length: usize,
    seed: u64,
) -> Result<Path> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut obs = env.reset()?;
    let mut observations = Vec::with_capacity(max_path_length);
    let mut actions = Vec::with_capacity(max_path_length);
    let mut rewards = Vec::with_capacity(max_path_length);
    let mut agent_infos = Vec::with_capacity(max_path_length);

    for _ in 0..max_path_length {
        let (act, info) = policy.get_action(&obs, task, &mut rng)?;
        let step = env.step(&act)?;
        observations.push(obs);
        actions.push(act);
        rewards.push(step.reward);
        agent_infos.push(info);
        obs = step.obs;
        if step.done {
            break;
        }
    }
    Path::from_steps(&observations, &actions, rewards, &agent_infos)
}

impl<E, P> MetaSampler<P> for MamlSampler<E>
where
    E: MetaEnv,
    P: MetaPolicy,
{
    fn update_tasks(&mut self, rng: &mut SmallRng) {
        let env = &mut self.envs[0][0];
        self.tasks = env.sample_tasks(self.config.meta_batch_size, rng);
        for (envs, task) in self.envs.iter_mut().zip(self.tasks.iter()) {
            for env in envs.iter_mut() {
                env.set_task(task.clone());
            }
        }
        debug!("Tasks: {:?}", self.tasks);
    }

    fn obtain_samples(&mut self, policy: &P, seed: u64) -> Result<Vec<Vec<Path>>> {
        if policy.meta_batch_size() != self.config.meta_batch_size {
            return Err(GradVarError::ShapeMismatch {
                context: "MamlSampler::obtain_samples".to_string(),
                expected: vec![self.config.meta_batch_size],
                actual: vec![policy.meta_batch_size()],
            }
            .into());
        }

        let config = &self.config;
        let n_slots = self.envs.first().map(|e| e.len()).unwrap_or(1);
        let mut slots: Vec<(usize, usize, &mut E)> = self
            .envs
            .iter_mut()
            .enumerate()
            .flat_map(|(t, envs)| envs.iter_mut().enumerate().map(move |(s, e)| (t, s, e)))
            .collect();
        let mut paths: Vec<Vec<Option<Path>>> =
            vec![vec![None; config.rollouts_per_meta_task]; config.meta_batch_size];

        if config.parallel {
            let n_workers = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(slots.len())
                .max(1);
            let chunk_size = (slots.len() + n_workers - 1) / n_workers;
            let (s, r) = unbounded();

            std::thread::scope(|scope| {
                for chunk in slots.chunks_mut(chunk_size) {
                    let s = s.clone();
                    scope.spawn(move || {
                        for (task, slot, env) in chunk.iter_mut() {
                            run_slot(
                                &mut **env,
                                policy,
                                *task,
                                *slot,
                                config,
                                n_slots,
                                seed,
                                |t, r, res| s.send((t, r, res)).is_ok(),
                            );
                        }
                    });
                }
            });
            drop(s);

            for (t, i, res) in r.iter() {
                paths[t][i] = Some(res?);
            }
        } else {
            for (task, slot, env) in slots.iter_mut() {
                let mut err = None;
                run_slot(
                    &mut **env,
                    policy,
                    *task,
                    *slot,
                    config,
                    n_slots,
                    seed,
                    |t, i, res| match res {
                        Ok(p) => {
                            paths[t][i] = Some(p);
                            true
                        }
                        Err(e) => {
                            err = Some(e);
                            false
                        }
                    },
                );
                if let Some(e) = err {
                    return Err(e);
                }
            }
        }

        paths
            .into_iter()
            .map(|ps| {
                ps.into_iter()
                    .map(|p| {
                        p.ok_or_else(|| {
                            GradVarError::InvalidConfig("missing rollout".to_string()).into()
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        env::{PointEnvRandDirec, PointEnvRandGoal},
        policy::{MetaGaussianMlpPolicy, MetaGaussianMlpPolicyConfig},
    };

    fn policy(meta_batch_size: usize, obs_dim: usize) -> MetaGaussianMlpPolicy {
        let config = MetaGaussianMlpPolicyConfig::default()
            .dims(obs_dim, 2)
            .meta_batch_size(meta_batch_size)
            .hidden_sizes(vec![8]);
        MetaGaussianMlpPolicy::build(config, 7).unwrap()
    }

    #[test]
    fn test_shape_of_samples() -> Result<()> {
        let config = MamlSamplerConfig::default()
            .rollouts_per_meta_task(5)
            .meta_batch_size(3)
            .max_path_length(10)
            .envs_per_task(2);
        let mut sampler = MamlSampler::new(PointEnvRandDirec::new(), config)?;
        let policy = policy(3, 4);
        let mut rng = SmallRng::seed_from_u64(0);
        MetaSampler::<MetaGaussianMlpPolicy>::update_tasks(&mut sampler, &mut rng);
        assert_eq!(sampler.tasks().len(), 3);
        assert_eq!(sampler.envs_per_task(), 2);

        let paths = sampler.obtain_samples(&policy, 1)?;
        assert_eq!(paths.len(), 3);
        for ps in paths.iter() {
            assert_eq!(ps.len(), 5);
            assert!(ps.iter().all(|p| p.len() == 10));
        }
        Ok(())
    }

    #[test]
    fn test_parallel_equals_sequential() -> Result<()> {
        let config = MamlSamplerConfig::default()
            .rollouts_per_meta_task(4)
            .meta_batch_size(3)
            .max_path_length(20)
            .envs_per_task(3);
        let policy = policy(3, 2);
        let mut seq = MamlSampler::new(PointEnvRandGoal::new(), config.clone())?;
        let mut par = MamlSampler::new(PointEnvRandGoal::new(), config.parallel(true))?;
        for s in [&mut seq, &mut par] {
            let mut rng = SmallRng::seed_from_u64(3);
            MetaSampler::<MetaGaussianMlpPolicy>::update_tasks(s, &mut rng);
        }

        let a = seq.obtain_samples(&policy, 11)?;
        let b = par.obtain_samples(&policy, 11)?;
        for (pa, pb) in a.iter().flatten().zip(b.iter().flatten()) {
            assert_eq!(pa.actions, pb.actions);
            assert_eq!(pa.rewards, pb.rewards);
        }

        let c = seq.obtain_samples(&policy, 12)?;
        assert_ne!(a[0][0].actions, c[0][0].actions);
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let config = MamlSamplerConfig::default().envs_per_task(0);
        assert!(MamlSampler::new(PointEnvRandDirec::new(), config).is_err());
        let config = MamlSamplerConfig::default().meta_batch_size(0);
        assert!(MamlSampler::new(PointEnvRandDirec::new(), config).is_err());
    }
}
