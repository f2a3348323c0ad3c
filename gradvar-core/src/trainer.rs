//! Outer loop of meta-training with gradient-variance statistics.
mod config;
mod grad_stats;
use crate::{
    error::GradVarError,
    record::{Record, RecordValue::Scalar, Recorder},
    util::derive_seed,
    MetaAlgo, MetaEnv, MetaPolicy, MetaSampler, Path, SampleProcessor, SamplesData,
};
use anyhow::Result;
pub use config::TrainerConfig;
pub use grad_stats::GradientStats;
use log::{debug, info};
use ndarray::Array1;
use rand::{rngs::SmallRng, SeedableRng};
use std::time::SystemTime;

// Streams of random numbers derived from the seed of the trainer.
const STREAM_TASKS: u64 = 1;
const STREAM_ROLLOUTS: u64 = 2;

/// Runs meta-training and records statistics of the meta-gradient.
///
/// # Training loop
///
/// For each iteration `itr` in `start_itr..n_itr`:
///
/// 1. The sampler draws a new set of tasks for the meta-batch.
/// 2. For each of the `sampling_rounds` rounds:
///     1. The policy is switched to its pre-update parameters.
///     2. For `step` in `0..=num_inner_grad_steps`, paths are sampled with the
///        current adapted parameters and processed by the sample processor.
///        While `step < num_inner_grad_steps`, the algorithm performs an inner
///        adaptation step with the processed samples.
///     3. The meta-gradient is computed from the post-update samples.
/// 3. Per-coordinate mean and standard deviation of the meta-gradients (and
///    of the first inner gradients) over rounds are recorded.
/// 4. The pre-update parameters are updated with the mean meta-gradient.
/// 5. A snapshot of the policy is saved and the records are flushed.
///
/// Return statistics are taken from the first round only.
pub struct Trainer<E, P, S>
where
    E: MetaEnv,
    P: MetaPolicy,
    S: MetaSampler<P>,
{
    config: TrainerConfig,
    algo: Box<dyn MetaAlgo<P>>,
    policy: P,
    env: E,
    sampler: S,
    sample_processor: Box<dyn SampleProcessor>,
}

impl<E, P, S> Trainer<E, P, S>
where
    E: MetaEnv,
    P: MetaPolicy,
    S: MetaSampler<P>,
{
    /// Constructs a trainer.
    pub fn build(
        config: TrainerConfig,
        algo: Box<dyn MetaAlgo<P>>,
        policy: P,
        env: E,
        sampler: S,
        sample_processor: Box<dyn SampleProcessor>,
    ) -> Result<Self> {
        if config.sampling_rounds == 0 {
            return Err(GradVarError::InvalidConfig("sampling_rounds must be positive".into()).into());
        }
        if config.num_inner_grad_steps != algo.num_inner_grad_steps() {
            return Err(GradVarError::InvalidConfig(format!(
                "num_inner_grad_steps of the trainer ({}) and the algorithm ({}) differ",
                config.num_inner_grad_steps,
                algo.num_inner_grad_steps()
            ))
            .into());
        }
        Ok(Self {
            config,
            algo,
            policy,
            env,
            sampler,
            sample_processor,
        })
    }

    /// The policy being trained.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Consumes the trainer and returns the policy.
    pub fn into_policy(self) -> P {
        self.policy
    }

    fn sample_and_process(
        &mut self,
        itr: usize,
        round: usize,
        step: usize,
        record: &mut Record,
    ) -> Result<Vec<SamplesData>> {
        let seed = derive_seed(
            self.config.seed,
            &[STREAM_ROLLOUTS, itr as u64, round as u64, step as u64],
        );
        let paths = self.sampler.obtain_samples(&self.policy, seed)?;
        let prefix = format!("Step_{}-", step);
        let (samples, record_proc) = self.sample_processor.process_samples(&paths, &prefix)?;
        record.merge_inplace(record_proc);
        record.merge_inplace(self.diagnostics(&paths, &prefix));
        Ok(samples)
    }

    /// Samples, processes and adapts for one round.
    ///
    /// Returns the post-update samples, the inner gradients of the first step
    /// concatenated over tasks and the records of each step.
    fn round(
        &mut self,
        itr: usize,
        round: usize,
    ) -> Result<(Vec<SamplesData>, Option<Array1<f64>>, Record)> {
        let mut record = Record::empty();
        let mut inner_grad = None;

        self.policy.switch_to_pre_update();

        for step in 0..self.config.num_inner_grad_steps {
            let samples = self.sample_and_process(itr, round, step, &mut record)?;
            if step == 0 {
                let mut grads = vec![];
                for (task, s) in samples.iter().enumerate() {
                    let g = self.algo.inner_gradient(&self.policy, task, s)?;
                    grads.extend(g.iter().cloned());
                }
                inner_grad = Some(Array1::from(grads));
            }
            let record_adapt = self.algo.adapt(&mut self.policy, &samples)?;
            record.merge_inplace(record_adapt.with_prefix(&format!("Step_{}-", step)));
        }

        let k = self.config.num_inner_grad_steps;
        let samples = self.sample_and_process(itr, round, k, &mut record)?;
        Ok((samples, inner_grad, record))
    }

    fn diagnostics(&self, paths: &[Vec<Path>], prefix: &str) -> Record {
        let flat: Vec<Path> = paths.iter().flatten().cloned().collect();
        self.env.log_diagnostics(&flat, prefix)
    }

    /// Performs one outer iteration.
    pub fn train_step(&mut self, itr: usize, rng_tasks: &mut SmallRng) -> Result<Record> {
        let timer = SystemTime::now();
        self.sampler.update_tasks(rng_tasks);

        let mut meta_grads = vec![];
        let mut inner_grads = vec![];
        let mut record = Record::empty();

        for round in 0..self.config.sampling_rounds {
            let (samples, inner_grad, record_round) = self.round(itr, round)?;
            let meta_grad = self.algo.meta_gradient(&self.policy, &samples)?;
            debug!(
                "itr {} round {}: |g| = {}",
                itr,
                round,
                meta_grad.dot(&meta_grad).sqrt()
            );
            meta_grads.push(meta_grad);
            inner_grads.extend(inner_grad);
            if round == 0 {
                record = record_round;
            }
        }

        let stats = GradientStats::from_gradients(&meta_grads)
            .ok_or_else(|| GradVarError::InvalidConfig("no sampling round".into()))?;
        record.merge_inplace(stats.to_record("Meta-"));

        if let Some(s) = GradientStats::from_gradients(&inner_grads) {
            record.merge_inplace(s.to_record("Inner-"));
        }

        self.policy.switch_to_pre_update();
        let record_opt = self.algo.optimize_policy(&mut self.policy, &stats.mean)?;
        record.merge_inplace(record_opt);

        record.insert("ItrTime", Scalar(timer.elapsed()?.as_secs_f64()));
        Ok(record)
    }

    /// Trains the policy.
    pub fn train(&mut self, recorder: &mut dyn Recorder) -> Result<()> {
        let mut rng_tasks = SmallRng::seed_from_u64(derive_seed(self.config.seed, &[STREAM_TASKS]));
        let start = SystemTime::now();

        info!(
            "Start training: n_itr = {}, sampling_rounds = {}, num_inner_grad_steps = {}",
            self.config.n_itr, self.config.sampling_rounds, self.config.num_inner_grad_steps
        );

        for itr in self.config.start_itr..self.config.n_itr {
            info!("Itr {}/{}", itr, self.config.n_itr);
            let mut record = self.train_step(itr, &mut rng_tasks)?;
            record.insert("Time", Scalar(start.elapsed()?.as_secs_f64()));
            recorder.store(record);
            recorder.save_snapshot(itr, &self.policy.snapshot()?)?;
            recorder.flush(itr as i64);
        }

        info!("Training finished");
        Ok(())
    }
}
