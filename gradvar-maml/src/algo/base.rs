use super::{
    objective::{dice_weights, vpg_weights},
    InnerType,
};
use crate::opt::{Optimizer, OptimizerConfig};
use anyhow::Result;
use gradvar_core::{
    error::GradVarError,
    record::{Record, RecordValue::Scalar},
    MetaPolicy, SamplesData,
};
use log::trace;
use ndarray::Array1;

/// State shared by the first-order MAML algorithms.
///
/// Inner steps are `θ_i ← θ_i + inner_lr g_i`. The meta-gradient is the
/// average over tasks of the outer objective's gradient at the adapted
/// parameters, and the pre-update parameters are moved along it by the
/// optimizer.
pub(super) struct MamlBase {
    pub(super) meta_batch_size: usize,
    pub(super) inner_lr: f64,
    pub(super) num_inner_grad_steps: usize,
    opt_config: OptimizerConfig,
    opt: Option<Optimizer>,
}

impl MamlBase {
    pub(super) fn new(
        meta_batch_size: usize,
        inner_lr: f64,
        learning_rate: f64,
        num_inner_grad_steps: usize,
    ) -> Self {
        Self {
            meta_batch_size,
            inner_lr,
            num_inner_grad_steps,
            opt_config: OptimizerConfig::default().learning_rate(learning_rate),
            opt: None,
        }
    }

    fn check_meta_batch(&self, samples: &[SamplesData]) -> Result<()> {
        if samples.len() != self.meta_batch_size {
            return Err(GradVarError::ShapeMismatch {
                context: "samples of the meta-batch".to_string(),
                expected: vec![self.meta_batch_size],
                actual: vec![samples.len()],
            }
            .into());
        }
        Ok(())
    }

    /// Applies one inner step to every task.
    pub(super) fn adapt<P, F>(
        &self,
        policy: &mut P,
        samples: &[SamplesData],
        inner_gradient: F,
    ) -> Result<Record>
    where
        P: MetaPolicy,
        F: Fn(&P, usize, &SamplesData) -> Result<Array1<f64>>,
    {
        self.check_meta_batch(samples)?;
        let mut norms = Vec::with_capacity(samples.len());
        let mut updates = Vec::with_capacity(samples.len());

        for (task, s) in samples.iter().enumerate() {
            let grad = inner_gradient(&*policy, task, s)?;
            let mut params = policy.adapted_params(task)?;
            params.scaled_add(self.inner_lr, &grad);
            norms.push(grad.dot(&grad).sqrt());
            updates.push(params);
        }
        for (task, params) in updates.into_iter().enumerate() {
            policy.set_adapted_params(task, params)?;
        }

        let mean_norm = norms.iter().sum::<f64>() / norms.len().max(1) as f64;
        trace!("Inner step: mean |g| = {}", mean_norm);
        Ok(Record::from_scalar("InnerGradNorm", mean_norm))
    }

    /// Averages the outer gradients of all tasks.
    pub(super) fn meta_gradient<P, F>(
        &self,
        policy: &P,
        samples: &[SamplesData],
        outer_gradient: F,
    ) -> Result<Array1<f64>>
    where
        P: MetaPolicy,
        F: Fn(&P, usize, &SamplesData) -> Result<Array1<f64>>,
    {
        self.check_meta_batch(samples)?;
        let mut sum = Array1::zeros(policy.num_params());
        for (task, s) in samples.iter().enumerate() {
            sum += &outer_gradient(policy, task, s)?;
        }
        Ok(sum / samples.len() as f64)
    }

    /// Moves the pre-update parameters along the meta-gradient.
    pub(super) fn optimize<P: MetaPolicy>(
        &mut self,
        policy: &mut P,
        meta_gradient: &Array1<f64>,
    ) -> Result<Record> {
        let opt_config = &self.opt_config;
        let opt = self
            .opt
            .get_or_insert_with(|| opt_config.build(policy.num_params()));
        let mut params = policy.flat_params();
        let before = params.clone();
        opt.step(&mut params, meta_gradient)?;
        policy.set_flat_params(&params)?;

        let step = &params - &before;
        Ok(Record::from_slice(&[
            ("MetaGradNorm", Scalar(meta_gradient.dot(meta_gradient).sqrt())),
            ("MetaStepNorm", Scalar(step.dot(&step).sqrt())),
        ]))
    }
}

/// Gradient of the DICE objective at the adapted parameters of `task`.
pub(super) fn dice_gradient<P: MetaPolicy>(
    policy: &P,
    task: usize,
    samples: &SamplesData,
    discount: f64,
) -> Result<Array1<f64>> {
    let params = policy.adapted_params(task)?;
    let ll = policy.log_likelihood(&params, &samples.observations, &samples.actions)?;
    let weights = dice_weights(samples, &ll, discount)?;
    policy.log_likelihood_gradient(&params, &samples.observations, &samples.actions, &weights)
}

/// Gradient of a likelihood-ratio objective at the adapted parameters of `task`.
pub(super) fn vpg_gradient<P: MetaPolicy>(
    policy: &P,
    task: usize,
    samples: &SamplesData,
    inner_type: InnerType,
) -> Result<Array1<f64>> {
    let params = policy.adapted_params(task)?;
    let ll = policy.log_likelihood(&params, &samples.observations, &samples.actions)?;
    let weights = vpg_weights(samples, &ll, inner_type);
    policy.log_likelihood_gradient(&params, &samples.observations, &samples.actions, &weights)
}
