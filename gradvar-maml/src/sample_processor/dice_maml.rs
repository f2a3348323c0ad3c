use super::{fit_predict, path_returns, return_stats, td_residuals};
use crate::baseline::BaselineKind;
use anyhow::Result;
use gradvar_core::{
    error::GradVarError,
    record::Record,
    util::{normalize, shift_to_positive},
    Baseline, Path, SampleProcessor, SamplesData,
};
use ndarray::{concatenate, Array1, Axis};
use serde::{Deserialize, Serialize};

/// Configuration of [`DiceMamlSampleProcessor`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DiceMamlSampleProcessorConfig {
    /// Baseline used to adjust rewards.
    pub baseline: BaselineKind,

    /// Upper bound of path lengths.
    pub max_path_length: usize,

    /// Discount factor.
    pub discount: f64,

    /// If `true`, adjusted rewards and advantages are normalized within each task.
    pub normalize_adv: bool,

    /// If `true`, adjusted rewards and advantages are shifted to be positive.
    pub positive_adv: bool,

    /// Baseline subtracted from returns to compute advantages.
    ///
    /// Without it, advantages are returns minus the predictions of `baseline`.
    pub return_baseline: Option<BaselineKind>,
}

impl Default for DiceMamlSampleProcessorConfig {
    fn default() -> Self {
        Self {
            baseline: BaselineKind::LinearTime,
            max_path_length: 100,
            discount: 0.99,
            normalize_adv: false,
            positive_adv: false,
            return_baseline: None,
        }
    }
}

impl DiceMamlSampleProcessorConfig {
    /// Sets the baseline.
    pub fn baseline(mut self, v: BaselineKind) -> Self {
        self.baseline = v;
        self
    }

    /// Sets the maximum path length.
    pub fn max_path_length(mut self, v: usize) -> Self {
        self.max_path_length = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount(mut self, v: f64) -> Self {
        self.discount = v;
        self
    }

    /// Sets normalization.
    pub fn normalize_adv(mut self, v: bool) -> Self {
        self.normalize_adv = v;
        self
    }

    /// Sets the positive shift.
    pub fn positive_adv(mut self, v: bool) -> Self {
        self.positive_adv = v;
        self
    }

    /// Sets the return baseline.
    pub fn return_baseline(mut self, v: Option<BaselineKind>) -> Self {
        self.return_baseline = v;
        self
    }
}

/// Computes baseline-adjusted rewards `r_t + γ b(s_{t+1}) - b(s_t)` for DICE
/// objectives.
pub struct DiceMamlSampleProcessor {
    config: DiceMamlSampleProcessorConfig,
    baseline: Box<dyn Baseline>,
    return_baseline: Option<Box<dyn Baseline>>,
}

impl DiceMamlSampleProcessor {
    /// Constructs the processor.
    pub fn new(config: DiceMamlSampleProcessorConfig) -> Self {
        let baseline = config.baseline.build();
        let return_baseline = config.return_baseline.map(|k| k.build());
        Self {
            config,
            baseline,
            return_baseline,
        }
    }

    /// Configuration of the processor.
    pub fn config(&self) -> &DiceMamlSampleProcessorConfig {
        &self.config
    }

    fn transform(&self, xs: Array1<f64>) -> Array1<f64> {
        let xs = if self.config.normalize_adv {
            normalize(&xs)
        } else {
            xs
        };
        if self.config.positive_adv {
            shift_to_positive(&xs)
        } else {
            xs
        }
    }

    fn process_task(&mut self, paths: &[Path]) -> Result<SamplesData> {
        for p in paths.iter() {
            if p.len() > self.config.max_path_length {
                return Err(GradVarError::PathTooLong(p.len(), self.config.max_path_length).into());
            }
        }

        let discount = self.config.discount;
        let returns = path_returns(paths, discount);
        let values = fit_predict(self.baseline.as_mut(), paths, &returns)?;
        let adjusted: Vec<Array1<f64>> = paths
            .iter()
            .zip(values.iter())
            .map(|(p, v)| td_residuals(p.rewards.view(), v, discount))
            .collect();

        let advantages: Vec<Array1<f64>> = match self.return_baseline.as_mut() {
            Some(b) => fit_predict(b.as_mut(), paths, &returns)?,
            None => values,
        }
        .iter()
        .zip(returns.iter())
        .map(|(v, r)| r - v)
        .collect();

        let cat = |xs: &[Array1<f64>]| {
            concatenate(Axis(0), &xs.iter().map(|x| x.view()).collect::<Vec<_>>())
        };
        let mut samples = SamplesData::from_paths(paths)?;
        samples.returns = cat(&returns[..])?;
        samples.adjusted_rewards = Some(self.transform(cat(&adjusted[..])?));
        samples.advantages = self.transform(cat(&advantages[..])?);
        Ok(samples)
    }
}

impl SampleProcessor for DiceMamlSampleProcessor {
    fn process_samples(
        &mut self,
        paths_meta_batch: &[Vec<Path>],
        prefix: &str,
    ) -> Result<(Vec<SamplesData>, Record)> {
        let samples = paths_meta_batch
            .iter()
            .map(|paths| self.process_task(paths))
            .collect::<Result<Vec<_>>>()?;
        let record = return_stats(paths_meta_batch, self.config.discount, prefix);
        Ok((samples, record))
    }
}
