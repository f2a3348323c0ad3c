use super::{fit_predict, path_returns, return_stats, td_residuals};
use crate::baseline::BaselineKind;
use anyhow::Result;
use gradvar_core::{
    record::Record,
    util::{discount_cumsum, normalize, shift_to_positive},
    Baseline, Path, SampleProcessor, SamplesData,
};
use ndarray::{concatenate, Array1, Axis};
use serde::{Deserialize, Serialize};

/// Configuration of [`MamlSampleProcessor`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct MamlSampleProcessorConfig {
    /// Baseline fitted to the returns of each task.
    pub baseline: BaselineKind,

    /// Discount factor.
    pub discount: f64,

    /// Lambda of generalized advantage estimation.
    pub gae_lambda: f64,

    /// If `true`, advantages are normalized within each task.
    pub normalize_adv: bool,

    /// If `true`, advantages are shifted to be positive.
    pub positive_adv: bool,
}

impl Default for MamlSampleProcessorConfig {
    fn default() -> Self {
        Self {
            baseline: BaselineKind::LinearFeature,
            discount: 0.99,
            gae_lambda: 1.0,
            normalize_adv: false,
            positive_adv: false,
        }
    }
}

impl MamlSampleProcessorConfig {
    /// Sets the baseline.
    pub fn baseline(mut self, v: BaselineKind) -> Self {
        self.baseline = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount(mut self, v: f64) -> Self {
        self.discount = v;
        self
    }

    /// Sets lambda of generalized advantage estimation.
    pub fn gae_lambda(mut self, v: f64) -> Self {
        self.gae_lambda = v;
        self
    }

    /// Sets advantage normalization.
    pub fn normalize_adv(mut self, v: bool) -> Self {
        self.normalize_adv = v;
        self
    }

    /// Sets the positive shift of advantages.
    pub fn positive_adv(mut self, v: bool) -> Self {
        self.positive_adv = v;
        self
    }
}

/// Computes generalized advantage estimates per task.
pub struct MamlSampleProcessor {
    config: MamlSampleProcessorConfig,
    baseline: Box<dyn Baseline>,
}

impl MamlSampleProcessor {
    /// Constructs the processor.
    pub fn new(config: MamlSampleProcessorConfig) -> Self {
        let baseline = config.baseline.build();
        Self { config, baseline }
    }

    /// Configuration of the processor.
    pub fn config(&self) -> &MamlSampleProcessorConfig {
        &self.config
    }

    fn process_task(&mut self, paths: &[Path]) -> Result<SamplesData> {
        let discount = self.config.discount;
        let returns = path_returns(paths, discount);
        let values = fit_predict(self.baseline.as_mut(), paths, &returns)?;

        let advantages: Vec<Array1<f64>> = paths
            .iter()
            .zip(values.iter())
            .map(|(p, v)| {
                let deltas = td_residuals(p.rewards.view(), v, discount);
                discount_cumsum(deltas.view(), discount * self.config.gae_lambda)
            })
            .collect();

        let mut samples = SamplesData::from_paths(paths)?;
        samples.returns = concatenate(
            Axis(0),
            &returns.iter().map(|r| r.view()).collect::<Vec<_>>(),
        )?;
        let mut adv = concatenate(
            Axis(0),
            &advantages.iter().map(|a| a.view()).collect::<Vec<_>>(),
        )?;
        if self.config.normalize_adv {
            adv = normalize(&adv);
        }
        if self.config.positive_adv {
            adv = shift_to_positive(&adv);
        }
        samples.advantages = adv;
        Ok(samples)
    }
}

impl SampleProcessor for MamlSampleProcessor {
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

#[cfg(test)]
mod test {
    use super::*;
    use gradvar_core::{util::mean_std, AgentInfo};
    use ndarray::array;

    fn path(rewards: &[f64]) -> Path {
        let obs: Vec<_> = (0..rewards.len()).map(|t| array![t as f64 * 0.1]).collect();
        let act: Vec<_> = rewards.iter().map(|_| array![0.0]).collect();
        let infos: Vec<_> = rewards
            .iter()
            .map(|_| AgentInfo {
                mean: array![0.0],
                log_std: array![0.0],
            })
            .collect();
        Path::from_steps(&obs, &act, rewards.to_vec(), &infos).unwrap()
    }

    #[test]
    fn test_returns_and_stats() -> Result<()> {
        let config = MamlSampleProcessorConfig::default().discount(0.5);
        let mut processor = MamlSampleProcessor::new(config);
        let paths = vec![vec![path(&[1.0, 1.0, 1.0]), path(&[2.0, 0.0])]];
        let (samples, record) = processor.process_samples(&paths, "Step_0-")?;

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].returns, array![1.75, 1.5, 1.0, 2.0, 0.0]);
        assert_eq!(record.get_scalar("Step_0-AverageReturn")?, 2.5);
        assert_eq!(record.get_scalar("Step_0-MaxReturn")?, 3.0);
        assert_eq!(record.get_scalar("Step_0-MinReturn")?, 2.0);
        assert_eq!(record.get_scalar("Step_0-NumTrajs")?, 2.0);
        assert_eq!(record.get_scalar("Step_0-AverageDiscountedReturn")?, 1.875);
        Ok(())
    }

    #[test]
    fn test_normalized_advantages() -> Result<()> {
        let config = MamlSampleProcessorConfig::default().normalize_adv(true);
        let mut processor = MamlSampleProcessor::new(config);
        let paths = vec![
            vec![path(&[1.0, -1.0, 0.5]), path(&[0.0, 2.0, 1.0, 3.0])],
            vec![path(&[0.3, 0.2])],
        ];
        let (samples, _) = processor.process_samples(&paths, "")?;
        for s in samples.iter() {
            let (mean, _) = mean_std(s.advantages.view());
            assert!(mean.abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_positive_advantages() -> Result<()> {
        let config = MamlSampleProcessorConfig::default().positive_adv(true);
        let mut processor = MamlSampleProcessor::new(config);
        let paths = vec![vec![path(&[1.0, -5.0, 0.5]), path(&[0.0, 2.0])]];
        let (samples, _) = processor.process_samples(&paths, "")?;
        assert!(samples[0].advantages.iter().all(|a| *a > 0.0));
        Ok(())
    }
}
