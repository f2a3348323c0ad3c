//! Sample processors computing returns and advantage estimates.
mod dice_maml;
mod maml;
pub use dice_maml::{DiceMamlSampleProcessor, DiceMamlSampleProcessorConfig};
pub use maml::{MamlSampleProcessor, MamlSampleProcessorConfig};

use gradvar_core::{
    record::{Record, RecordValue::Scalar},
    util::{discount_cumsum, mean_std},
    Baseline, Path, SampleProcessor,
};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Configuration of a sample processor.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum SampleProcessorConfig {
    /// Baseline-subtracted returns for likelihood-ratio objectives.
    Maml(MamlSampleProcessorConfig),

    /// Baseline-adjusted rewards for DICE objectives.
    DiceMaml(DiceMamlSampleProcessorConfig),
}

impl SampleProcessorConfig {
    /// Builds the sample processor.
    pub fn build(&self) -> Box<dyn SampleProcessor> {
        match self {
            Self::Maml(c) => Box::new(MamlSampleProcessor::new(c.clone())),
            Self::DiceMaml(c) => Box::new(DiceMamlSampleProcessor::new(c.clone())),
        }
    }
}

/// Discounted returns of each path.
fn path_returns(paths: &[Path], discount: f64) -> Vec<Array1<f64>> {
    paths
        .iter()
        .map(|p| discount_cumsum(p.rewards.view(), discount))
        .collect()
}

/// `r_t + γ b_{t+1} - b_t` with `b_T = 0`.
fn td_residuals(rewards: ArrayView1<f64>, baseline: &Array1<f64>, discount: f64) -> Array1<f64> {
    let n = rewards.len();
    Array1::from_shape_fn(n, |t| {
        let next = if t + 1 < n { baseline[t + 1] } else { 0.0 };
        rewards[t] + discount * next - baseline[t]
    })
}

/// Fits the baseline to returns and predicts values for every path.
fn fit_predict(
    baseline: &mut dyn Baseline,
    paths: &[Path],
    returns: &[Array1<f64>],
) -> anyhow::Result<Vec<Array1<f64>>> {
    baseline.fit(paths, returns)?;
    Ok(paths.iter().map(|p| baseline.predict(p)).collect())
}

/// Statistics of returns over all paths of the meta-batch.
fn return_stats(paths_meta_batch: &[Vec<Path>], discount: f64, prefix: &str) -> Record {
    let undiscounted: Array1<f64> = paths_meta_batch
        .iter()
        .flatten()
        .map(|p| p.total_reward())
        .collect();
    let discounted: Array1<f64> = paths_meta_batch
        .iter()
        .flatten()
        .map(|p| discount_cumsum(p.rewards.view(), discount).first().cloned().unwrap_or(0.0))
        .collect();
    let (mean, std) = mean_std(undiscounted.view());
    let (mean_disc, _) = mean_std(discounted.view());

    Record::from_slice(&[
        ("AverageReturn", Scalar(mean)),
        ("StdReturn", Scalar(std)),
        (
            "MaxReturn",
            Scalar(undiscounted.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
        ),
        (
            "MinReturn",
            Scalar(undiscounted.iter().cloned().fold(f64::INFINITY, f64::min)),
        ),
        ("AverageDiscountedReturn", Scalar(mean_disc)),
        ("NumTrajs", Scalar(undiscounted.len() as f64)),
    ])
    .with_prefix(prefix)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_td_residuals() {
        let r = array![1.0, 1.0, 1.0];
        let b = array![3.0, 2.0, 1.0];
        let d = td_residuals(r.view(), &b, 1.0);
        assert_eq!(d, array![0.0, 0.0, 0.0]);
    }
}
