//! Baseline.
use super::Path;
use anyhow::Result;
use ndarray::Array1;

/// A value-function estimator used to reduce the variance of gradient estimates.
pub trait Baseline: Send {
    /// Fits the baseline to `targets`, one array per path.
    fn fit(&mut self, paths: &[Path], targets: &[Array1<f64>]) -> Result<()>;

    /// Predicts values for the steps of a path.
    fn predict(&self, path: &Path) -> Array1<f64>;

    /// Name of the baseline, used in logs.
    fn name(&self) -> &'static str;
}
