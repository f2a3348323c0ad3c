use super::{fit_paths, time_features};
use anyhow::Result;
use gradvar_core::{Baseline, Path};
use ndarray::Array1;

/// Linear regression on time features `[t, t^2, t^3, 1]` only.
#[derive(Clone, Debug, Default)]
pub struct LinearTimeBaseline {
    coeffs: Option<Array1<f64>>,
}

impl LinearTimeBaseline {
    /// Constructs an unfitted baseline.
    pub fn new() -> Self {
        Self { coeffs: None }
    }
}

impl Baseline for LinearTimeBaseline {
    fn fit(&mut self, paths: &[Path], targets: &[Array1<f64>]) -> Result<()> {
        self.coeffs = Some(fit_paths(paths, targets, |p| time_features(p.len()))?);
        Ok(())
    }

    fn predict(&self, path: &Path) -> Array1<f64> {
        match &self.coeffs {
            Some(c) => time_features(path.len()).dot(c),
            None => Array1::zeros(path.len()),
        }
    }

    fn name(&self) -> &'static str {
        "LinearTimeBaseline"
    }
}
