use super::{fit_paths, time_features};
use anyhow::Result;
use gradvar_core::{Baseline, Path};
use ndarray::{concatenate, Array1, Array2, Axis};

/// Linear regression on observations and time.
///
/// Features are `[clip(o, -10, 10), clip(o, -10, 10)^2, t, t^2, t^3, 1]`.
/// Predictions are zero until the first fit.
#[derive(Clone, Debug, Default)]
pub struct LinearFeatureBaseline {
    coeffs: Option<Array1<f64>>,
}

impl LinearFeatureBaseline {
    /// Constructs an unfitted baseline.
    pub fn new() -> Self {
        Self { coeffs: None }
    }

    fn features(path: &Path) -> Array2<f64> {
        let o = path.observations.mapv(|v| v.max(-10.0).min(10.0));
        let o2 = o.mapv(|v| v * v);
        let t = time_features(path.len());
        // Empty paths still need the right number of columns
        concatenate(Axis(1), &[o.view(), o2.view(), t.view()])
            .unwrap_or_else(|_| Array2::zeros((path.len(), 2 * path.observations.ncols() + 4)))
    }
}

impl Baseline for LinearFeatureBaseline {
    fn fit(&mut self, paths: &[Path], targets: &[Array1<f64>]) -> Result<()> {
        self.coeffs = Some(fit_paths(paths, targets, Self::features)?);
        Ok(())
    }

    fn predict(&self, path: &Path) -> Array1<f64> {
        match &self.coeffs {
            Some(c) if c.len() == 2 * path.observations.ncols() + 4 => {
                Self::features(path).dot(c)
            }
            _ => Array1::zeros(path.len()),
        }
    }

    fn name(&self) -> &'static str {
        "LinearFeatureBaseline"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gradvar_core::AgentInfo;
    use ndarray::array;

    fn path(xs: &[f64]) -> Path {
        let obs: Vec<_> = xs.iter().map(|x| array![*x]).collect();
        let act: Vec<_> = xs.iter().map(|_| array![0.0]).collect();
        let infos: Vec<_> = xs
            .iter()
            .map(|_| AgentInfo {
                mean: array![0.0],
                log_std: array![0.0],
            })
            .collect();
        Path::from_steps(&obs, &act, vec![0.0; xs.len()], &infos).unwrap()
    }

    #[test]
    fn test_unfitted_predicts_zero() {
        let b = LinearFeatureBaseline::new();
        assert_eq!(b.predict(&path(&[1.0, 2.0])), array![0.0, 0.0]);
    }

    #[test]
    fn test_fit_linear_in_observation() -> Result<()> {
        let paths = vec![path(&[0.0, 1.0, 2.0, 3.0]), path(&[-1.0, 0.5, 1.5])];
        let targets: Vec<Array1<f64>> = paths
            .iter()
            .map(|p| p.observations.column(0).mapv(|o| 3.0 * o + 1.0))
            .collect();
        let mut b = LinearFeatureBaseline::new();
        b.fit(&paths, &targets)?;
        let pred = b.predict(&paths[0]);
        for (p, t) in pred.iter().zip(targets[0].iter()) {
            assert!((p - t).abs() < 1e-2, "{} vs {}", p, t);
        }
        Ok(())
    }
}
