//! Linear baselines fitted by ridge regression.
mod linear_feature;
mod linear_time;
pub use linear_feature::LinearFeatureBaseline;
pub use linear_time::LinearTimeBaseline;

use anyhow::Result;
use gradvar_core::{error::GradVarError, Path};
use log::warn;
use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Kind of a baseline, used to select one from a configuration.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum BaselineKind {
    /// [`LinearFeatureBaseline`].
    LinearFeature,

    /// [`LinearTimeBaseline`].
    LinearTime,
}

impl BaselineKind {
    /// Builds the baseline.
    pub fn build(&self) -> Box<dyn gradvar_core::Baseline> {
        match self {
            Self::LinearFeature => Box::new(LinearFeatureBaseline::new()),
            Self::LinearTime => Box::new(LinearTimeBaseline::new()),
        }
    }
}

/// Initial regularization coefficient of the ridge regression.
const REG_COEFF: f64 = 1e-5;

/// The number of retries with a larger regularization coefficient.
const N_RETRIES: usize = 5;

/// Time features `[t, t^2, t^3, 1]` with `t = step / 100`.
fn time_features(len: usize) -> Array2<f64> {
    Array2::from_shape_fn((len, 4), |(i, j)| {
        let t = i as f64 / 100.0;
        match j {
            0 => t,
            1 => t * t,
            2 => t * t * t,
            _ => 1.0,
        }
    })
}

/// Fits `features · coeffs ≈ targets` of all paths.
fn fit_paths<F>(paths: &[Path], targets: &[Array1<f64>], featurize: F) -> Result<Array1<f64>>
where
    F: Fn(&Path) -> Array2<f64>,
{
    if paths.len() != targets.len() {
        return Err(GradVarError::ShapeMismatch {
            context: "Baseline::fit".to_string(),
            expected: vec![paths.len()],
            actual: vec![targets.len()],
        }
        .into());
    }
    let feats: Vec<Array2<f64>> = paths.iter().map(|p| featurize(p)).collect();
    let feats = concatenate(Axis(0), &feats.iter().map(|f| f.view()).collect::<Vec<_>>())?;
    let ys = concatenate(Axis(0), &targets.iter().map(|t| t.view()).collect::<Vec<_>>())?;
    ridge_fit(&feats, ys.view())
}

/// Ridge regression. The coefficient is multiplied by 10 until the solution
/// is finite.
fn ridge_fit(features: &Array2<f64>, targets: ArrayView1<f64>) -> Result<Array1<f64>> {
    let n = features.ncols();
    let ftf = features.t().dot(features);
    let fty = features.t().dot(&targets);
    let mut reg = REG_COEFF;

    for _ in 0..N_RETRIES {
        let a = &ftf + &(Array2::<f64>::eye(n) * reg);
        if let Some(coeffs) = solve(a, fty.clone()) {
            if coeffs.iter().all(|c| c.is_finite()) {
                return Ok(coeffs);
            }
        }
        reg *= 10.0;
    }
    warn!("Ridge regression did not converge; using zero coefficients");
    Ok(Array1::zeros(n))
}

/// Solves `a x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-300 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let f = a[[row, col]] / a[[col, col]];
            if f != 0.0 {
                for k in col..n {
                    a[[row, k]] -= f * a[[col, k]];
                }
                b[row] -= f * b[col];
            }
        }
    }
    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let s: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - s) / a[[row, row]];
    }
    Some(x)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_solve() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let x = solve(a, array![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
        assert!(solve(array![[0.0, 0.0], [0.0, 0.0]], array![1.0, 1.0]).is_none());
    }

    #[test]
    fn test_ridge_fit_recovers_line() -> Result<()> {
        let feats = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let ys = Array1::from_shape_fn(20, |i| 2.0 * i as f64 - 1.0);
        let c = ridge_fit(&feats, ys.view())?;
        assert!((c[0] - 2.0).abs() < 1e-4);
        assert!((c[1] + 1.0).abs() < 1e-3);
        Ok(())
    }
}
