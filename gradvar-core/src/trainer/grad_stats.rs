use crate::record::{Record, RecordValue};
use ndarray::Array1;

/// Per-coordinate statistics of gradients estimated in repeated sampling rounds.
#[derive(Clone, Debug)]
pub struct GradientStats {
    /// Mean over rounds.
    pub mean: Array1<f64>,

    /// Population standard deviation over rounds.
    pub std: Array1<f64>,

    /// The number of rounds.
    pub n_rounds: usize,
}

impl GradientStats {
    /// Computes statistics of gradients of the same dimension.
    ///
    /// Returns `None` if `grads` is empty.
    pub fn from_gradients(grads: &[Array1<f64>]) -> Option<Self> {
        let first = grads.first()?;
        let n = grads.len() as f64;
        let mut mean = Array1::zeros(first.len());
        for g in grads.iter() {
            mean += g;
        }
        mean /= n;

        let mut var = Array1::<f64>::zeros(first.len());
        for g in grads.iter() {
            let d = g - &mean;
            var += &(&d * &d);
        }
        var /= n;

        Some(Self {
            mean,
            std: var.mapv(f64::sqrt),
            n_rounds: grads.len(),
        })
    }

    /// L2 norm of the mean gradient.
    pub fn mean_norm(&self) -> f64 {
        self.mean.dot(&self.mean).sqrt()
    }

    /// Standard deviation averaged over coordinates.
    pub fn avg_std(&self) -> f64 {
        self.std.mean().unwrap_or(0.0)
    }

    /// Averaged standard deviation relative to the averaged absolute mean.
    pub fn relative_std(&self) -> f64 {
        let abs_mean = self.mean.mapv(f64::abs).mean().unwrap_or(0.0);
        self.avg_std() / (abs_mean + 1e-8)
    }

    /// Statistics as a record with keys `<prefix>GradientMeanNorm`,
    /// `<prefix>GradientStd` and `<prefix>GradientRStd`.
    pub fn to_record(&self, prefix: &str) -> Record {
        Record::from_slice(&[
            (
                format!("{}GradientMeanNorm", prefix),
                RecordValue::Scalar(self.mean_norm()),
            ),
            (
                format!("{}GradientStd", prefix),
                RecordValue::Scalar(self.avg_std()),
            ),
            (
                format!("{}GradientRStd", prefix),
                RecordValue::Scalar(self.relative_std()),
            ),
        ])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gradient_stats() {
        let grads = vec![array![1.0, 0.0], array![3.0, 0.0]];
        let stats = GradientStats::from_gradients(&grads).unwrap();
        assert_eq!(stats.mean, array![2.0, 0.0]);
        assert_eq!(stats.std, array![1.0, 0.0]);
        assert!((stats.avg_std() - 0.5).abs() < 1e-12);
        assert!((stats.relative_std() - 0.5).abs() < 1e-6);

        let record = stats.to_record("Meta-");
        assert_eq!(record.get_scalar("Meta-GradientMeanNorm").unwrap(), 2.0);
        assert!(GradientStats::from_gradients(&[]).is_none());
    }
}
