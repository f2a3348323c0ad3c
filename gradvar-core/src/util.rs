//! Numeric utilities shared by sample processors and the trainer.
use ndarray::{Array1, ArrayView1};

/// `y_t = Σ_{k≥0} discount^k x_{t+k}`.
pub fn discount_cumsum(xs: ArrayView1<f64>, discount: f64) -> Array1<f64> {
    let mut ys = Array1::zeros(xs.len());
    let mut acc = 0.0;
    for t in (0..xs.len()).rev() {
        acc = xs[t] + discount * acc;
        ys[t] = acc;
    }
    ys
}

/// Rescales to zero mean and unit variance, `(x - μ) / (σ + 1e-8)`.
pub fn normalize(xs: &Array1<f64>) -> Array1<f64> {
    let (mean, std) = mean_std(xs.view());
    xs.mapv(|x| (x - mean) / (std + 1e-8))
}

/// Shifts values so that all of them are positive, `x - min + 1e-8`.
pub fn shift_to_positive(xs: &Array1<f64>) -> Array1<f64> {
    let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    xs.mapv(|x| x - min + 1e-8)
}

/// Mean and population standard deviation. Zeros for an empty array.
pub fn mean_std(xs: ArrayView1<f64>) -> (f64, f64) {
    if xs.is_empty() {
        return (0.0, 0.0);
    }
    let n = xs.len() as f64;
    let mean = xs.sum() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Derives a seed for an independent random stream.
///
/// The same `(seed, stream)` pair always gives the same value. Streams are
/// mixed with splitmix64, so neighbouring indices give unrelated seeds.
pub fn derive_seed(seed: u64, stream: &[u64]) -> u64 {
    let mut z = splitmix64(seed);
    for s in stream.iter() {
        z = splitmix64(z ^ splitmix64(*s));
    }
    z
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_discount_cumsum() {
        let ys = discount_cumsum(array![1.0, 1.0, 1.0].view(), 0.5);
        assert_eq!(ys, array![1.75, 1.5, 1.0]);
    }

    #[test]
    fn test_normalize_and_shift() {
        let xs = normalize(&array![1.0, 2.0, 3.0]);
        let (m, s) = mean_std(xs.view());
        assert!(m.abs() < 1e-12);
        assert!((s - 1.0).abs() < 1e-6);

        let ys = shift_to_positive(&array![-2.0, 0.0, 1.0]);
        assert!(ys.iter().all(|y| *y > 0.0));
        assert!((ys[2] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_derive_seed() {
        assert_eq!(derive_seed(35, &[1, 2]), derive_seed(35, &[1, 2]));
        assert_ne!(derive_seed(35, &[1, 2]), derive_seed(35, &[2, 1]));
        assert_ne!(derive_seed(35, &[0]), derive_seed(76, &[0]));
    }
}
