//! Gaussian MLP meta-policy.
mod gaussian;
mod mlp;
mod nonlinearity;
pub use gaussian::{MetaGaussianMlpPolicy, MetaGaussianMlpPolicyConfig};
pub use mlp::Mlp;
pub use nonlinearity::Nonlinearity;

use rand::Rng;

/// Draws a sample of the standard normal distribution (Box-Muller).
pub(crate) fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
