//! Per-sample weights of surrogate objectives.
//!
//! Every objective `J(θ)` used here has a gradient of the form
//! `Σ_n w_n ∇ log π_θ(a_n | s_n)`, so an objective is fully described by its
//! weights `w_n`. The weights are evaluated at the parameters the gradient is
//! taken at.
use super::InnerType;
use anyhow::Result;
use gradvar_core::{error::GradVarError, SamplesData};
use ndarray::{Array1, Axis};

const LOG_2PI: f64 = 1.837_877_066_409_345_3;

/// Log-likelihoods of the actions under the behaviour policy that sampled them.
pub fn behaviour_log_likelihood(samples: &SamplesData) -> Array1<f64> {
    let inv_var = samples.log_stds.mapv(|s| (-2.0 * s).exp());
    let z = (&samples.actions - &samples.means).mapv(|d| d * d) * &inv_var;
    let act_dim = samples.actions.ncols() as f64;
    z.sum_axis(Axis(1)) * -0.5 - samples.log_stds.sum_axis(Axis(1)) - 0.5 * LOG_2PI * act_dim
}

/// Weights of the likelihood-ratio objectives with advantages.
///
/// * `LogLikelihood`: `J = (1/N) Σ_n log π(a_n|s_n) A_n`
/// * `LikelihoodRatio`: `J = (1/N) Σ_n π(a_n|s_n) / π_old(a_n|s_n) A_n`
/// * `Dice`: `J = (1/N) Σ_n ⊡(log π(a_n|s_n)) A_n`, where `⊡(x) = exp(x - ⊥(x))`
pub fn vpg_weights(
    samples: &SamplesData,
    log_likelihood: &Array1<f64>,
    inner_type: InnerType,
) -> Array1<f64> {
    let n = samples.len().max(1) as f64;
    match inner_type {
        InnerType::LogLikelihood | InnerType::Dice => &samples.advantages / n,
        InnerType::LikelihoodRatio => {
            let logp_old = behaviour_log_likelihood(samples);
            let ratio = (log_likelihood - &logp_old).mapv(f64::exp);
            ratio * &samples.advantages / n
        }
    }
}

/// Weights of the DICE objective on baseline-adjusted rewards.
///
/// `J = (1/P) Σ_paths Σ_t γ^t r̃_t ⊡(Σ_{t'≤t} log π(a_t'|s_t'))`, with the
/// magic box taken relative to the behaviour policy. The weight of step `t'`
/// is `(1/P) Σ_{t≥t'} γ^t r̃_t exp(c_t - c_old_t)` where `c` is the cumulative
/// log-likelihood along the path.
pub fn dice_weights(
    samples: &SamplesData,
    log_likelihood: &Array1<f64>,
    discount: f64,
) -> Result<Array1<f64>> {
    let adjusted = samples.adjusted_rewards.as_ref().ok_or_else(|| {
        GradVarError::InvalidConfig("DICE objective needs adjusted rewards".to_string())
    })?;
    let logp_old = behaviour_log_likelihood(samples);
    let n_paths = samples.n_paths().max(1) as f64;
    let mut weights = Array1::zeros(samples.len());

    for (a, b) in samples.path_ranges() {
        // Terms γ^t r̃_t ⊡_t of the path
        let mut cum = 0.0;
        let mut discount_t = 1.0;
        let mut terms = Vec::with_capacity(b - a);
        for i in a..b {
            cum += log_likelihood[i] - logp_old[i];
            terms.push(discount_t * adjusted[i] * cum.exp());
            discount_t *= discount;
        }
        let mut acc = 0.0;
        for (k, i) in (a..b).enumerate().rev() {
            acc += terms[k];
            weights[i] = acc / n_paths;
        }
    }
    Ok(weights)
}

/// `J` of the DICE objective, mainly for logging.
pub fn dice_objective(
    samples: &SamplesData,
    log_likelihood: &Array1<f64>,
    discount: f64,
) -> Result<f64> {
    let adjusted = samples.adjusted_rewards.as_ref().ok_or_else(|| {
        GradVarError::InvalidConfig("DICE objective needs adjusted rewards".to_string())
    })?;
    let logp_old = behaviour_log_likelihood(samples);
    let mut total = 0.0;
    for (a, b) in samples.path_ranges() {
        let mut cum = 0.0;
        let mut discount_t = 1.0;
        for i in a..b {
            cum += log_likelihood[i] - logp_old[i];
            total += discount_t * adjusted[i] * cum.exp();
            discount_t *= discount;
        }
    }
    Ok(total / samples.n_paths().max(1) as f64)
}

#[cfg(test)]
mod test {
    use super::*;
    use gradvar_core::{AgentInfo, Path};
    use ndarray::array;

    fn samples() -> SamplesData {
        let obs = vec![array![0.0], array![1.0], array![2.0]];
        let act = vec![array![0.5], array![-0.5], array![0.1]];
        let infos = vec![
            AgentInfo {
                mean: array![0.0],
                log_std: array![0.0],
            };
            3
        ];
        let p1 = Path::from_steps(&obs, &act, vec![1.0, 2.0, 3.0], &infos).unwrap();
        let p2 = Path::from_steps(&obs[..2], &act[..2], vec![1.0, 1.0], &infos[..2]).unwrap();
        let mut s = SamplesData::from_paths(&[p1, p2]).unwrap();
        s.adjusted_rewards = Some(s.rewards.clone());
        s.advantages = array![1.0, -1.0, 2.0, 0.5, 0.5];
        s
    }

    #[test]
    fn test_behaviour_log_likelihood_standard_normal() {
        let s = samples();
        let ll = behaviour_log_likelihood(&s);
        assert!((ll[0] - (-0.125 - 0.5 * LOG_2PI)).abs() < 1e-12);
    }

    #[test]
    fn test_dice_weights_at_behaviour_policy() -> Result<()> {
        let s = samples();
        let ll = behaviour_log_likelihood(&s);
        let w = dice_weights(&s, &ll, 0.5)?;
        // Path 1: rewards 1, 2, 3 with γ = 0.5 -> terms 1, 1, 0.75
        // Path 2: rewards 1, 1 -> terms 1, 0.5
        let expected = array![2.75, 1.75, 0.75, 1.5, 0.5] / 2.0;
        for (a, b) in w.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((dice_objective(&s, &ll, 0.5)? - 2.125).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_dice_weights_match_finite_difference() -> Result<()> {
        // Perturbing the log-likelihood of step i changes J by w_i * eps.
        let s = samples();
        let ll = behaviour_log_likelihood(&s) + array![0.1, -0.2, 0.05, 0.3, 0.0];
        let w = dice_weights(&s, &ll, 0.9)?;
        let eps = 1e-6;
        for i in 0..s.len() {
            let mut lp = ll.clone();
            lp[i] += eps;
            let mut lm = ll.clone();
            lm[i] -= eps;
            let fd = (dice_objective(&s, &lp, 0.9)? - dice_objective(&s, &lm, 0.9)?) / (2.0 * eps);
            assert!((fd - w[i]).abs() < 1e-6, "{}: {} vs {}", i, fd, w[i]);
        }
        Ok(())
    }

    #[test]
    fn test_likelihood_ratio_weights() {
        let s = samples();
        let ll = behaviour_log_likelihood(&s);
        let w = vpg_weights(&s, &ll, InnerType::LikelihoodRatio);
        let w_ll = vpg_weights(&s, &ll, InnerType::LogLikelihood);
        for (a, b) in w.iter().zip(w_ll.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        let w2 = vpg_weights(&s, &(&ll + 2f64.ln()), InnerType::LikelihoodRatio);
        assert!((w2[0] - 2.0 * w_ll[0]).abs() < 1e-12);
    }

    #[test]
    fn test_missing_adjusted_rewards() {
        let mut s = samples();
        s.adjusted_rewards = None;
        let ll = behaviour_log_likelihood(&s);
        assert!(dice_weights(&s, &ll, 0.9).is_err());
    }
}
