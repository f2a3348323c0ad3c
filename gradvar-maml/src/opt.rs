//! Optimizers of flat parameter vectors.
//!
//! Objectives are maximized, so a step moves parameters along the gradient.
use anyhow::Result;
use gradvar_core::error::GradVarError;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for the meta-update.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
        #[serde(default = "default_beta1")]
        /// Decay of the first moment.
        beta1: f64,
        #[serde(default = "default_beta2")]
        /// Decay of the second moment.
        beta2: f64,
        #[serde(default = "default_eps")]
        /// Added to the denominator.
        eps: f64,
    },

    /// Plain gradient ascent.
    Sgd {
        /// Learning rate.
        lr: f64,
    },
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_eps() -> f64 {
    1e-8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            lr: 1e-3,
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
        }
    }
}

impl OptimizerConfig {
    /// Constructs the optimizer for `num_params` parameters.
    pub fn build(&self, num_params: usize) -> Optimizer {
        match self {
            Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => Optimizer::Adam(Adam {
                lr: *lr,
                beta1: *beta1,
                beta2: *beta2,
                eps: *eps,
                m: Array1::zeros(num_params),
                v: Array1::zeros(num_params),
                t: 0,
            }),
            Self::Sgd { lr } => Optimizer::Sgd { lr: *lr },
        }
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::Adam {
                lr: _,
                beta1,
                beta2,
                eps,
            } => Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
            },
            Self::Sgd { lr: _ } => Self::Sgd { lr },
        }
    }

    /// Learning rate.
    pub fn lr(&self) -> f64 {
        match self {
            Self::Adam { lr, .. } | Self::Sgd { lr } => *lr,
        }
    }
}

/// State of the Adam optimizer.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    m: Array1<f64>,
    v: Array1<f64>,
    t: i32,
}

/// Optimizers.
#[derive(Debug, Clone)]
pub enum Optimizer {
    /// Adam optimizer.
    Adam(Adam),

    /// Plain gradient ascent.
    Sgd {
        /// Learning rate.
        lr: f64,
    },
}

impl Optimizer {
    /// Moves `params` along `grad`.
    pub fn step(&mut self, params: &mut Array1<f64>, grad: &Array1<f64>) -> Result<()> {
        if params.len() != grad.len() {
            return Err(GradVarError::ShapeMismatch {
                context: "Optimizer::step".to_string(),
                expected: vec![params.len()],
                actual: vec![grad.len()],
            }
            .into());
        }
        match self {
            Self::Adam(opt) => {
                if opt.m.len() != grad.len() {
                    return Err(GradVarError::ShapeMismatch {
                        context: "Adam::step".to_string(),
                        expected: vec![opt.m.len()],
                        actual: vec![grad.len()],
                    }
                    .into());
                }
                opt.t += 1;
                let (b1, b2) = (opt.beta1, opt.beta2);
                opt.m = &opt.m * b1 + grad * (1.0 - b1);
                opt.v = &opt.v * b2 + &grad.mapv(|g| g * g) * (1.0 - b2);
                let c1 = 1.0 - b1.powi(opt.t);
                let c2 = 1.0 - b2.powi(opt.t);
                let eps = opt.eps;
                let update = ndarray::Zip::from(&opt.m)
                    .and(&opt.v)
                    .map_collect(|m, v| (m / c1) / ((v / c2).sqrt() + eps));
                params.scaled_add(opt.lr, &update);
            }
            Self::Sgd { lr } => params.scaled_add(*lr, grad),
        }
        Ok(())
    }
}
