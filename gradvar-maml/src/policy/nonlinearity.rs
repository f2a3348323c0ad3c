use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Elementwise activation of an MLP layer.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Nonlinearity {
    /// Hyperbolic tangent.
    Tanh,

    /// Rectified linear unit.
    Relu,

    /// Logistic sigmoid.
    Sigmoid,

    /// `ln(1 + e^x)`.
    Softplus,
}

impl Nonlinearity {
    /// Applies the activation.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Tanh => x.tanh(),
            Self::Relu => x.max(0.0),
            Self::Sigmoid => sigmoid(x),
            Self::Softplus => {
                if x > 30.0 {
                    x
                } else {
                    x.exp().ln_1p()
                }
            }
        }
    }

    /// Derivative given the pre-activation `x` and the activation `y`.
    pub fn derivative(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Tanh => 1.0 - y * y,
            Self::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Sigmoid => y * (1.0 - y),
            Self::Softplus => sigmoid(x),
        }
    }

    /// Name of the function.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tanh => "tanh",
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Softplus => "softplus",
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl fmt::Display for Nonlinearity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Nonlinearity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept qualified names such as "tf.tanh" or "nn.relu".
        let name = s.rsplit(|c: char| c == '.' || c == ':').next().unwrap_or(s);
        match name.to_ascii_lowercase().as_str() {
            "tanh" => Ok(Self::Tanh),
            "relu" => Ok(Self::Relu),
            "sigmoid" => Ok(Self::Sigmoid),
            "softplus" => Ok(Self::Softplus),
            _ => Err(format!("unknown nonlinearity: {}", s)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_derivatives_match_finite_differences() {
        let eps = 1e-6;
        for f in [
            Nonlinearity::Tanh,
            Nonlinearity::Relu,
            Nonlinearity::Sigmoid,
            Nonlinearity::Softplus,
        ] {
            for x in [-1.3, -0.2, 0.4, 2.1] {
                let fd = (f.apply(x + eps) - f.apply(x - eps)) / (2.0 * eps);
                let d = f.derivative(x, f.apply(x));
                assert!((fd - d).abs() < 1e-5, "{} at {}", f, x);
            }
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("tanh".parse::<Nonlinearity>(), Ok(Nonlinearity::Tanh));
        assert_eq!("tf.nn.relu".parse::<Nonlinearity>(), Ok(Nonlinearity::Relu));
        assert!("swish".parse::<Nonlinearity>().is_err());
    }
}
