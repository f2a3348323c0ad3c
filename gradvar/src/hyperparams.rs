//! Typed view of a hyperparameter set.
use crate::{
    error::ConfigError,
    params::{NamedRef, ParamSet, ParamValue},
};
use gradvar_maml::policy::Nonlinearity;
use log::warn;
use std::{fmt, str::FromStr};

/// Names of the mandatory hyperparameters.
pub const MANDATORY_KEYS: [&str; 20] = [
    "seed",
    "algo",
    "sampling_rounds",
    "env",
    "rollouts_per_meta_task",
    "max_path_length",
    "parallel",
    "discount",
    "normalize_adv",
    "positive_adv",
    "hidden_sizes",
    "learn_std",
    "hidden_nonlinearity",
    "output_nonlinearity",
    "inner_lr",
    "learning_rate",
    "n_itr",
    "meta_batch_size",
    "num_inner_grad_steps",
    "scope",
];

/// Selector of the algorithm branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgoTag {
    /// DICE in both the inner and the outer step, `"DICE"`.
    Dice,

    /// VPG inner step and DICE outer step, `"VPG_DICE"`.
    VpgDice,

    /// VPG in both steps, `"VPG"`.
    Vpg,
}

impl AlgoTag {
    /// The tag as written in a hyperparameter set.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dice => "DICE",
            Self::VpgDice => "VPG_DICE",
            Self::Vpg => "VPG",
        }
    }
}

impl FromStr for AlgoTag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DICE" => Ok(Self::Dice),
            "VPG_DICE" => Ok(Self::VpgDice),
            "VPG" => Ok(Self::Vpg),
            _ => Err(ConfigError::UnknownAlgo(s.to_string())),
        }
    }
}

impl fmt::Display for AlgoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Environments that can be referenced from a hyperparameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvRef {
    /// [`PointEnvRandDirec`](gradvar_maml::env::PointEnvRandDirec).
    PointRandDirec,

    /// [`PointEnvRandGoal`](gradvar_maml::env::PointEnvRandGoal).
    PointRandGoal,
}

impl EnvRef {
    /// Fully qualified path of the environment type.
    pub fn path(&self) -> &'static str {
        match self {
            Self::PointRandDirec => "gradvar_maml::env::PointEnvRandDirec",
            Self::PointRandGoal => "gradvar_maml::env::PointEnvRandGoal",
        }
    }

    /// The named reference written to the record.
    pub fn named_ref(&self) -> NamedRef {
        NamedRef::class(self.path())
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "PointEnvRandDirec" => Some(Self::PointRandDirec),
            "PointEnvRandGoal" => Some(Self::PointRandGoal),
            _ => None,
        }
    }
}

/// Validated hyperparameters of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperParams {
    /// Seed of every random stream of the run.
    pub seed: u64,

    /// Algorithm branch.
    pub algo: AlgoTag,

    /// Sampling rounds per iteration used for gradient statistics.
    pub sampling_rounds: usize,

    /// Environment.
    pub env: EnvRef,

    /// Rollouts per task.
    pub rollouts_per_meta_task: usize,

    /// Maximum length of a rollout.
    pub max_path_length: usize,

    /// Parallel sampling.
    pub parallel: bool,

    /// Discount factor.
    pub discount: f64,

    /// Advantage normalization.
    pub normalize_adv: bool,

    /// Positive shift of advantages.
    pub positive_adv: bool,

    /// Sizes of the hidden layers.
    pub hidden_sizes: Vec<usize>,

    /// Trainable standard deviation.
    pub learn_std: bool,

    /// Activation of the hidden layers, identity if `None`.
    pub hidden_nonlinearity: Option<Nonlinearity>,

    /// Activation of the output layer.
    pub output_nonlinearity: Option<Nonlinearity>,

    /// Inner step size.
    pub inner_lr: f64,

    /// Learning rate of the meta-optimizer.
    pub learning_rate: f64,

    /// Outer iterations.
    pub n_itr: usize,

    /// Tasks per meta-batch.
    pub meta_batch_size: usize,

    /// Inner adaptation steps.
    pub num_inner_grad_steps: usize,

    /// Name scope, kept for the record only.
    pub scope: Option<String>,
}

fn get<'a>(params: &'a ParamSet, key: &str) -> Result<&'a ParamValue, ConfigError> {
    params
        .get(key)
        .ok_or_else(|| ConfigError::MissingParam(key.to_string()))
}

fn invalid_type(key: &str, expected: &'static str, v: &ParamValue) -> ConfigError {
    ConfigError::InvalidType {
        key: key.to_string(),
        expected,
        actual: v.to_string(),
    }
}

fn get_bool(params: &ParamSet, key: &str) -> Result<bool, ConfigError> {
    match get(params, key)? {
        ParamValue::Bool(v) => Ok(*v),
        v => Err(invalid_type(key, "bool", v)),
    }
}

fn get_int(params: &ParamSet, key: &str) -> Result<i64, ConfigError> {
    match get(params, key)? {
        ParamValue::Int(v) => Ok(*v),
        v => Err(invalid_type(key, "int", v)),
    }
}

fn to_usize(key: &str, v: i64) -> Result<usize, ConfigError> {
    if v < 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("{} is negative", v),
        });
    }
    Ok(v as usize)
}

fn get_usize(params: &ParamSet, key: &str) -> Result<usize, ConfigError> {
    to_usize(key, get_int(params, key)?)
}

fn get_positive(params: &ParamSet, key: &str) -> Result<usize, ConfigError> {
    match get_usize(params, key)? {
        0 => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "must be positive".to_string(),
        }),
        v => Ok(v),
    }
}

fn get_float(params: &ParamSet, key: &str) -> Result<f64, ConfigError> {
    match get(params, key)? {
        ParamValue::Float(v) => Ok(*v),
        ParamValue::Int(v) => Ok(*v as f64),
        v => Err(invalid_type(key, "float", v)),
    }
}

fn get_nonlinearity(params: &ParamSet, key: &str) -> Result<Option<Nonlinearity>, ConfigError> {
    let name = match get(params, key)? {
        ParamValue::None => return Ok(None),
        ParamValue::Ref(r @ NamedRef::Function(_)) => r.path(),
        ParamValue::Str(s) => s.as_str(),
        v => return Err(invalid_type(key, "function reference", v)),
    };
    name.parse::<Nonlinearity>()
        .map(Some)
        .map_err(|_| ConfigError::UnknownRef {
            key: key.to_string(),
            path: name.to_string(),
        })
}

impl HyperParams {
    /// Validates a hyperparameter set.
    ///
    /// Every key of [`MANDATORY_KEYS`] must be present; nothing is filled by
    /// default. Unknown keys are kept in the record but ignored here.
    pub fn from_param_set(params: &ParamSet) -> Result<Self, ConfigError> {
        for key in MANDATORY_KEYS.iter() {
            get(params, key)?;
        }
        for key in params.keys() {
            if !MANDATORY_KEYS.contains(&key.as_str()) {
                warn!("Hyperparameter {} is not used", key);
            }
        }

        let seed = get_int(params, "seed")?;
        if seed < 0 {
            return Err(ConfigError::InvalidValue {
                key: "seed".to_string(),
                reason: format!("{} is negative", seed),
            });
        }

        let algo = match get(params, "algo")? {
            ParamValue::Str(s) => s.parse::<AlgoTag>()?,
            v => return Err(ConfigError::UnknownAlgo(v.to_string())),
        };

        let env = match get(params, "env")? {
            ParamValue::Ref(r @ NamedRef::Class(_)) => {
                EnvRef::from_name(r.name()).ok_or_else(|| ConfigError::UnknownRef {
                    key: "env".to_string(),
                    path: r.path().to_string(),
                })?
            }
            v => return Err(invalid_type("env", "class reference", v)),
        };

        let hidden_sizes = match get(params, "hidden_sizes")? {
            ParamValue::Tuple(vs) => vs
                .iter()
                .map(|v| match v {
                    ParamValue::Int(n) if *n > 0 => Ok(*n as usize),
                    v => Err(invalid_type("hidden_sizes", "tuple of positive ints", v)),
                })
                .collect::<Result<Vec<_>, _>>()?,
            v => return Err(invalid_type("hidden_sizes", "tuple", v)),
        };

        let scope = match get(params, "scope")? {
            ParamValue::None => None,
            ParamValue::Str(s) => Some(s.clone()),
            v => return Err(invalid_type("scope", "string or None", v)),
        };

        Ok(Self {
            seed: seed as u64,
            algo,
            sampling_rounds: get_positive(params, "sampling_rounds")?,
            env,
            rollouts_per_meta_task: get_positive(params, "rollouts_per_meta_task")?,
            max_path_length: get_positive(params, "max_path_length")?,
            parallel: get_bool(params, "parallel")?,
            discount: get_float(params, "discount")?,
            normalize_adv: get_bool(params, "normalize_adv")?,
            positive_adv: get_bool(params, "positive_adv")?,
            hidden_sizes,
            learn_std: get_bool(params, "learn_std")?,
            hidden_nonlinearity: get_nonlinearity(params, "hidden_nonlinearity")?,
            output_nonlinearity: get_nonlinearity(params, "output_nonlinearity")?,
            inner_lr: get_float(params, "inner_lr")?,
            learning_rate: get_float(params, "learning_rate")?,
            n_itr: get_usize(params, "n_itr")?,
            meta_batch_size: get_positive(params, "meta_batch_size")?,
            num_inner_grad_steps: get_usize(params, "num_inner_grad_steps")?,
            scope,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sweep::SweepConfig;

    fn params(algo: &str) -> ParamSet {
        let mut p = SweepConfig::default().expand().remove(0);
        p.insert("algo".into(), algo.into());
        p
    }

    #[test]
    fn test_default_grid_is_valid() {
        for p in SweepConfig::default().expand() {
            let hp = HyperParams::from_param_set(&p).unwrap();
            assert_eq!(hp.hidden_sizes, vec![64, 64]);
            assert_eq!(hp.hidden_nonlinearity, Some(Nonlinearity::Tanh));
            assert_eq!(hp.output_nonlinearity, None);
            assert_eq!(hp.env, EnvRef::PointRandDirec);
            assert_eq!(hp.scope, None);
        }
    }

    #[test]
    fn test_missing_param() {
        for key in MANDATORY_KEYS.iter() {
            let mut p = params("VPG");
            p.remove(*key);
            assert_eq!(
                HyperParams::from_param_set(&p),
                Err(ConfigError::MissingParam(key.to_string()))
            );
        }
    }

    #[test]
    fn test_unknown_algo() {
        assert_eq!(
            HyperParams::from_param_set(&params("TRPO")),
            Err(ConfigError::UnknownAlgo("TRPO".to_string()))
        );
        for tag in ["DICE", "VPG_DICE", "VPG"] {
            let hp = HyperParams::from_param_set(&params(tag)).unwrap();
            assert_eq!(hp.algo.as_str(), tag);
        }
    }

    #[test]
    fn test_invalid_values() {
        let mut p = params("VPG");
        p.insert("parallel".into(), ParamValue::Int(1));
        assert!(matches!(
            HyperParams::from_param_set(&p),
            Err(ConfigError::InvalidType { .. })
        ));

        let mut p = params("VPG");
        p.insert("meta_batch_size".into(), ParamValue::Int(0));
        assert!(matches!(
            HyperParams::from_param_set(&p),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut p = params("VPG");
        p.insert("env".into(), NamedRef::class("envs::HalfCheetahRandDirecEnv").into());
        assert!(matches!(
            HyperParams::from_param_set(&p),
            Err(ConfigError::UnknownRef { .. })
        ));
    }

    #[test]
    fn test_nonlinearity_by_name() {
        let mut p = params("VPG");
        p.insert("hidden_nonlinearity".into(), NamedRef::function("tf.nn.relu").into());
        p.insert("output_nonlinearity".into(), "tanh".into());
        let hp = HyperParams::from_param_set(&p).unwrap();
        assert_eq!(hp.hidden_nonlinearity, Some(Nonlinearity::Relu));
        assert_eq!(hp.output_nonlinearity, Some(Nonlinearity::Tanh));
    }

    #[test]
    fn test_hidden_nonlinearity_none() {
        let mut p = params("VPG");
        p.insert("hidden_nonlinearity".into(), ParamValue::None);
        let hp = HyperParams::from_param_set(&p).unwrap();
        assert_eq!(hp.hidden_nonlinearity, None);
    }
}
