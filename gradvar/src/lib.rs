#![warn(missing_docs)]
//! Sweep launcher of gradient-variance experiments.
//!
//! A run is described by a flat hyperparameter set ([`ParamSet`]). The
//! launcher validates it into [`HyperParams`], selects the sample processor
//! and the algorithm from the `algo` tag ([`AlgoBundle`]), wires environment,
//! meta-policy, sampler and trainer ([`Components`]) and trains while logging
//! into `<base_dir>/data/gradient_variance_v2` ([`run_experiment`]).
//!
//! | `algo`     | inner step           | outer step           |
//! |------------|----------------------|----------------------|
//! | `DICE`     | DICE                 | DICE                 |
//! | `VPG_DICE` | VPG, likelihood ratio| DICE                 |
//! | `VPG`      | VPG, likelihood ratio| VPG, likelihood ratio|
//!
//! [`SweepConfig`] expands a grid of values into hyperparameter sets and
//! [`run_sweep`] runs them one after another.
pub mod components;
pub mod error;
pub mod hyperparams;
pub mod params;
pub mod runner;
pub mod sweep;

pub use components::{AlgoBundle, Components};
pub use error::ConfigError;
pub use hyperparams::{AlgoTag, EnvRef, HyperParams};
pub use params::{NamedRef, ParamSet, ParamValue};
pub use runner::{run_experiment, RunOptions, EXP_NAME};
pub use sweep::{run_sweep, SweepConfig, SweepSummary};
