#![warn(missing_docs)]
//! Core components of gradient-variance experiments for gradient-based
//! meta-reinforcement learning.
//!
//! This crate defines the seams between the objects wired together by an
//! experiment:
//!
//! * [`MetaEnv`] - an environment exposing a distribution over tasks.
//! * [`MetaPolicy`] - a stochastic policy with pre-update parameters and one
//!   adapted parameter vector per task of the meta-batch.
//! * [`MetaSampler`] - collects rollouts for every task of the meta-batch.
//! * [`Baseline`] and [`SampleProcessor`] - turn raw [`Path`]s into
//!   [`SamplesData`] with returns and advantage estimates.
//! * [`MetaAlgo`] - inner-loop adaptation and outer-loop meta-gradients.
//! * [`Trainer`] - runs the outer loop and records statistics of the
//!   meta-gradient across repeated sampling rounds.
//!
//! It also provides [`record`] for metrics and [`logger`] for writing
//! metrics and parameter snapshots into an experiment directory.
pub mod error;
pub mod logger;
pub mod record;
pub mod util;

mod base;
pub use base::{
    AgentInfo, Baseline, MetaAlgo, MetaEnv, MetaPolicy, MetaSampler, Path, SampleProcessor,
    SamplesData, Step,
};

mod trainer;
pub use trainer::{GradientStats, Trainer, TrainerConfig};
