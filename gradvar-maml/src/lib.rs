#![warn(missing_docs)]
//! Components of gradient-based meta-reinforcement learning.
//!
//! * [`env`] - meta-task environments and the normalizing wrapper
//! * [`policy`] - Gaussian MLP meta-policy
//! * [`sampler`] - collects rollouts of a meta-batch, optionally in parallel
//! * [`baseline`] - linear baselines fitted by ridge regression
//! * [`sample_processor`] - returns and advantages for VPG and DICE objectives
//! * [`algo`] - DICE-MAML, VPG-DICE-MAML and VPG-MAML
pub mod algo;
pub mod baseline;
pub mod env;
pub mod opt;
pub mod policy;
pub mod sample_processor;
pub mod sampler;
