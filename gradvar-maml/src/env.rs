//! Meta-task environments.
//!
//! The point-mass environments stand in for locomotion meta-tasks: the
//! dynamics are a damped double integrator, which keeps rollouts cheap
//! while the task distribution has the same structure (random direction or
//! random goal per task).
mod normalized;
mod point_rand_direc;
mod point_rand_goal;
pub use normalized::{NormalizedEnv, NormalizedEnvConfig};
pub use point_rand_direc::PointEnvRandDirec;
pub use point_rand_goal::PointEnvRandGoal;

use anyhow::Result;
use gradvar_core::error::GradVarError;
use ndarray::Array1;

fn check_action(act: &Array1<f64>, act_dim: usize, context: &str) -> Result<()> {
    if act.len() != act_dim {
        return Err(GradVarError::ShapeMismatch {
            context: context.to_string(),
            expected: vec![act_dim],
            actual: vec![act.len()],
        }
        .into());
    }
    Ok(())
}

fn clip(act: &Array1<f64>, lb: &Array1<f64>, ub: &Array1<f64>) -> Array1<f64> {
    let mut out = act.clone();
    out.iter_mut()
        .zip(lb.iter().zip(ub.iter()))
        .for_each(|(a, (l, u))| *a = a.max(*l).min(*u));
    out
}
