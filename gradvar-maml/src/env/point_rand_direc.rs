use super::{check_action, clip};
use anyhow::Result;
use gradvar_core::{
    record::{Record, RecordValue},
    MetaEnv, Path, Step,
};
use ndarray::{array, Array1};
use rand::{rngs::SmallRng, Rng};

const DT: f64 = 0.1;
const DAMPING: f64 = 0.9;
const CTRL_COST: f64 = 0.05;
const ACT_LIMIT: f64 = 0.5;

/// Point mass rewarded for moving along the x-axis in a task-specific
/// direction.
///
/// * Observation: `[x, y, vx, vy]`
/// * Action: acceleration in `[-0.5, 0.5]^2`
/// * Task: direction `+1.0` (forward) or `-1.0` (backward)
/// * Reward: `direction * vx - 0.05 * |a|^2`
#[derive(Clone, Debug)]
pub struct PointEnvRandDirec {
    pos: Array1<f64>,
    vel: Array1<f64>,
    direction: f64,
}

impl Default for PointEnvRandDirec {
    fn default() -> Self {
        Self::new()
    }
}

impl PointEnvRandDirec {
    /// Constructs the environment with the forward task.
    pub fn new() -> Self {
        Self {
            pos: Array1::zeros(2),
            vel: Array1::zeros(2),
            direction: 1.0,
        }
    }

    fn obs(&self) -> Array1<f64> {
        array![self.pos[0], self.pos[1], self.vel[0], self.vel[1]]
    }
}

impl MetaEnv for PointEnvRandDirec {
    type Task = f64;

    fn obs_dim(&self) -> usize {
        4
    }

    fn act_dim(&self) -> usize {
        2
    }

    fn action_bounds(&self) -> (Array1<f64>, Array1<f64>) {
        (Array1::from_elem(2, -ACT_LIMIT), Array1::from_elem(2, ACT_LIMIT))
    }

    fn sample_tasks(&mut self, n: usize, rng: &mut SmallRng) -> Vec<f64> {
        (0..n)
            .map(|_| if rng.gen_bool(0.5) { 1.0 } else { -1.0 })
            .collect()
    }

    fn set_task(&mut self, task: f64) {
        self.direction = task;
    }

    fn get_task(&self) -> f64 {
        self.direction
    }

    fn reset(&mut self) -> Result<Array1<f64>> {
        self.pos.fill(0.0);
        self.vel.fill(0.0);
        Ok(self.obs())
    }

    fn step(&mut self, act: &Array1<f64>) -> Result<Step> {
        check_action(act, 2, "PointEnvRandDirec::step")?;
        let (lb, ub) = self.action_bounds();
        let act = clip(act, &lb, &ub);

        self.vel = &self.vel * DAMPING + &act;
        self.pos = &self.pos + &(&self.vel * DT);
        let reward = self.direction * self.vel[0] - CTRL_COST * act.dot(&act);

        Ok(Step::new(self.obs(), reward, false))
    }

    fn log_diagnostics(&self, paths: &[Path], prefix: &str) -> Record {
        if paths.is_empty() {
            return Record::empty();
        }
        // Displacement along x between the first and the last observation
        let progress: Vec<f64> = paths
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.observations[[p.len() - 1, 0]] - p.observations[[0, 0]])
            .collect();
        let avg = progress.iter().sum::<f64>() / progress.len().max(1) as f64;
        Record::from_slice(&[(
            format!("{}AverageForwardProgress", prefix),
            RecordValue::Scalar(avg),
        )])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_direction_sign_of_reward() -> Result<()> {
        let mut env = PointEnvRandDirec::new();
        env.set_task(-1.0);
        env.reset()?;
        let step = env.step(&array![0.5, 0.0])?;
        assert!(step.reward < 0.0);

        env.set_task(1.0);
        env.reset()?;
        let step = env.step(&array![0.5, 0.0])?;
        assert!(step.reward > 0.0);
        assert_eq!(step.obs.len(), 4);
        Ok(())
    }

    #[test]
    fn test_sample_tasks() {
        let mut env = PointEnvRandDirec::new();
        let mut rng = SmallRng::seed_from_u64(0);
        let tasks = env.sample_tasks(50, &mut rng);
        assert_eq!(tasks.len(), 50);
        assert!(tasks.iter().all(|t| *t == 1.0 || *t == -1.0));
        assert!(tasks.iter().any(|t| *t == 1.0) && tasks.iter().any(|t| *t == -1.0));
    }

    #[test]
    fn test_wrong_action_dim() {
        let mut env = PointEnvRandDirec::new();
        assert!(env.step(&array![0.1]).is_err());
    }
}
