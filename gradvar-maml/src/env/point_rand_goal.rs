use super::{check_action, clip};
use anyhow::Result;
use gradvar_core::{
    record::{Record, RecordValue},
    MetaEnv, Path, Step,
};
use ndarray::{array, Array1};
use rand::{rngs::SmallRng, Rng};

const GOAL_RADIUS: f64 = 2.0;
const CTRL_COST: f64 = 0.01;
const ACT_LIMIT: f64 = 0.2;

/// Point mass moving towards a task-specific goal.
///
/// * Observation: `[x, y]`
/// * Action: displacement in `[-0.2, 0.2]^2`
/// * Task: goal drawn uniformly from the disc of radius 2
/// * Reward: `-|pos - goal| - 0.01 * |a|^2`
#[derive(Clone, Debug)]
pub struct PointEnvRandGoal {
    pos: Array1<f64>,
    goal: [f64; 2],
}

impl Default for PointEnvRandGoal {
    fn default() -> Self {
        Self::new()
    }
}

impl PointEnvRandGoal {
    /// Constructs the environment with the goal at `(1, 0)`.
    pub fn new() -> Self {
        Self {
            pos: Array1::zeros(2),
            goal: [1.0, 0.0],
        }
    }

    fn distance(&self) -> f64 {
        ((self.pos[0] - self.goal[0]).powi(2) + (self.pos[1] - self.goal[1]).powi(2)).sqrt()
    }
}

impl MetaEnv for PointEnvRandGoal {
    type Task = [f64; 2];

    fn obs_dim(&self) -> usize {
        2
    }

    fn act_dim(&self) -> usize {
        2
    }

    fn action_bounds(&self) -> (Array1<f64>, Array1<f64>) {
        (Array1::from_elem(2, -ACT_LIMIT), Array1::from_elem(2, ACT_LIMIT))
    }

    fn sample_tasks(&mut self, n: usize, rng: &mut SmallRng) -> Vec<[f64; 2]> {
        (0..n)
            .map(|_| {
                let r = GOAL_RADIUS * rng.gen::<f64>().sqrt();
                let theta = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
                [r * theta.cos(), r * theta.sin()]
            })
            .collect()
    }

    fn set_task(&mut self, task: [f64; 2]) {
        self.goal = task;
    }

    fn get_task(&self) -> [f64; 2] {
        self.goal
    }

    fn reset(&mut self) -> Result<Array1<f64>> {
        self.pos.fill(0.0);
        Ok(self.pos.clone())
    }

    fn step(&mut self, act: &Array1<f64>) -> Result<Step> {
        check_action(act, 2, "PointEnvRandGoal::step")?;
        let (lb, ub) = self.action_bounds();
        let act = clip(act, &lb, &ub);
        self.pos = &self.pos + &act;
        let reward = -self.distance() - CTRL_COST * act.dot(&act);
        Ok(Step::new(array![self.pos[0], self.pos[1]], reward, false))
    }

    fn log_diagnostics(&self, paths: &[Path], prefix: &str) -> Record {
        let finals: Vec<f64> = paths
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.rewards[p.len() - 1])
            .collect();
        if finals.is_empty() {
            return Record::empty();
        }
        Record::from_slice(&[(
            format!("{}AverageFinalReward", prefix),
            RecordValue::Scalar(finals.iter().sum::<f64>() / finals.len() as f64),
        )])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_goals_in_disc() {
        let mut env = PointEnvRandGoal::new();
        let mut rng = SmallRng::seed_from_u64(3);
        for g in env.sample_tasks(100, &mut rng) {
            assert!((g[0].powi(2) + g[1].powi(2)).sqrt() <= GOAL_RADIUS);
        }
    }

    #[test]
    fn test_moving_to_goal_improves_reward() -> Result<()> {
        let mut env = PointEnvRandGoal::new();
        env.set_task([1.0, 0.0]);
        env.reset()?;
        let r1 = env.step(&array![0.2, 0.0])?.reward;
        let r2 = env.step(&array![0.2, 0.0])?.reward;
        assert!(r2 > r1);
        Ok(())
    }
}
