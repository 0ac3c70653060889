//! Scheduling the exponent of importance weight.
use serde::{Deserialize, Serialize};

/// Linear annealing of the exponent $\beta$ of importance weights.
///
/// $\beta$ starts at `beta_zero` when `global_step == learn_start` and reaches 1
/// at `global_step == total_steps`. Unlike a counter-based scheduler, it is a
/// function of the global step, so repeated calls with the same step agree.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct BetaScheduler {
    /// Value of $\beta$ at `learn_start`.
    pub beta_zero: f64,

    /// Global step where the annealing starts.
    pub learn_start: usize,

    /// Global step where $\beta$ reaches 1.
    pub total_steps: usize,
}

impl BetaScheduler {
    /// Creates a scheduler.
    pub fn new(beta_zero: f64, learn_start: usize, total_steps: usize) -> Self {
        Self {
            beta_zero,
            learn_start,
            total_steps,
        }
    }

    /// Increment of $\beta$ per step.
    pub fn beta_grad(&self) -> f64 {
        (1.0 - self.beta_zero) / (self.total_steps as f64 - self.learn_start as f64)
    }

    /// Gets the exponent of importance sampling weight, clamped to `[0, 1]`.
    pub fn beta(&self, global_step: usize) -> f64 {
        if global_step >= self.total_steps {
            1.0
        } else {
            let d = global_step as f64 - self.learn_start as f64;
            (self.beta_zero + d * self.beta_grad()).clamp(0.0, 1.0)
        }
    }
}
