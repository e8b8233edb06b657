//! Cumulative reward of an episode.

/// Running total of rewards of the steps taken in an episode.
///
/// The total is zero at episode start, so a report is well defined even if
/// the episode ends before any action is applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RewardAccumulator {
    total: f32,
    n_steps: usize,
}

impl RewardAccumulator {
    /// Constructs an accumulator with zero total.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the reward of a step that has been taken.
    pub fn add(&mut self, delta: f32) {
        self.total += delta;
        self.n_steps += 1;
    }

    /// Returns the cumulative reward.
    pub fn total(&self) -> f32 {
        self.total
    }

    /// Returns the number of rewards added.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Sets the total back to zero for a new episode.
    pub fn reset(&mut self) {
        self.total = 0.0;
        self.n_steps = 0;
    }
}
