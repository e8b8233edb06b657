//! Environment.
use super::{Act, Info, Obs, Step};
use crate::{error::TetherError, record::Record};
use anyhow::Result;

/// Represents an environment, typically an MDP, advanced one step per action.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Performs an environment step.
    ///
    /// A non-fatal error (see [`TetherError::is_fatal`]), typically
    /// [`TetherError::InvalidAction`], rejects the single action and must leave
    /// the environment untouched. Any other error is treated as a fault that
    /// ends the episode.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record), TetherError>
    where
        Self: Sized;

    /// Releases resources held by the environment.
    fn close(&mut self) {}
}
