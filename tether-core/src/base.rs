//! Core functionalities.
mod env;
mod step;
use crate::{codec::NdArray, error::TetherError};
pub use env::Env;
use std::fmt::Debug;
pub use step::{EpisodeState, Info, Step};

/// An observation of an environment.
///
/// Observations are immutable snapshots. They are converted into [`NdArray`]
/// to be encoded and published to the remote controller.
pub trait Obs: Clone + Debug {
    /// Returns the array representation of the observation.
    fn to_array(&self) -> NdArray;
}

/// An action of an environment.
pub trait Act: Clone + Debug + Sized {
    /// Builds an action from an array decoded from the action topic.
    ///
    /// Returns [`TetherError::InvalidAction`] if the array does not match
    /// the action space of the environment.
    fn from_array(array: NdArray) -> Result<Self, TetherError>;
}

impl Obs for NdArray {
    fn to_array(&self) -> NdArray {
        self.clone()
    }
}

impl Act for NdArray {
    fn from_array(array: NdArray) -> Result<Self, TetherError> {
        Ok(array)
    }
}
