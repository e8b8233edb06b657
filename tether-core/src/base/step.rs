//! Environment step.
use super::Env;

/// Additional information to `Obs` and `Act`.
pub trait Info {}

impl Info for () {}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
///
/// An environment emits a [`Step`] object at every interaction step.
pub struct Step<E: Env> {
    /// Action.
    pub act: E::Act,

    /// Observation.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if episode is terminated.
    pub is_terminated: bool,

    /// Flag denoting if episode is truncated.
    pub is_truncated: bool,

    /// Information defined by user.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    /// The episode state this step leads to.
    ///
    /// Termination takes precedence when both flags are set.
    pub fn episode_state(&self) -> EpisodeState {
        if self.is_terminated {
            EpisodeState::Terminated
        } else if self.is_truncated {
            EpisodeState::Truncated
        } else {
            EpisodeState::Running
        }
    }
}

/// State of an episode, advanced only by [`Step`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeState {
    /// The episode accepts actions.
    Running,

    /// The environment reached a defined end state.
    Terminated,

    /// The episode was cut by an external limit, e.g., a step count.
    Truncated,
}

impl Default for EpisodeState {
    fn default() -> Self {
        EpisodeState::Running
    }
}

impl EpisodeState {
    /// Returns `true` for [`EpisodeState::Terminated`] and [`EpisodeState::Truncated`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EpisodeState::Running)
    }
}
