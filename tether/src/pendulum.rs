//! A damped inverted pendulum on a cart.
//!
//! The observation is `[position, angle, velocity, angular_velocity]` as a
//! `f64` array of shape `[4]` and the action is a single motor command, given
//! as a `f32` or `f64` array of shape `[1]`. Every step in which the pole stays
//! within [`PendulumConfig::healthy_angle`] yields a reward of one.
mod base;
mod config;
pub use base::{Pendulum, PendulumAct, PendulumObs};
pub use config::PendulumConfig;
