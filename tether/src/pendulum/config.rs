//! Configuration of [`Pendulum`](super::Pendulum).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Pendulum`](super::Pendulum).
///
/// Lengths are in meters, masses in kilograms and times in seconds.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PendulumConfig {
    /// Gravitational acceleration.
    pub gravity: f64,

    /// Mass of the cart.
    pub cart_mass: f64,

    /// Mass of the pole.
    pub pole_mass: f64,

    /// Half length of the pole.
    pub half_length: f64,

    /// Integration time step.
    pub dt: f64,

    /// Force applied to the cart per unit of action.
    pub gear: f64,

    /// Actions are clipped into `[-max_action, max_action]`.
    pub max_action: f64,

    /// Viscous friction of the cart.
    pub cart_damping: f64,

    /// Viscous friction of the pole joint.
    pub pole_damping: f64,

    /// The episode terminates when the angle of the pole exceeds this value in radians.
    pub healthy_angle: f64,

    /// Half length of the rail. The cart stops at its ends.
    pub max_position: f64,

    /// The initial state is drawn uniformly from `[-init_noise, init_noise]`.
    pub init_noise: f64,

    /// The episode is truncated after this number of steps.
    pub max_steps: usize,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            cart_mass: 1.0,
            pole_mass: 0.1,
            half_length: 0.5,
            dt: 0.02,
            gear: 10.0,
            max_action: 3.0,
            cart_damping: 0.1,
            pole_damping: 0.01,
            healthy_angle: 0.2,
            max_position: 1.0,
            init_noise: 0.01,
            max_steps: 1000,
        }
    }
}

impl PendulumConfig {
    /// Sets the number of steps after which the episode is truncated.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    /// Sets the range of the initial state.
    pub fn init_noise(mut self, v: f64) -> Self {
        self.init_noise = v;
        self
    }

    /// Sets the integration time step.
    pub fn dt(mut self, v: f64) -> Self {
        self.dt = v;
        self
    }

    /// Constructs [`PendulumConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PendulumConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
