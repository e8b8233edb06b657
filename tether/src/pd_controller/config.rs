//! Configuration of [`PdController`](super::PdController).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tether_core::CodecConfig;

/// Configuration of [`PdController`](super::PdController).
///
/// The default gains balance [`Pendulum`](crate::Pendulum) with its default
/// configuration, also when actions lag one or two steps behind.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PdControllerConfig {
    /// Gain on the angle of the pole.
    pub kp_angle: f64,

    /// Gain on the angular velocity of the pole.
    pub kd_angle: f64,

    /// Gain on the position of the cart.
    pub kp_position: f64,

    /// Gain on the velocity of the cart.
    pub kd_position: f64,

    /// Topic on which observations arrive.
    pub obs_topic: String,

    /// Topic on which actions are published.
    pub act_topic: String,

    /// Configuration of the codec, which must match that of the episodes.
    pub codec: CodecConfig,
}

impl Default for PdControllerConfig {
    fn default() -> Self {
        Self {
            kp_angle: 5.0,
            kd_angle: 1.0,
            kp_position: 0.05,
            kd_position: 0.2,
            obs_topic: "simulation/observation_space".to_string(),
            act_topic: "simulation/action_space".to_string(),
            codec: CodecConfig::default(),
        }
    }
}

impl PdControllerConfig {
    /// Sets the gains on the pole.
    pub fn angle_gains(mut self, kp: f64, kd: f64) -> Self {
        self.kp_angle = kp;
        self.kd_angle = kd;
        self
    }

    /// Sets the gains on the cart.
    pub fn position_gains(mut self, kp: f64, kd: f64) -> Self {
        self.kp_position = kp;
        self.kd_position = kd;
        self
    }

    /// Sets the codec configuration.
    pub fn codec(mut self, v: CodecConfig) -> Self {
        self.codec = v;
        self
    }

    /// Constructs [`PdControllerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PdControllerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
