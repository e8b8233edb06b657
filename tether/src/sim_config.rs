//! Configuration of the `tether-sim` binary.
use crate::{PdControllerConfig, PendulumConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tether_bus::LocalBusConfig;
use tether_core::EpisodeConfig;

/// Configuration of a simulation of [`Pendulum`](crate::Pendulum) balanced by
/// [`PdController`](crate::PdController) over [`LocalBus`](tether_bus::LocalBus).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Configuration of episodes.
    pub episode: EpisodeConfig,

    /// Configuration of the environment.
    pub env: PendulumConfig,

    /// Configuration of the remote controller.
    pub controller: PdControllerConfig,

    /// Configuration of the transport.
    pub bus: LocalBusConfig,
}

impl SimConfig {
    /// Constructs [`SimConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`SimConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_sim_config() -> Result<()> {
        let config = SimConfig {
            episode: EpisodeConfig::default().action_timeout_ms(Some(500)),
            env: PendulumConfig::default().max_steps(200),
            controller: PdControllerConfig::default().angle_gains(6.0, 1.2),
            bus: LocalBusConfig::default().queue_capacity(Some(8)),
        };

        let dir = TempDir::new("sim_config")?;
        let path = dir.path().join("sim_config.yaml");
        config.save(&path)?;
        assert_eq!(config, SimConfig::load(&path)?);
        Ok(())
    }

    #[test]
    fn test_partial_sim_config() -> Result<()> {
        let config: SimConfig = serde_yaml::from_str("env:\n  max_steps: 50\n")?;
        assert_eq!(config.env.max_steps, 50);
        assert_eq!(config.env.gravity, 9.8);
        assert_eq!(config.episode, EpisodeConfig::default());
        Ok(())
    }
}
