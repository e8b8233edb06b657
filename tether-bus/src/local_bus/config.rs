//! Configuration of [`LocalBus`](super::LocalBus).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`LocalBus`](super::LocalBus).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LocalBusConfig {
    /// Capacity of the queue of each subscriber.
    ///
    /// A message published while the queue is full is dropped for that
    /// subscriber. `None` makes the queues unbounded, the default.
    pub queue_capacity: Option<usize>,
}

impl LocalBusConfig {
    /// Sets the capacity of subscriber queues.
    pub fn queue_capacity(mut self, v: Option<usize>) -> Self {
        self.queue_capacity = v;
        self
    }

    /// Constructs [`LocalBusConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`LocalBusConfig`].
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
    fn test_serde_local_bus_config() -> Result<()> {
        let config = LocalBusConfig::default().queue_capacity(Some(16));
        let dir = TempDir::new("local_bus_config")?;
        let path = dir.path().join("local_bus_config.yaml");
        config.save(&path)?;
        assert_eq!(config, LocalBusConfig::load(&path)?);
        Ok(())
    }
}
