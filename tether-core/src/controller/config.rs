//! Configuration of [`EpisodeController`](super::EpisodeController).
use crate::codec::CodecConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
    time::Duration,
};

/// Configuration of [`EpisodeController`](super::EpisodeController).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Topic on which observations are published.
    pub obs_topic: String,

    /// Topic on which actions arrive.
    pub act_topic: String,

    /// Initial sleep between polls of an empty mailbox, in milliseconds.
    pub poll_interval_ms: u64,

    /// Upper bound of the sleep between polls, in milliseconds.
    ///
    /// The sleep doubles at every empty poll up to this value.
    pub max_poll_interval_ms: u64,

    /// Number of retries of a failed publish before the episode is aborted.
    pub max_publish_retries: usize,

    /// Time to wait for an action before the episode is aborted, in milliseconds.
    ///
    /// `None` waits indefinitely.
    pub action_timeout_ms: Option<u64>,

    /// Time between subscribing to actions and publishing the first
    /// observation, in milliseconds.
    ///
    /// Actions arriving in this window answer observations of an earlier
    /// episode on the same session and are discarded. Set it above the
    /// response latency of the remote controller.
    pub settle_ms: u64,

    /// Configuration of the codec of observations and actions.
    pub codec: CodecConfig,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            obs_topic: "simulation/observation_space".to_string(),
            act_topic: "simulation/action_space".to_string(),
            poll_interval_ms: 1,
            max_poll_interval_ms: 50,
            max_publish_retries: 3,
            action_timeout_ms: None,
            settle_ms: 50,
            codec: CodecConfig::default(),
        }
    }
}

impl EpisodeConfig {
    /// Sets the observation topic.
    pub fn obs_topic(mut self, v: impl Into<String>) -> Self {
        self.obs_topic = v.into();
        self
    }

    /// Sets the action topic.
    pub fn act_topic(mut self, v: impl Into<String>) -> Self {
        self.act_topic = v.into();
        self
    }

    /// Sets the initial sleep between polls in milliseconds.
    pub fn poll_interval_ms(mut self, v: u64) -> Self {
        self.poll_interval_ms = v;
        self
    }

    /// Sets the upper bound of the sleep between polls in milliseconds.
    pub fn max_poll_interval_ms(mut self, v: u64) -> Self {
        self.max_poll_interval_ms = v;
        self
    }

    /// Sets the number of publish retries.
    pub fn max_publish_retries(mut self, v: usize) -> Self {
        self.max_publish_retries = v;
        self
    }

    /// Sets the action timeout in milliseconds.
    pub fn action_timeout_ms(mut self, v: Option<u64>) -> Self {
        self.action_timeout_ms = v;
        self
    }

    /// Sets the settle window in milliseconds.
    pub fn settle_ms(mut self, v: u64) -> Self {
        self.settle_ms = v;
        self
    }

    /// Sets the codec configuration.
    pub fn codec(mut self, v: CodecConfig) -> Self {
        self.codec = v;
        self
    }

    pub(super) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(super) fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms.max(self.poll_interval_ms))
    }

    pub(super) fn action_timeout(&self) -> Option<Duration> {
        self.action_timeout_ms.map(Duration::from_millis)
    }

    pub(super) fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Constructs [`EpisodeConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`EpisodeConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
