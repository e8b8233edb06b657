//! Bridges a stepwise environment to a remote controller over publish/subscribe.
//!
//! This crate gathers the synchronization core of [`tether_core`] and the
//! in-process transport of [`tether_bus`], and adds a demonstration
//! environment ([`Pendulum`]), a demonstration remote controller
//! ([`PdController`]) and [`run_episodes`], which runs a sequence of episodes
//! over one session.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tether::{
//!     record::NullRecorder, run_episodes, EpisodeConfig, LocalBus, PdController,
//!     PdControllerConfig, Pendulum, PendulumConfig,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let bus = Arc::new(LocalBus::default());
//! let _controller = PdController::new(PdControllerConfig::default()).attach(bus.clone())?;
//! let reports = run_episodes::<Pendulum, _, _>(
//!     &PendulumConfig::default(),
//!     42,
//!     3,
//!     bus.as_ref(),
//!     &EpisodeConfig::default(),
//!     &mut NullRecorder::new(),
//! )?;
//! # Ok(())
//! # }
//! ```
mod pd_controller;
mod pendulum;
mod runner;
mod sim_config;
pub use pd_controller::{PdController, PdControllerConfig};
pub use pendulum::{Pendulum, PendulumAct, PendulumConfig, PendulumObs};
pub use runner::run_episodes;
pub use sim_config::SimConfig;
pub use tether_bus::{LocalBus, LocalBusConfig, LocalSubscription};
pub use tether_core::*;
