//! Session of the in-process bus.
mod base;
mod config;
pub use base::{LocalBus, LocalSubscription};
pub use config::LocalBusConfig;
