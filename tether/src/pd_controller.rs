//! A proportional-derivative controller balancing [`Pendulum`](crate::Pendulum)
//! from the other side of a [`Channel`](tether_core::Channel).
mod base;
mod config;
pub use base::PdController;
pub use config::PdControllerConfig;
