//! In-process publish/subscribe transport.
//!
//! [`LocalBus`] implements [`Channel`](tether_core::Channel) for a simulation
//! and its remote controller living in the same process, e.g., in tests and in
//! the `tether-sim` binary. Every subscription owns a crossbeam channel and a
//! dispatcher thread, so messages on a topic reach a subscriber in publish
//! order and handlers never run on the publishing thread.
mod local_bus;
pub use local_bus::{LocalBus, LocalBusConfig, LocalSubscription};
