#![warn(missing_docs)]
//! Synchronization core bridging a stepwise environment and a remote controller.
//!
//! An [`EpisodeController`] publishes observations of an [`Env`] over a
//! [`Channel`] and applies actions pushed back asynchronously by a remote
//! controller. Actions are decoded by a [`Codec`] in the subscription handler
//! and handed over to the stepping loop through a single-slot [`Mailbox`].
pub mod channel;
pub mod codec;
pub mod dummy;
pub mod error;
pub mod mailbox;
pub mod record;
pub mod reward;

mod base;
pub use base::{Act, Env, EpisodeState, Info, Obs, Step};

mod controller;
pub use channel::{Channel, Handler, Subscription};
pub use codec::{Codec, CodecConfig, DType, NdArray, NdArrayCodec, NpyCodec, PayloadFormat};
pub use controller::{
    episode_reports_fmt, EpisodeConfig, EpisodeController, EpisodeOutcome, EpisodeReport,
    FailureReason,
};
pub use error::TetherError;
pub use mailbox::{Mailbox, MailboxStat};
pub use reward::RewardAccumulator;
