//! Episode controller driving an environment with actions from a remote controller.
mod base;
mod config;
mod report;
pub use base::EpisodeController;
pub use config::EpisodeConfig;
pub use report::{episode_reports_fmt, EpisodeOutcome, EpisodeReport, FailureReason};
