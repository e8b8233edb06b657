//! Outcome of an episode.
use crate::record::{Record, RecordValue};
use chrono::Local;
use std::{fmt, time::Duration};
use thiserror::Error;

/// Why an episode was aborted.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum FailureReason {
    /// The environment failed while stepping.
    #[error("environment fault: {0}")]
    EnvironmentFault(String),

    /// Publishing or subscribing failed persistently.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The environment could not be reset.
    #[error("reset failure: {0}")]
    Reset(String),

    /// No action arrived within the configured timeout.
    #[error("no action received within {0:?}")]
    ActionTimeout(Duration),
}

/// How an episode ended.
///
/// A terminal step decides the outcome. If publishing the observation of that
/// step fails, the failure is logged and the episode still ends as
/// [`EpisodeOutcome::Terminated`] or [`EpisodeOutcome::Truncated`].
#[derive(Clone, Debug, PartialEq)]
pub enum EpisodeOutcome {
    /// The environment reached a defined end state.
    Terminated,

    /// The episode was cut by an external limit.
    Truncated,

    /// The episode was aborted.
    Failed(FailureReason),
}

impl fmt::Display for EpisodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeOutcome::Terminated => write!(f, "terminated"),
            EpisodeOutcome::Truncated => write!(f, "truncated"),
            EpisodeOutcome::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Report of an episode, produced when the episode is finalized.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeReport {
    /// Index of the episode.
    pub episode: usize,

    /// How the episode ended.
    pub outcome: EpisodeOutcome,

    /// Cumulative reward of the applied actions.
    pub total_reward: f32,

    /// The number of applied actions.
    pub n_steps: usize,

    /// The number of observations published, including republished ones.
    pub n_published: usize,

    /// The number of times an observation was republished while waiting for an action.
    pub n_republished: usize,

    /// The number of actions rejected as invalid.
    pub n_rejected_actions: usize,

    /// The number of actions replaced by a newer one before being applied.
    pub n_overwritten_actions: usize,

    /// The number of actions discarded in the settle window before the first observation.
    pub n_stale_actions: usize,

    /// Wall-clock duration of the episode.
    pub duration: Duration,
}

impl EpisodeReport {
    /// Returns `true` if the episode was aborted.
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, EpisodeOutcome::Failed(_))
    }

    /// Converts the report into a [`Record`].
    pub fn to_record(&self) -> Record {
        let mut record = Record::from_slice(&[
            ("episode", RecordValue::Scalar(self.episode as _)),
            ("outcome", RecordValue::String(self.outcome.to_string())),
            ("total_reward", RecordValue::Scalar(self.total_reward)),
            ("n_steps", RecordValue::Scalar(self.n_steps as _)),
            ("n_published", RecordValue::Scalar(self.n_published as _)),
            ("n_republished", RecordValue::Scalar(self.n_republished as _)),
            (
                "n_rejected_actions",
                RecordValue::Scalar(self.n_rejected_actions as _),
            ),
            (
                "n_overwritten_actions",
                RecordValue::Scalar(self.n_overwritten_actions as _),
            ),
            (
                "n_stale_actions",
                RecordValue::Scalar(self.n_stale_actions as _),
            ),
            (
                "duration_sec",
                RecordValue::Scalar(self.duration.as_secs_f32()),
            ),
        ]);
        record.insert("finished_at", RecordValue::DateTime(Local::now()));
        record
    }

    /// Returns a formatted string.
    pub fn fmt(&self) -> String {
        let mut s = "episode, outcome, total reward, steps, republished, rejected, overwritten, stale, duration [sec]\n"
            .to_string();
        s += format!(
            "{}, {}, {}, {}, {}, {}, {}, {}, {}\n",
            self.episode,
            self.outcome,
            self.total_reward,
            self.n_steps,
            self.n_republished,
            self.n_rejected_actions,
            self.n_overwritten_actions,
            self.n_stale_actions,
            self.duration.as_secs_f32()
        )
        .as_str();
        s
    }
}

/// Returns a formatted string of a set of [`EpisodeReport`]s.
pub fn episode_reports_fmt(reports: &[EpisodeReport]) -> String {
    let mut s = "episode, outcome, total reward, steps\n".to_string();
    for r in reports.iter() {
        s += format!(
            "{}, {}, {}, {}\n",
            r.episode, r.outcome, r.total_reward, r.n_steps
        )
        .as_str();
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_report_fmt_and_record() {
        let report = EpisodeReport {
            episode: 2,
            outcome: EpisodeOutcome::Truncated,
            total_reward: 10.0,
            n_steps: 10,
            n_published: 14,
            n_republished: 3,
            n_rejected_actions: 0,
            n_overwritten_actions: 1,
            n_stale_actions: 2,
            duration: Duration::from_millis(500),
        };

        let lines: Vec<_> = report.fmt().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2, truncated, 10, 10, 3, 0, 1, 2, 0.5");

        let record = report.to_record();
        assert_eq!(record.get_scalar("n_stale_actions").unwrap(), 2.0);
        assert_eq!(record.get_string("outcome").unwrap(), "truncated");
    }
}
