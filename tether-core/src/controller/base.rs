use super::{EpisodeConfig, EpisodeOutcome, EpisodeReport, FailureReason};
use crate::{
    base::{Act, EpisodeState, Obs},
    channel::{Channel, Handler, Subscription},
    codec::{Codec, NdArray},
    error::TetherError,
    mailbox::{Mailbox, MailboxStat},
    record::{RecordValue, Recorder},
    reward::RewardAccumulator,
    Env,
};
use log::{debug, error, info, trace, warn};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Phases of an episode.
enum Phase {
    Resetting,
    AwaitingAction,
    Stepping(NdArray),
    Finalizing(EpisodeOutcome),
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs one episode of an [`Env`] driven by actions arriving over a [`Channel`].
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> Resetting
///     Resetting --> AwaitingAction: settle window passed, observation published
///     Resetting --> Finalizing: subscribe/reset/publish failure
///     AwaitingAction --> AwaitingAction: mailbox empty, republish and sleep
///     AwaitingAction --> Stepping: action taken from mailbox
///     AwaitingAction --> Finalizing: action timeout or publish failure
///     Stepping --> AwaitingAction: running, or action rejected
///     Stepping --> Finalizing: terminated, truncated or fault
///     Finalizing --> [*]
/// ```
///
/// The subscription handler decodes incoming payloads and deposits them into a
/// single-slot [`Mailbox`], which is the only state shared with the transport.
/// The episode state and the cumulative reward are owned by the stepping loop.
pub struct EpisodeController<E, C>
where
    E: Env,
    C: Channel,
{
    config: EpisodeConfig,
    env: E,
    channel: C,
    codec: Arc<dyn Codec>,
    mailbox: Arc<Mailbox<NdArray>>,
    subscription: Option<C::Subscription>,
    reward: RewardAccumulator,
    state: EpisodeState,
    episode: usize,

    /// Encoded current observation.
    obs_payload: Vec<u8>,

    /// Sleep before the next poll of an empty mailbox.
    backoff: Duration,

    /// When the current observation was published.
    waiting_since: Instant,

    /// Mailbox counters at the end of the settle window.
    settled: MailboxStat,

    n_published: usize,
    n_republished: usize,
    n_rejected_actions: usize,
}

impl<E, C> EpisodeController<E, C>
where
    E: Env,
    C: Channel,
{
    /// Constructs a controller for one episode.
    ///
    /// Pass `&channel` to share a session between episodes.
    pub fn new(config: EpisodeConfig, env: E, channel: C) -> Self {
        let codec = config.codec.build();
        let backoff = config.poll_interval();
        Self {
            config,
            env,
            channel,
            codec,
            mailbox: Arc::new(Mailbox::new()),
            subscription: None,
            reward: RewardAccumulator::new(),
            state: EpisodeState::Running,
            episode: 0,
            obs_payload: vec![],
            backoff,
            waiting_since: Instant::now(),
            settled: MailboxStat::default(),
            n_published: 0,
            n_republished: 0,
            n_rejected_actions: 0,
        }
    }

    /// Replaces the codec of observations and actions.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the index of the episode used in records and reports.
    pub fn episode(mut self, ix: usize) -> Self {
        self.episode = ix;
        self
    }

    /// Returns the mailbox of actions.
    pub fn mailbox(&self) -> Arc<Mailbox<NdArray>> {
        self.mailbox.clone()
    }

    /// Runs the episode until it is terminated, truncated or aborted.
    ///
    /// A record is written to `recorder` for every applied action and a
    /// summary record when the episode is finalized. The environment is closed
    /// before returning.
    pub fn run<R: Recorder>(mut self, recorder: &mut R) -> EpisodeReport {
        let start = Instant::now();
        let mut phase = Phase::Resetting;

        let outcome = loop {
            phase = match phase {
                Phase::Resetting => self.reset(),
                Phase::AwaitingAction => self.poll(),
                Phase::Stepping(act) => self.step(act, recorder),
                Phase::Finalizing(outcome) => break outcome,
            };
        };

        self.finalize(outcome, start.elapsed(), recorder)
    }

    fn reset(&mut self) -> Phase {
        self.mailbox.clear();
        self.reward.reset();
        self.state = EpisodeState::Running;

        // Subscribe before publishing the first observation so that no
        // action sent in response is missed.
        let mailbox = self.mailbox.clone();
        let codec = self.codec.clone();
        let topic = self.config.act_topic.clone();
        let handler: Handler = Box::new(move |payload: &[u8]| match codec.decode(payload) {
            Ok(act) => mailbox.deposit(act),
            Err(e) => warn!("Dropped a message on {}: {}", topic, e),
        });
        match self.channel.subscribe(&self.config.act_topic, handler) {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                return Phase::Finalizing(EpisodeOutcome::Failed(FailureReason::Transport(
                    e.to_string(),
                )))
            }
        }

        let obs = match self.env.reset() {
            Ok(obs) => obs,
            Err(e) => {
                return Phase::Finalizing(EpisodeOutcome::Failed(FailureReason::Reset(
                    e.to_string(),
                )))
            }
        };
        debug!("Episode {} reset", self.episode);

        // Replies to observations of an earlier episode on this session may
        // still be in flight.
        let settle = self.config.settle();
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
        self.mailbox.clear();
        self.settled = self.mailbox.stat();
        if self.settled.n_deposits > 0 {
            debug!(
                "Episode {}: discarded {} stale actions",
                self.episode, self.settled.n_deposits
            );
        }

        match self.publish_obs(&obs) {
            Ok(()) => Phase::AwaitingAction,
            Err(reason) => Phase::Finalizing(EpisodeOutcome::Failed(reason)),
        }
    }

    fn poll(&mut self) -> Phase {
        if let Some(act) = self.mailbox.try_take() {
            return Phase::Stepping(act);
        }

        if let Some(timeout) = self.config.action_timeout() {
            if self.waiting_since.elapsed() >= timeout {
                return Phase::Finalizing(EpisodeOutcome::Failed(FailureReason::ActionTimeout(
                    timeout,
                )));
            }
        }

        // Same payload, so the controller sees the same observation again.
        if let Err(e) = self.publish_with_retry(&self.obs_payload) {
            return Phase::Finalizing(EpisodeOutcome::Failed(FailureReason::Transport(
                e.to_string(),
            )));
        }
        self.n_published += 1;
        self.n_republished += 1;
        trace!("No action yet, republished observation");

        self.sleep();
        Phase::AwaitingAction
    }

    fn step<R: Recorder>(&mut self, act: NdArray, recorder: &mut R) -> Phase {
        let act = match E::Act::from_array(act) {
            Ok(act) => act,
            Err(e) => return self.reject(e),
        };

        let (step, mut record) = match self.env.step(&act) {
            Ok(step) => step,
            Err(e) if !e.is_fatal() => return self.reject(e),
            Err(e) => {
                error!("Episode {}: {}", self.episode, e);
                let msg = match e {
                    TetherError::EnvironmentFault(msg) => msg,
                    e => e.to_string(),
                };
                return Phase::Finalizing(EpisodeOutcome::Failed(
                    FailureReason::EnvironmentFault(msg),
                ));
            }
        };

        // Reward is accumulated only for steps actually taken.
        self.reward.add(step.reward);
        self.state = step.episode_state();

        record.insert("episode", RecordValue::Scalar(self.episode as _));
        record.insert("step", RecordValue::Scalar(self.reward.n_steps() as _));
        record.insert("reward", RecordValue::Scalar(step.reward));
        record.insert(
            "cumulative_reward",
            RecordValue::Scalar(self.reward.total()),
        );
        record.insert(
            "obs",
            RecordValue::Array1(step.obs.to_array().to_f32_vec()),
        );
        recorder.write(record);

        let published = self.publish_obs(&step.obs);
        let outcome = match self.state {
            EpisodeState::Running => {
                return match published {
                    Ok(()) => Phase::AwaitingAction,
                    Err(reason) => Phase::Finalizing(EpisodeOutcome::Failed(reason)),
                }
            }
            EpisodeState::Terminated => EpisodeOutcome::Terminated,
            EpisodeState::Truncated => EpisodeOutcome::Truncated,
        };

        // The episode has ended either way.
        if let Err(reason) = published {
            warn!(
                "Episode {}: final observation not delivered: {}",
                self.episode, reason
            );
        }
        Phase::Finalizing(outcome)
    }

    fn reject(&mut self, e: TetherError) -> Phase {
        warn!("Episode {}: rejected action: {}", self.episode, e);
        self.n_rejected_actions += 1;
        Phase::AwaitingAction
    }

    fn finalize<R: Recorder>(
        mut self,
        outcome: EpisodeOutcome,
        duration: Duration,
        recorder: &mut R,
    ) -> EpisodeReport {
        // Actions arriving from now on must not reach a dead episode.
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.mailbox.close();
        self.env.close();

        let report = EpisodeReport {
            episode: self.episode,
            outcome,
            total_reward: self.reward.total(),
            n_steps: self.reward.n_steps(),
            n_published: self.n_published,
            n_republished: self.n_republished,
            n_rejected_actions: self.n_rejected_actions,
            n_overwritten_actions: self.mailbox.stat().n_overwritten - self.settled.n_overwritten,
            n_stale_actions: self.settled.n_deposits,
            duration,
        };

        if report.is_failure() {
            error!(
                "Episode {} {}, total reward: {}",
                report.episode, report.outcome, report.total_reward
            );
        } else {
            info!(
                "Episode {} {} after {} steps, total reward: {}",
                report.episode, report.outcome, report.n_steps, report.total_reward
            );
        }
        recorder.write(report.to_record());

        report
    }

    /// Encodes and publishes a new observation, then restarts waiting for an action.
    fn publish_obs(&mut self, obs: &E::Obs) -> Result<(), FailureReason> {
        self.obs_payload = self
            .codec
            .encode(&obs.to_array())
            .map_err(|e| FailureReason::EnvironmentFault(e.to_string()))?;
        self.publish_with_retry(&self.obs_payload)
            .map_err(|e| FailureReason::Transport(e.to_string()))?;

        self.n_published += 1;
        self.backoff = self.config.poll_interval();
        self.waiting_since = Instant::now();
        Ok(())
    }

    fn publish_with_retry(&self, payload: &[u8]) -> Result<(), TetherError> {
        let mut delay = self.config.poll_interval();
        let mut n_retries = 0;

        loop {
            match self.channel.publish(&self.config.obs_topic, payload) {
                Ok(()) => return Ok(()),
                Err(e) if n_retries < self.config.max_publish_retries => {
                    n_retries += 1;
                    warn!(
                        "Failed to publish on {} ({}), retry {}/{}",
                        self.config.obs_topic, e, n_retries, self.config.max_publish_retries
                    );
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(self.config.max_poll_interval());
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn sleep(&mut self) {
        if self.backoff.is_zero() {
            std::thread::yield_now();
        } else {
            std::thread::sleep(self.backoff);
            self.backoff = (self.backoff * 2).min(self.config.max_poll_interval());
        }
    }
}
