//! This module is used for tests.
//!
//! [`ScriptedEnv`] replays a fixed sequence of step results and
//! [`ScriptedChannel`] answers publishes synchronously with scripted messages,
//! which makes the interleaving of the stepping loop and the subscription
//! handler deterministic.
use crate::{
    channel::{Channel, Handler, Subscription},
    codec::{DType, NdArray},
    error::TetherError,
    record::Record,
    Env, Step,
};
use anyhow::Result;
use ndarray::{arr1, ArrayD};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Result of one step of [`ScriptedEnv`].
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptedStep {
    /// Returns a reward with the given flags.
    Reward {
        /// Reward.
        reward: f32,
        /// Terminated flag.
        terminated: bool,
        /// Truncated flag.
        truncated: bool,
    },

    /// Fails with [`TetherError::EnvironmentFault`].
    Fault(String),
}

impl ScriptedStep {
    /// A step that keeps the episode running.
    pub fn running(reward: f32) -> Self {
        Self::Reward {
            reward,
            terminated: false,
            truncated: false,
        }
    }

    /// A step that terminates the episode.
    pub fn terminated(reward: f32) -> Self {
        Self::Reward {
            reward,
            terminated: true,
            truncated: false,
        }
    }

    /// A step that truncates the episode.
    pub fn truncated(reward: f32) -> Self {
        Self::Reward {
            reward,
            terminated: false,
            truncated: true,
        }
    }

    /// A failing step.
    pub fn fault(msg: impl Into<String>) -> Self {
        Self::Fault(msg.into())
    }
}

/// What happened to a [`ScriptedEnv`], shared with the test.
#[derive(Clone, Default)]
pub struct ScriptedEnvLog {
    applied: Arc<Mutex<Vec<NdArray>>>,
    closed: Arc<Mutex<bool>>,
}

impl ScriptedEnvLog {
    /// Actions applied so far, in order.
    pub fn applied(&self) -> Vec<NdArray> {
        self.applied.lock().unwrap().clone()
    }

    /// Returns `true` if [`Env::close`] has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

/// Configuration of [`ScriptedEnv`].
#[derive(Clone, Default)]
pub struct ScriptedEnvConfig {
    /// Results of the steps, in order.
    pub steps: Vec<ScriptedStep>,

    /// If `true`, [`Env::reset`] fails.
    pub fail_reset: bool,

    /// Shared log.
    pub log: ScriptedEnvLog,
}

impl ScriptedEnvConfig {
    /// Constructs a configuration from step results.
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }
}

/// An environment replaying [`ScriptedStep`]s.
///
/// The observation is a `f32` array of shape `[1]` holding the number of
/// steps taken. Actions must be `f32` arrays of shape `[1]`.
pub struct ScriptedEnv {
    config: ScriptedEnvConfig,
    ix: usize,
}

impl ScriptedEnv {
    /// Observation after `ix` steps.
    pub fn obs(ix: usize) -> NdArray {
        NdArray::F32(arr1(&[ix as f32]).into_dyn())
    }

    /// A valid action.
    pub fn act(v: f32) -> NdArray {
        NdArray::F32(arr1(&[v]).into_dyn())
    }
}

impl Env for ScriptedEnv {
    type Config = ScriptedEnvConfig;
    type Obs = NdArray;
    type Act = NdArray;
    type Info = ();

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            ix: 0,
        })
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        if self.config.fail_reset {
            anyhow::bail!("scripted reset failure");
        }
        self.ix = 0;
        Ok(Self::obs(0))
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record), TetherError> {
        a.expect(DType::F32, &[1])?;

        let scripted = self.config.steps.get(self.ix).cloned().ok_or_else(|| {
            TetherError::EnvironmentFault("no more scripted steps".to_string())
        })?;
        match scripted {
            ScriptedStep::Fault(msg) => Err(TetherError::EnvironmentFault(msg)),
            ScriptedStep::Reward {
                reward,
                terminated,
                truncated,
            } => {
                self.config.log.applied.lock().unwrap().push(a.clone());
                self.ix += 1;
                let step = Step::new(Self::obs(self.ix), a.clone(), reward, terminated, truncated, ());
                Ok((step, Record::empty()))
            }
        }
    }

    fn close(&mut self) {
        *self.config.log.closed.lock().unwrap() = true;
    }
}

type Responder = Box<dyn FnMut(usize, &[u8]) -> Vec<(String, Vec<u8>)> + Send>;

#[derive(Default)]
struct Inner {
    handlers: HashMap<String, Vec<(usize, Arc<Handler>)>>,
    published: Vec<(String, Vec<u8>)>,
    n_subscriptions: usize,
    n_failing_publishes: usize,
    max_publishes: Option<usize>,
    closed: bool,
}

/// A channel answering publishes synchronously.
///
/// On every publish the responder is called with the number of earlier
/// publishes and the payload. The messages it returns are delivered to the
/// handlers of their topics before `publish` returns.
pub struct ScriptedChannel {
    inner: Arc<Mutex<Inner>>,
    responder: Mutex<Responder>,
}

impl Default for ScriptedChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChannel {
    /// Constructs a channel that never answers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            responder: Mutex::new(Box::new(|_, _| vec![])),
        }
    }

    /// Sets the responder.
    pub fn on_publish<F>(self, f: F) -> Self
    where
        F: FnMut(usize, &[u8]) -> Vec<(String, Vec<u8>)> + Send + 'static,
    {
        *self.responder.lock().unwrap() = Box::new(f);
        self
    }

    /// Makes the next `n` publishes fail.
    pub fn fail_next_publishes(&self, n: usize) {
        self.inner.lock().unwrap().n_failing_publishes = n;
    }

    /// Makes every publish fail once `n` payloads have been published.
    pub fn fail_publishes_after(&self, n: usize) {
        self.inner.lock().unwrap().max_publishes = Some(n);
    }

    /// Closes the session.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
    }

    /// Delivers a payload to the handlers of a topic.
    pub fn deliver(&self, topic: &str, payload: &[u8]) {
        let handlers = self
            .inner
            .lock()
            .unwrap()
            .handlers
            .get(topic)
            .map(|hs| hs.iter().map(|(_, h)| h.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        for h in handlers {
            h(payload);
        }
    }

    /// Payloads published on a topic, in order.
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// The number of active subscriptions on a topic.
    pub fn n_subscribers(&self, topic: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .handlers
            .get(topic)
            .map_or(0, |hs| hs.len())
    }
}

impl Channel for ScriptedChannel {
    type Subscription = ScriptedSubscription;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TetherError> {
        let n = {
            let mut inner = self.inner.lock().unwrap();
            if inner.closed {
                return Err(TetherError::TransportError("session closed".to_string()));
            }
            if inner.n_failing_publishes > 0 {
                inner.n_failing_publishes -= 1;
                return Err(TetherError::TransportError("scripted failure".to_string()));
            }
            if inner.max_publishes.map_or(false, |n| inner.published.len() >= n) {
                return Err(TetherError::TransportError("scripted failure".to_string()));
            }
            inner.published.push((topic.to_string(), payload.to_vec()));
            inner.published.len() - 1
        };

        let replies = (self.responder.lock().unwrap())(n, payload);
        for (topic, payload) in replies {
            self.deliver(&topic, &payload);
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str, handler: Handler) -> Result<Self::Subscription, TetherError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(TetherError::TransportError("session closed".to_string()));
        }
        let id = inner.n_subscriptions;
        inner.n_subscriptions += 1;
        inner
            .handlers
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        Ok(ScriptedSubscription {
            id,
            topic: topic.to_string(),
            inner: self.inner.clone(),
        })
    }
}

/// Subscription of [`ScriptedChannel`].
pub struct ScriptedSubscription {
    id: usize,
    topic: String,
    inner: Arc<Mutex<Inner>>,
}

impl Subscription for ScriptedSubscription {
    fn cancel(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(hs) = inner.handlers.get_mut(&self.topic) {
            hs.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Returns an `f32` array of shape `[2]`, which [`ScriptedEnv`] rejects as an action.
pub fn invalid_act() -> NdArray {
    NdArray::F32(ArrayD::zeros(ndarray::IxDyn(&[2])))
}
