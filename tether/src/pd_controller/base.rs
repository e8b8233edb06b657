use super::PdControllerConfig;
use crate::{PendulumAct, PendulumObs};
use log::{debug, warn};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tether_core::{Channel, Codec, TetherError};

/// A remote controller for [`Pendulum`](crate::Pendulum).
///
/// [`PdController::attach`] subscribes to the observation topic and answers
/// every observation with an action on the action topic. It runs entirely on
/// the execution context of the transport and knows nothing about episodes,
/// so it plays the part of a remote process.
pub struct PdController {
    config: PdControllerConfig,
    codec: Arc<dyn Codec>,
    n_answered: Arc<AtomicUsize>,
}

impl PdController {
    /// Constructs a controller.
    pub fn new(config: PdControllerConfig) -> Self {
        Self {
            codec: config.codec.build(),
            config,
            n_answered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the action for an observation.
    pub fn act(&self, obs: &PendulumObs) -> f64 {
        let c = &self.config;
        c.kp_angle * obs.angle()
            + c.kd_angle * obs.angular_velocity()
            + c.kp_position * obs.position()
            + c.kd_position * obs.velocity()
    }

    /// Returns a counter of observations answered so far, shared with the handler.
    pub fn n_answered(&self) -> Arc<AtomicUsize> {
        self.n_answered.clone()
    }

    fn answer(&self, payload: &[u8]) -> Result<Vec<u8>, TetherError> {
        let obs = PendulumObs::from_array(&self.codec.decode(payload)?)?;
        let act = PendulumAct(self.act(&obs));
        self.codec.encode(&act.into())
    }

    /// Starts answering observations published on `channel`.
    ///
    /// Cancelling the returned subscription stops the controller.
    pub fn attach<C>(self, channel: Arc<C>) -> Result<C::Subscription, TetherError>
    where
        C: Channel + Send + Sync + 'static,
    {
        let obs_topic = self.config.obs_topic.clone();
        let channel_ = channel.clone();
        let handler = Box::new(move |payload: &[u8]| {
            let payload = match self.answer(payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Ignored an observation: {}", e);
                    return;
                }
            };
            match channel_.publish(&self.config.act_topic, &payload) {
                Ok(()) => {
                    self.n_answered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => debug!("Failed to publish an action: {}", e),
            }
        });

        channel.subscribe(&obs_topic, handler)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tether_core::{
        dummy::ScriptedChannel, CodecConfig, NdArray, NdArrayCodec, NpyCodec, Obs as _,
        PayloadFormat, Subscription as _,
    };

    #[test]
    fn test_act_pushes_cart_under_the_pole() {
        let pd = PdController::new(PdControllerConfig::default());
        assert!(pd.act(&PendulumObs([0.0, 0.1, 0.0, 0.0])) > 0.0);
        assert!(pd.act(&PendulumObs([0.0, -0.1, 0.0, 0.0])) < 0.0);
        assert_eq!(pd.act(&PendulumObs([0.0; 4])), 0.0);
    }

    #[test]
    fn test_attach_answers_observations() {
        let config = PdControllerConfig::default().position_gains(0.0, 0.0);
        let pd = PdController::new(config.clone());
        let n_answered = pd.n_answered();
        let channel = Arc::new(ScriptedChannel::new());
        let mut subscription = pd.attach(channel.clone()).unwrap();

        let codec = NdArrayCodec::default();
        let obs = PendulumObs([0.0, 0.1, 0.0, 0.2]);
        channel.deliver(&config.obs_topic, &codec.encode(&obs.to_array()).unwrap());
        channel.deliver(&config.obs_topic, b"garbage");

        let published = channel.published(&config.act_topic);
        assert_eq!(published.len(), 1);
        let act = codec.decode(&published[0]).unwrap();
        assert_eq!(act, NdArray::from(PendulumAct(5.0 * 0.1 + 1.0 * 0.2)));
        assert_eq!(n_answered.load(Ordering::Relaxed), 1);

        subscription.cancel();
        assert_eq!(channel.n_subscribers(&config.obs_topic), 0);
    }

    #[test]
    fn test_attach_speaks_npy() {
        let config = PdControllerConfig::default()
            .codec(CodecConfig::default().format(PayloadFormat::Npy));
        let channel = Arc::new(ScriptedChannel::new());
        let _subscription = PdController::new(config.clone()).attach(channel.clone()).unwrap();

        let codec = NpyCodec::default();
        let obs = PendulumObs([0.0, 0.2, 0.0, 0.0]);
        channel.deliver(&config.obs_topic, &codec.encode(&obs.to_array()).unwrap());

        let published = channel.published(&config.act_topic);
        assert_eq!(published.len(), 1);
        assert_eq!(
            codec.decode(&published[0]).unwrap(),
            NdArray::from(PendulumAct(5.0 * 0.2))
        );
    }
}
