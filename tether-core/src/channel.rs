//! Abstraction of the publish/subscribe transport.
use crate::error::TetherError;

/// Callback invoked with the payload of every message arriving on a topic.
///
/// Transports call handlers on their own execution context, possibly
/// concurrently with the stepping loop and with other invocations of the
/// same handler. A handler must not block.
pub type Handler = Box<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Handle of a subscription returned by [`Channel::subscribe`].
pub trait Subscription: Send {
    /// Stops future invocations of the handler.
    ///
    /// A handler already running is allowed to finish. Calling this method
    /// more than once has no further effect.
    fn cancel(&mut self);
}

/// A publish/subscribe session.
pub trait Channel {
    /// Subscription handle.
    type Subscription: Subscription;

    /// Publishes a payload on a topic without waiting for delivery.
    ///
    /// Fails with [`TetherError::TransportError`] if the session is closed.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TetherError>;

    /// Registers `handler` for messages on `topic`.
    fn subscribe(&self, topic: &str, handler: Handler) -> Result<Self::Subscription, TetherError>;
}

impl<C: Channel + ?Sized> Channel for &C {
    type Subscription = C::Subscription;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TetherError> {
        (**self).publish(topic, payload)
    }

    fn subscribe(&self, topic: &str, handler: Handler) -> Result<Self::Subscription, TetherError> {
        (**self).subscribe(topic, handler)
    }
}
