use super::LocalBusConfig;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use log::{debug, info, trace, warn};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::JoinHandle,
};
use tether_core::{Channel, Handler, Subscription, TetherError};

struct Subscriber {
    id: usize,
    sender: Sender<Vec<u8>>,
}

#[derive(Default)]
struct Registry {
    topics: HashMap<String, Vec<Subscriber>>,
    n_subscriptions: usize,
    closed: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-process publish/subscribe session.
///
/// Publishing copies the payload into the queue of every subscriber of the
/// topic and returns without waiting for the handlers. Each subscription is
/// served by its own dispatcher thread, which calls the handler for queued
/// messages in publish order.
///
/// Share a bus between an [`EpisodeController`](tether_core::EpisodeController)
/// and a remote controller by reference, `&LocalBus` is a [`Channel`] too.
pub struct LocalBus {
    config: LocalBusConfig,
    registry: Arc<Mutex<Registry>>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(LocalBusConfig::default())
    }
}

impl LocalBus {
    /// Opens a session.
    pub fn new(config: LocalBusConfig) -> Self {
        Self {
            config,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Closes the session.
    ///
    /// Queues of all subscribers are disconnected, so dispatcher threads stop
    /// after draining them. Subsequent publishes and subscriptions fail with
    /// [`TetherError::TransportError`].
    pub fn close(&self) {
        let mut registry = lock(&self.registry);
        registry.closed = true;
        registry.topics.clear();
        info!("Closed local bus");
    }

    /// Returns `true` if the session has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.registry).closed
    }

    /// Returns the number of active subscriptions on a topic.
    pub fn n_subscribers(&self, topic: &str) -> usize {
        lock(&self.registry).topics.get(topic).map_or(0, |s| s.len())
    }

    fn run_dispatcher(
        topic: String,
        receiver: Receiver<Vec<u8>>,
        handler: Handler,
        stop: Arc<Mutex<bool>>,
    ) {
        // Ends when the sender is dropped by cancel or close.
        for payload in receiver.iter() {
            if *lock(&stop) {
                break;
            }
            handler(&payload);
        }
        debug!("Stopped dispatcher for {}", topic);
    }
}

impl Channel for LocalBus {
    type Subscription = LocalSubscription;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TetherError> {
        let registry = lock(&self.registry);
        if registry.closed {
            return Err(TetherError::TransportError(format!(
                "cannot publish on {}, session closed",
                topic
            )));
        }

        if let Some(subscribers) = registry.topics.get(topic) {
            for s in subscribers.iter() {
                match s.sender.try_send(payload.to_vec()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("Queue of subscriber {} on {} is full, dropped a message", s.id, topic)
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        trace!("Subscriber {} on {} has stopped", s.id, topic)
                    }
                }
            }
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str, handler: Handler) -> Result<Self::Subscription, TetherError> {
        let mut registry = lock(&self.registry);
        if registry.closed {
            return Err(TetherError::TransportError(format!(
                "cannot subscribe to {}, session closed",
                topic
            )));
        }

        let (sender, receiver) = match self.config.queue_capacity {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        let stop = Arc::new(Mutex::new(false));
        let handle = {
            let topic = topic.to_string();
            let stop = stop.clone();
            std::thread::spawn(move || Self::run_dispatcher(topic, receiver, handler, stop))
        };

        let id = registry.n_subscriptions;
        registry.n_subscriptions += 1;
        registry
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, sender });
        debug!("Subscriber {} started on {}", id, topic);

        Ok(LocalSubscription {
            id,
            topic: topic.to_string(),
            stop,
            registry: self.registry.clone(),
            handle: Some(handle),
        })
    }
}

/// Subscription of [`LocalBus`].
///
/// Dropping the subscription cancels it.
pub struct LocalSubscription {
    id: usize,
    topic: String,
    stop: Arc<Mutex<bool>>,
    registry: Arc<Mutex<Registry>>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription for LocalSubscription {
    /// Stops the dispatcher and waits for a running handler to return.
    ///
    /// Queued messages not yet handled are dropped.
    fn cancel(&mut self) {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return,
        };

        *lock(&self.stop) = true;
        {
            let mut registry = lock(&self.registry);
            if let Some(subscribers) = registry.topics.get_mut(&self.topic) {
                subscribers.retain(|s| s.id != self.id);
            }
        }

        // A handler cancelling its own subscription cannot join itself.
        if handle.thread().id() == std::thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("Handler of subscriber {} on {} panicked", self.id, self.topic);
        }
        debug!("Subscriber {} cancelled on {}", self.id, self.topic);
    }
}

impl Drop for LocalSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
