use crossbeam_channel::{unbounded, Receiver};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tether_bus::{LocalBus, LocalBusConfig};
use tether_core::{
    dummy::{ScriptedEnv, ScriptedEnvConfig, ScriptedStep},
    record::NullRecorder,
    Channel, Codec, Env as _, EpisodeConfig, EpisodeController, EpisodeOutcome, NdArrayCodec,
    Subscription, TetherError,
};
use test_log::test;

const TIMEOUT: Duration = Duration::from_secs(5);

fn collect(r: &Receiver<Vec<u8>>, n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|_| r.recv_timeout(TIMEOUT).unwrap()).collect()
}

fn forward(bus: &LocalBus, topic: &str) -> (tether_bus::LocalSubscription, Receiver<Vec<u8>>) {
    let (s, r) = unbounded();
    let sub = bus
        .subscribe(topic, Box::new(move |p: &[u8]| s.send(p.to_vec()).unwrap()))
        .unwrap();
    (sub, r)
}

#[test]
fn test_messages_arrive_in_publish_order() {
    let bus = LocalBus::default();
    let (_sub, r) = forward(&bus, "t");

    for i in 0..100u8 {
        bus.publish("t", &[i]).unwrap();
    }

    let received = collect(&r, 100);
    assert_eq!(received, (0..100u8).map(|i| vec![i]).collect::<Vec<_>>());
}

#[test]
fn test_every_subscriber_of_topic_receives() {
    let bus = LocalBus::default();
    let (_sub1, r1) = forward(&bus, "t");
    let (_sub2, r2) = forward(&bus, "t");
    let (_sub3, r3) = forward(&bus, "other");
    assert_eq!(bus.n_subscribers("t"), 2);

    bus.publish("t", b"hello").unwrap();

    assert_eq!(collect(&r1, 1), vec![b"hello".to_vec()]);
    assert_eq!(collect(&r2, 1), vec![b"hello".to_vec()]);
    assert!(r3.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_handler_runs_off_the_publishing_thread() {
    let bus = LocalBus::default();
    let (s, r) = unbounded();
    let _sub = bus
        .subscribe(
            "t",
            Box::new(move |_: &[u8]| s.send(std::thread::current().id()).unwrap()),
        )
        .unwrap();

    bus.publish("t", b"x").unwrap();
    assert_ne!(r.recv_timeout(TIMEOUT).unwrap(), std::thread::current().id());
}

#[test]
fn test_cancelled_subscription_receives_nothing() {
    let bus = LocalBus::default();
    let (mut sub, r) = forward(&bus, "t");
    bus.publish("t", b"1").unwrap();
    assert_eq!(collect(&r, 1), vec![b"1".to_vec()]);

    sub.cancel();
    sub.cancel();
    assert_eq!(bus.n_subscribers("t"), 0);

    bus.publish("t", b"2").unwrap();
    assert!(r.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_closed_session_fails() {
    let bus = LocalBus::default();
    let (mut sub, _r) = forward(&bus, "t");

    bus.close();
    assert!(bus.is_closed());
    assert!(matches!(
        bus.publish("t", b"x"),
        Err(TetherError::TransportError(_))
    ));
    assert!(matches!(
        bus.subscribe("t", Box::new(|_: &[u8]| {})),
        Err(TetherError::TransportError(_))
    ));

    // The dispatcher has already stopped, cancelling must not block.
    sub.cancel();
}

#[test]
fn test_full_queue_drops_messages() {
    let bus = LocalBus::new(LocalBusConfig::default().queue_capacity(Some(1)));
    let (started_s, started_r) = unbounded();
    let (gate_s, gate_r) = unbounded::<()>();
    let (s, r) = unbounded();
    let _sub = bus
        .subscribe(
            "t",
            Box::new(move |p: &[u8]| {
                started_s.send(()).unwrap();
                let _ = gate_r.recv();
                s.send(p.to_vec()).unwrap();
            }),
        )
        .unwrap();

    // The dispatcher holds the first message in the handler, the second one
    // fills the queue and the third one is dropped.
    bus.publish("t", b"1").unwrap();
    started_r.recv_timeout(TIMEOUT).unwrap();
    bus.publish("t", b"2").unwrap();
    bus.publish("t", b"3").unwrap();
    drop(gate_s);

    assert_eq!(collect(&r, 2), vec![b"1".to_vec(), b"2".to_vec()]);
    assert!(r.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_episode_over_local_bus() {
    let config = EpisodeConfig::default();
    let bus = Arc::new(LocalBus::default());
    let env_config = ScriptedEnvConfig::new(vec![
        ScriptedStep::running(1.5),
        ScriptedStep::terminated(2.0),
    ]);

    // Remote controller answering every observation with an action.
    let n_observed = Arc::new(Mutex::new(0));
    let mut remote = {
        let bus_ = bus.clone();
        let codec = NdArrayCodec::default();
        let act = codec.encode(&ScriptedEnv::act(1.0)).unwrap();
        let act_topic = config.act_topic.clone();
        let n_observed = n_observed.clone();
        bus.subscribe(
            &config.obs_topic,
            Box::new(move |obs: &[u8]| {
                assert!(codec.decode(obs).is_ok());
                *n_observed.lock().unwrap() += 1;
                let _ = bus_.publish(&act_topic, &act);
            }),
        )
        .unwrap()
    };

    let env = ScriptedEnv::build(&env_config, 0).unwrap();
    let report = EpisodeController::new(config.clone(), env, &*bus).run(&mut NullRecorder::new());
    remote.cancel();

    assert_eq!(report.outcome, EpisodeOutcome::Terminated);
    assert_eq!(report.total_reward, 3.5);
    assert_eq!(env_config.log.applied().len(), 2);
    assert!(*n_observed.lock().unwrap() >= 2);
    assert_eq!(bus.n_subscribers(&config.act_topic), 0);
    assert_eq!(bus.n_subscribers(&config.obs_topic), 0);
}
