use shardwatch::{AlertBus, AlertSignal, AlertSink, AlertSinkError};
use std::thread;

fn signal(shard_id: &str, sensor_id: &str, observed_at_ms: u64) -> AlertSignal {
    AlertSignal {
        shard_id: shard_id.into(),
        sensor_id: sensor_id.into(),
        observed_at_ms,
    }
}

#[test]
fn bus_preserves_delivery_order() {
    let (mut bus, receiver) = AlertBus::unbounded();
    for idx in 0..5 {
        bus.publish(signal("shard-0", "A12345", idx))
            .expect("publish succeeds");
    }
    let drained = receiver.drain();
    assert_eq!(drained.len(), 5);
    for (idx, alert) in drained.iter().enumerate() {
        assert_eq!(alert.observed_at_ms, idx as u64);
    }
}

#[test]
fn clones_feed_the_same_receiver() {
    let (bus, receiver) = AlertBus::unbounded();
    let mut handles = Vec::new();
    for shard in ["shard-a", "shard-b", "shard-c"] {
        let mut publisher = bus.clone();
        handles.push(thread::spawn(move || {
            for idx in 0..10 {
                publisher
                    .publish(signal(shard, "Z09876", idx))
                    .expect("publish succeeds");
            }
        }));
    }
    drop(bus);
    for handle in handles {
        handle.join().expect("publisher joins");
    }
    let drained = receiver.drain();
    assert_eq!(drained.len(), 30);
    for shard in ["shard-a", "shard-b", "shard-c"] {
        assert_eq!(
            drained.iter().filter(|alert| alert.shard_id == shard).count(),
            10,
            "every alert keeps its shard attribution"
        );
    }
}

#[test]
fn publishing_into_a_dropped_receiver_is_a_closed_sink() {
    let (mut bus, receiver) = AlertBus::unbounded();
    drop(receiver);
    let err = bus
        .publish(signal("shard-0", "A12345", 0))
        .expect_err("closed sink rejected");
    assert_eq!(err, AlertSinkError::Closed);
    assert!(!err.is_transient());
}

#[test]
fn congestion_is_transient() {
    assert!(AlertSinkError::Congested("backlog".into()).is_transient());
}
